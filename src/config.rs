// AdsFlow - runtime configuration
// Read once at startup from the process environment (after `.env` is loaded
// by dotenvy in main). Nothing here is mutable after construction.

use std::time::Duration;

/// Default lifetime of a confirmation token.
pub const DEFAULT_CONFIRMATION_TTL_SECS: u64 = 300;
/// Google Ads REST API version used unless `GOOGLE_ADS_API_VERSION` overrides it.
pub const DEFAULT_API_VERSION: &str = "v23";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:5176", "http://127.0.0.1:5176"];

#[derive(Debug, Clone)]
pub struct Config {
    /// `GOOGLE_ADS_DEVELOPER_TOKEN`. Optional at startup so health checks work
    /// without it; every Ads tool call fails fast while it is missing.
    pub developer_token: Option<String>,
    /// OAuth client used to exchange per-request refresh tokens.
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    /// Manager account sent as `login-customer-id` when set.
    pub login_customer_id: Option<String>,
    pub api_version: String,
    pub confirmation_ttl: Duration,
    /// Optional bearer secret guarding `/mcp`. None = dev mode.
    pub auth_secret: Option<String>,
    pub port: u16,
    /// `ALLOWED_ORIGINS`, comma separated. CORS allowlist for browser clients.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            developer_token: None,
            oauth_client_id: None,
            oauth_client_secret: None,
            login_customer_id: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            confirmation_ttl: Duration::from_secs(DEFAULT_CONFIRMATION_TTL_SECS),
            auth_secret: None,
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let confirmation_ttl = match get("CONFIRMATION_TTL_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => Duration::from_secs(secs),
            Some(Err(e)) => {
                tracing::warn!("CONFIRMATION_TTL_SECS is not a number ({}), using default", e);
                Duration::from_secs(DEFAULT_CONFIRMATION_TTL_SECS)
            }
            None => Duration::from_secs(DEFAULT_CONFIRMATION_TTL_SECS),
        };

        let port = match get("PORT").map(|v| v.parse::<u16>()) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                tracing::warn!("PORT is not a valid port ({}), using {}", e, DEFAULT_PORT);
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };

        let config = Self {
            developer_token: get("GOOGLE_ADS_DEVELOPER_TOKEN"),
            oauth_client_id: get("GOOGLE_ADS_CLIENT_ID"),
            oauth_client_secret: get("GOOGLE_ADS_CLIENT_SECRET"),
            login_customer_id: get("GOOGLE_ADS_LOGIN_CUSTOMER_ID").map(|id| id.replace('-', "")),
            api_version: match get("GOOGLE_ADS_API_VERSION") {
                Some(raw) => parse_api_version(&raw).unwrap_or_else(|| {
                    tracing::warn!("GOOGLE_ADS_API_VERSION '{}' is not like v23, using {}", raw, DEFAULT_API_VERSION);
                    DEFAULT_API_VERSION.to_string()
                }),
                None => DEFAULT_API_VERSION.to_string(),
            },
            confirmation_ttl,
            auth_secret: get("AUTH_SECRET"),
            port,
            allowed_origins: match get("ALLOWED_ORIGINS") {
                Some(list) => list
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
                None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            },
        };

        tracing::info!(api_version = %config.api_version, "Google Ads API version selected");
        if config.developer_token.is_none() {
            tracing::warn!("GOOGLE_ADS_DEVELOPER_TOKEN not set; Ads tools will refuse to run");
        }
        if config.auth_secret.is_some() {
            tracing::info!("AUTH_SECRET configured; /mcp requires a bearer token");
        } else {
            tracing::info!("AUTH_SECRET not set; /mcp is unauthenticated (dev mode)");
        }

        config
    }
}

/// `v23` or `23` → `v23`; anything else is rejected.
fn parse_api_version(raw: &str) -> Option<String> {
    let digits = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then(|| format!("v{}", digits))
}
