// AdsFlow - credential resolution
// The caller's OAuth refresh token arrives per request (header, or an
// `__refreshToken` argument injected by the orchestrator); the developer
// token is a static process-wide secret.

use axum::http::HeaderMap;
use serde_json::Value;

use crate::config::Config;
use crate::error::WorkflowError;

pub const REFRESH_TOKEN_HEADER: &str = "x-google-refresh-token";
const REFRESH_TOKEN_ARG: &str = "__refreshToken";

/// Credentials needed to talk to the Ads API on behalf of one caller.
#[derive(Clone)]
pub struct Credentials {
    pub refresh_token: String,
    pub developer_token: String,
}

// Hand-written so tokens never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("refresh_token", &"<redacted>")
            .field("developer_token", &"<redacted>")
            .finish()
    }
}

/// Resolve credentials for a tool call. Fails fast when either token is missing.
pub fn resolve(headers: &HeaderMap, args: &Value, config: &Config) -> Result<Credentials, WorkflowError> {
    let refresh_token = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| {
            args.get(REFRESH_TOKEN_ARG)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        })
        .ok_or_else(|| {
            WorkflowError::Configuration(
                "Refresh token required for Google Ads API. The client must send the \
                 X-Google-Refresh-Token header."
                    .to_string(),
            )
        })?;

    let developer_token = config.developer_token.clone().ok_or_else(|| {
        WorkflowError::Configuration("GOOGLE_ADS_DEVELOPER_TOKEN not configured".to_string())
    })?;

    Ok(Credentials {
        refresh_token,
        developer_token,
    })
}

/// Drop transport-only keys before arguments are echoed back as context.
pub fn strip_credential_args(args: &mut Value) {
    if let Some(obj) = args.as_object_mut() {
        obj.remove(REFRESH_TOKEN_ARG);
    }
}
