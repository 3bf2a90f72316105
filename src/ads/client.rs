// AdsFlow - Google Ads REST client
// One client per tool call: the caller's refresh token is exchanged for an
// access token on first use and cached for the lifetime of the call.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{AdsClient, AdsClientFactory, AdsError, MutateResource};
use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::WorkflowError;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const ADS_API_BASE: &str = "https://googleads.googleapis.com";
/// Refresh the access token this long before Google says it expires.
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);
/// Hard stop for runaway pagination; hitting it is an error, not a truncation.
const MAX_SEARCH_PAGES: usize = 20;

#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Shared pieces every per-request client needs.
pub struct GoogleAdsRestFactory {
    http: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    login_customer_id: Option<String>,
    api_version: String,
}

impl GoogleAdsRestFactory {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            login_customer_id: config.login_customer_id.clone(),
            api_version: config.api_version.clone(),
        }
    }
}

impl AdsClientFactory for GoogleAdsRestFactory {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn AdsClient>, WorkflowError> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone()),
            _ => {
                return Err(WorkflowError::Configuration(
                    "GOOGLE_ADS_CLIENT_ID / GOOGLE_ADS_CLIENT_SECRET not configured".to_string(),
                ));
            }
        };

        Ok(Arc::new(GoogleAdsRestClient {
            http: self.http.clone(),
            client_id,
            client_secret,
            refresh_token: credentials.refresh_token.clone(),
            developer_token: credentials.developer_token.clone(),
            login_customer_id: self.login_customer_id.clone(),
            base_url: format!("{}/{}", ADS_API_BASE, self.api_version),
            access_token: Mutex::new(None),
        }))
    }
}

pub struct GoogleAdsRestClient {
    http: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    developer_token: String,
    login_customer_id: Option<String>,
    base_url: String,
    access_token: Mutex<Option<AccessToken>>,
}

impl GoogleAdsRestClient {
    async fn access_token(&self) -> Result<String, AdsError> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("ads client: exchanging refresh token for access token");
        let resp = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "ads client: token refresh rejected");
            return Err(AdsError::Auth(format!(
                "Google rejected the refresh token (HTTP {}): {}",
                status,
                truncate_str(&body, 300)
            )));
        }

        let tokens: GoogleTokenResponse = resp
            .json()
            .await
            .map_err(|e| AdsError::Decode(format!("token response: {}", e)))?;

        let lifetime = Duration::from_secs(tokens.expires_in).saturating_sub(TOKEN_EXPIRY_BUFFER);
        let value = tokens.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, AdsError> {
        let token = self.access_token().await?;
        let mut req = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("developer-token", &self.developer_token)
            .json(body);
        if let Some(login) = &self.login_customer_id {
            req = req.header("login-customer-id", login);
        }
        let resp = req.send().await?;
        decode_response(resp).await
    }
}

#[async_trait]
impl AdsClient for GoogleAdsRestClient {
    async fn list_accessible_customers(&self) -> Result<Vec<String>, AdsError> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(format!("{}/customers:listAccessibleCustomers", self.base_url))
            .bearer_auth(token)
            .header("developer-token", &self.developer_token)
            .send()
            .await?;
        let body = decode_response(resp).await?;

        let names: Vec<String> = body
            .get("resourceNames")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        tracing::info!(count = names.len(), "ads client: accessible accounts retrieved");
        Ok(names)
    }

    async fn search(&self, customer_id: &str, query: &str) -> Result<Vec<Value>, AdsError> {
        let url = format!("{}/customers/{}/googleAds:search", self.base_url, customer_id);
        let url = url.as_str();
        let rows = collect_pages(MAX_SEARCH_PAGES, move |page_token| {
            let mut body = json!({ "query": query });
            if let Some(t) = page_token {
                body["pageToken"] = Value::String(t);
            }
            async move { self.post_json(url, &body).await }
        })
        .await?;

        tracing::debug!(customer_id = %customer_id, rows = rows.len(), "ads client: search complete");
        Ok(rows)
    }

    async fn mutate(
        &self,
        customer_id: &str,
        resource: MutateResource,
        operations: Vec<Value>,
    ) -> Result<Value, AdsError> {
        let url = format!("{}/customers/{}/{}:mutate", self.base_url, customer_id, resource.path());
        let count = operations.len();
        let result = self
            .post_json(&url, &json!({ "operations": operations, "partialFailure": false }))
            .await?;
        tracing::info!(
            customer_id = %customer_id,
            resource = resource.path(),
            operations = count,
            "ads client: mutate complete"
        );
        Ok(result)
    }
}

/// Follow `nextPageToken` until the last page. Runs of more than `max_pages`
/// pages fail with [`AdsError::TooManyPages`] instead of returning a partial set.
async fn collect_pages<F, Fut>(max_pages: usize, mut fetch: F) -> Result<Vec<Value>, AdsError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Value, AdsError>>,
{
    let mut rows = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..max_pages {
        let page = fetch(page_token.take()).await?;
        if let Some(results) = page.get("results").and_then(|r| r.as_array()) {
            rows.extend(results.iter().cloned());
        }
        page_token = page
            .get("nextPageToken")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(String::from);
        if page_token.is_none() {
            return Ok(rows);
        }
    }

    tracing::warn!(
        pages = max_pages,
        rows = rows.len(),
        "ads client: search still had more pages at the page limit"
    );
    Err(AdsError::TooManyPages(max_pages))
}

async fn decode_response(resp: reqwest::Response) -> Result<Value, AdsError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .map(|v| format_ads_error(&v))
            .unwrap_or_else(|_| truncate_str(&text, 500));
        tracing::error!(status = status.as_u16(), "ads client: API error: {}", message);
        return Err(AdsError::Api {
            status: status.as_u16(),
            message,
        });
    }
    resp.json()
        .await
        .map_err(|e| AdsError::Decode(format!("response is not valid JSON: {}", e)))
}

/// Pull `ERROR_CODE: message` out of a Google Ads failure payload.
pub(crate) fn format_ads_error(body: &Value) -> String {
    let first = body
        .pointer("/error/details")
        .and_then(|d| d.as_array())
        .and_then(|details| {
            details
                .iter()
                .find_map(|d| d.get("errors").and_then(|e| e.as_array()).and_then(|e| e.first()))
        });

    if let Some(err) = first {
        let code = err
            .get("errorCode")
            .and_then(|c| c.as_object())
            .and_then(|c| c.values().next())
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN");
        let message = err.get("message").and_then(|m| m.as_str()).unwrap_or("Unknown error");
        return format!("{}: {}", code, message);
    }

    body.pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(String::from)
        .unwrap_or_else(|| truncate_str(&body.to_string(), 500))
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let boundary = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(max_len);
        format!("{}...", &s[..boundary])
    }
}
