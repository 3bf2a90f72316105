//! Google Ads facade.
//!
//! The workflow engine and tools only see the [`AdsClient`] trait: list the
//! caller's accounts, run GAQL searches, and send mutate operations. The
//! production implementation talks to the Ads REST API
//! ([`client::GoogleAdsRestClient`]); tests plug in a recording mock.

pub mod client;
pub mod gaql;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::credentials::Credentials;
use crate::error::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum AdsError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("search returned more than {0} pages; narrow the query")]
    TooManyPages(usize),
}

/// Resource collections the write tools mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutateResource {
    Campaigns,
    CampaignBudgets,
    AdGroupCriteria,
}

impl MutateResource {
    /// Path segment of the REST `:mutate` endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            MutateResource::Campaigns => "campaigns",
            MutateResource::CampaignBudgets => "campaignBudgets",
            MutateResource::AdGroupCriteria => "adGroupCriteria",
        }
    }
}

/// Read and write surface of the advertising platform, scoped to one caller.
#[async_trait]
pub trait AdsClient: Send + Sync {
    /// Resource names (`customers/{id}`) the caller can access.
    async fn list_accessible_customers(&self) -> Result<Vec<String>, AdsError>;

    /// Run a GAQL query and return every result row (all pages).
    async fn search(&self, customer_id: &str, query: &str) -> Result<Vec<Value>, AdsError>;

    /// Send mutate operations; the raw response (including any
    /// `partialFailureError`) is returned uninterpreted.
    async fn mutate(
        &self,
        customer_id: &str,
        resource: MutateResource,
        operations: Vec<Value>,
    ) -> Result<Value, AdsError>;
}

/// Builds an [`AdsClient`] for the credentials of one request.
pub trait AdsClientFactory: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn AdsClient>, WorkflowError>;
}

// ── Row helpers ─────────────────────────────────────────────────────────────
// REST rows are camelCase JSON; int64 fields arrive as strings.

/// String value at a JSON pointer, accepting numbers too.
pub fn str_at(row: &Value, pointer: &str) -> Option<String> {
    match row.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer value at a JSON pointer, accepting int64-as-string.
pub fn i64_at(row: &Value, pointer: &str) -> Option<i64> {
    match row.pointer(pointer)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

// ── Money & ID helpers ──────────────────────────────────────────────────────

pub fn amount_to_micros(dollars: f64) -> i64 {
    (dollars * 1_000_000.0).round() as i64
}

pub fn micros_to_amount(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// `$2.50` style rendering used across previews and summaries.
pub fn format_dollars(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Validate a dollar amount supplied by the caller.
pub fn positive_amount(field: &str, value: f64) -> Result<f64, WorkflowError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(WorkflowError::validation(format!(
            "{} must be a positive dollar amount, got {}",
            field, value
        )));
    }
    Ok(value)
}

/// Normalize a customer ID: dashes are dropped, exactly 10 digits remain.
pub fn normalize_customer_id(raw: &str) -> Result<String, WorkflowError> {
    let id: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if id.len() != 10 || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(WorkflowError::validation(format!(
            "customerId must be 10 digits (dashes allowed), got '{}'",
            raw
        )));
    }
    Ok(id)
}

/// `customers/1234567890` → `1234567890`
pub fn customer_id_from_resource(resource_name: &str) -> &str {
    resource_name.strip_prefix("customers/").unwrap_or(resource_name)
}
