// AdsFlow - error taxonomy shared by the workflow engine and tools.
//
// Every variant carries a message written for the agent (or human) on the
// other end of the MCP connection. Nothing here is meant to be parsed.

use crate::ads::AdsError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing developer token, refresh token or OAuth client credentials.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rejected by the vagueness guard. The payload is the full explanation.
    #[error("{0}")]
    Vague(String),

    /// Bad IDs, amounts, URLs, bulk limits and similar caller mistakes.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "Invalid or already used confirmation token. Run the tool again without \
         confirmationToken to generate a fresh preview."
    )]
    InvalidConfirmation,

    #[error(
        "Confirmation token has expired (tokens are valid for {ttl_secs} seconds). \
         Generate a new preview and confirm it in time."
    )]
    ConfirmationExpired { ttl_secs: u64 },

    #[error(
        "The operation no longer matches the preview that was approved (current values or \
         parameters changed). Generate a fresh preview before confirming."
    )]
    DryRunChanged,

    #[error("Google Ads API error: {0}")]
    Ads(#[from] AdsError),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WorkflowError::Validation(msg.into())
    }

    /// Short machine-ish label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Configuration(_) => "configuration",
            WorkflowError::Vague(_) => "vague",
            WorkflowError::Validation(_) => "validation",
            WorkflowError::InvalidConfirmation => "invalid_confirmation",
            WorkflowError::ConfirmationExpired { .. } => "confirmation_expired",
            WorkflowError::DryRunChanged => "dry_run_changed",
            WorkflowError::Ads(_) => "ads_api",
        }
    }
}
