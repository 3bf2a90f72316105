//! Dry-run previews and the confirmation registry.
//!
//! A write tool first describes what it would do as a [`DryRun`]. The
//! registry stores it under a random single-use token and hands back a
//! human-readable preview. When the caller returns with the token, the
//! registry claims it, checks that the operation about to run is the one
//! that was previewed, and only then runs the mutation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::store::PendingStore;
use crate::ads::format_dollars;
use crate::error::WorkflowError;

/// Average days per month used for monthly projections.
pub const DAYS_PER_MONTH: f64 = 30.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    fn label(&self) -> &'static str {
        match self {
            ChangeType::Create => "CREATE",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedChange {
    pub resource: String,
    pub resource_id: String,
    pub field: String,
    pub current_value: Option<Value>,
    pub new_value: Value,
    pub change_type: ChangeType,
}

impl ProposedChange {
    pub fn update(resource: &str, resource_id: &str, field: &str, current: Value, new: Value) -> Self {
        Self {
            resource: resource.to_string(),
            resource_id: resource_id.to_string(),
            field: field.to_string(),
            current_value: Some(current),
            new_value: new,
            change_type: ChangeType::Update,
        }
    }

    pub fn create(resource: &str, resource_id: &str, field: &str, new: Value) -> Self {
        Self {
            resource: resource.to_string(),
            resource_id: resource_id.to_string(),
            field: field.to_string(),
            current_value: None,
            new_value: new,
            change_type: ChangeType::Create,
        }
    }

    pub fn delete(resource: &str, resource_id: &str, field: &str, current: Value, new: Value) -> Self {
        Self {
            resource: resource.to_string(),
            resource_id: resource_id.to_string(),
            field: field.to_string(),
            current_value: Some(current),
            new_value: new,
            change_type: ChangeType::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialImpact {
    pub current_daily_spend: f64,
    pub new_daily_spend: f64,
    pub daily_difference: f64,
    pub monthly_difference: f64,
    /// None when the current spend is zero.
    pub percentage_change: Option<f64>,
}

impl FinancialImpact {
    pub fn from_daily(current: f64, new: f64) -> Self {
        let daily_difference = new - current;
        let percentage_change = (current > 0.0).then(|| daily_difference / current * 100.0);
        Self {
            current_daily_spend: current,
            new_daily_spend: new,
            daily_difference,
            monthly_difference: daily_difference * DAYS_PER_MONTH,
            percentage_change,
        }
    }
}

/// Everything the preview shows; built deterministically by the tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRun {
    pub operation: String,
    pub target_system: String,
    pub account_id: String,
    pub changes: Vec<ProposedChange>,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_impact: Option<FinancialImpact>,
}

impl DryRun {
    /// SHA-256 over operation, target, account and changes.
    pub fn fingerprint(&self) -> String {
        let canonical = json!({
            "operation": self.operation,
            "targetSystem": self.target_system,
            "accountId": self.account_id,
            "changes": self.changes,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

pub struct DryRunBuilder {
    dry_run: DryRun,
}

impl DryRunBuilder {
    pub fn new(operation: &str, target_system: &str, account_id: &str) -> Self {
        Self {
            dry_run: DryRun {
                operation: operation.to_string(),
                target_system: target_system.to_string(),
                account_id: account_id.to_string(),
                changes: Vec::new(),
                risks: Vec::new(),
                recommendations: Vec::new(),
                estimated_impact: None,
            },
        }
    }

    pub fn change(mut self, change: ProposedChange) -> Self {
        self.dry_run.changes.push(change);
        self
    }

    pub fn risk(mut self, risk: impl Into<String>) -> Self {
        self.dry_run.risks.push(risk.into());
        self
    }

    pub fn recommendation(mut self, rec: impl Into<String>) -> Self {
        self.dry_run.recommendations.push(rec.into());
        self
    }

    pub fn financial_impact(mut self, impact: FinancialImpact) -> Self {
        self.dry_run.estimated_impact = Some(impact);
        self
    }

    pub fn build(self) -> DryRun {
        self.dry_run
    }
}

/// A previewed operation waiting for confirmation. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub token: String,
    pub dry_run: DryRun,
    pub fingerprint: String,
    pub params_snapshot: Value,
    pub created_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(token: String, dry_run: DryRun, params_snapshot: Value) -> Self {
        let fingerprint = dry_run.fingerprint();
        Self {
            token,
            dry_run,
            fingerprint,
            params_snapshot,
            created_at: Utc::now(),
        }
    }

    /// Expiry is measured from `created_at`, so it survives serialization.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => Utc::now().signed_duration_since(self.created_at) >= ttl,
            Err(_) => false,
        }
    }
}

/// 32 CSPRNG bytes, hex encoded.
fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "(none)".to_string(),
        other => other.to_string(),
    }
}

fn format_signed_dollars(amount: f64) -> String {
    if amount < 0.0 {
        format!("-{}", format_dollars(-amount))
    } else {
        format!("+{}", format_dollars(amount))
    }
}

/// Human-readable preview. Lists every change, risk and recommendation.
pub fn format_dry_run_for_display(dry_run: &DryRun, ttl: Duration) -> String {
    let mut out = format!(
        "DRY-RUN PREVIEW: {}\n\nTarget: {}\nAccount: {}\n\nPROPOSED CHANGES ({}):\n",
        dry_run.operation,
        dry_run.target_system,
        dry_run.account_id,
        dry_run.changes.len()
    );

    for (i, c) in dry_run.changes.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {} {} :: {}\n",
            i + 1,
            c.change_type.label(),
            c.resource,
            c.resource_id,
            c.field
        ));
        match &c.current_value {
            Some(current) => out.push_str(&format!(
                "   {} → {}\n",
                render_value(current),
                render_value(&c.new_value)
            )),
            None => out.push_str(&format!("   new value: {}\n", render_value(&c.new_value))),
        }
    }

    if let Some(impact) = &dry_run.estimated_impact {
        out.push_str("\nFINANCIAL IMPACT:\n");
        out.push_str(&format!(
            "   Daily spend: {} → {} ({}/day)\n",
            format_dollars(impact.current_daily_spend),
            format_dollars(impact.new_daily_spend),
            format_signed_dollars(impact.daily_difference)
        ));
        out.push_str(&format!(
            "   Monthly difference: {} (×{} days)\n",
            format_signed_dollars(impact.monthly_difference),
            DAYS_PER_MONTH
        ));
        if let Some(pct) = impact.percentage_change {
            out.push_str(&format!("   Change: {:+.1}%\n", pct));
        }
    }

    if !dry_run.risks.is_empty() {
        out.push_str("\nRISKS:\n");
        for r in &dry_run.risks {
            out.push_str(&format!("   ⚠ {}\n", r));
        }
    }

    if !dry_run.recommendations.is_empty() {
        out.push_str("\nRECOMMENDATIONS:\n");
        for r in &dry_run.recommendations {
            out.push_str(&format!("   • {}\n", r));
        }
    }

    out.push_str(&format!(
        "\nThis preview expires in {} seconds. Nothing has been changed yet.\n",
        ttl.as_secs()
    ));
    out
}

// ── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatedDryRun {
    pub confirmation_token: String,
    pub preview: String,
}

pub struct DryRunRegistry {
    store: Arc<dyn PendingStore>,
    ttl: Duration,
}

impl DryRunRegistry {
    pub fn new(store: Arc<dyn PendingStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store the dry run under a fresh token and render its preview.
    /// Never touches the Ads write path.
    pub async fn create_dry_run(&self, dry_run: DryRun, params_snapshot: Value) -> CreatedDryRun {
        let token = generate_token();
        let preview = format_dry_run_for_display(&dry_run, self.ttl);

        tracing::info!(
            operation = %dry_run.operation,
            account_id = %dry_run.account_id,
            changes = dry_run.changes.len(),
            risks = dry_run.risks.len(),
            "dry run created"
        );

        self.store
            .insert(PendingOperation::new(token.clone(), dry_run, params_snapshot))
            .await;

        CreatedDryRun {
            confirmation_token: token,
            preview,
        }
    }

    /// Claim `token`, check it still matches `expected`, then run `execute`.
    ///
    /// The token is consumed on success and on every validation failure. If
    /// `execute` itself fails the pending operation is restored so the caller
    /// can retry with the same token.
    pub async fn validate_and_execute<F, Fut, T>(
        &self,
        token: &str,
        expected: &DryRun,
        execute: F,
    ) -> Result<T, WorkflowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
    {
        let Some(pending) = self.store.take(token).await else {
            tracing::warn!(operation = %expected.operation, "confirmation rejected: unknown token");
            return Err(WorkflowError::InvalidConfirmation);
        };

        if pending.is_expired(self.ttl) {
            tracing::warn!(
                operation = %pending.dry_run.operation,
                created_at = %pending.created_at,
                "confirmation rejected: token expired"
            );
            return Err(WorkflowError::ConfirmationExpired {
                ttl_secs: self.ttl.as_secs(),
            });
        }

        if pending.fingerprint != expected.fingerprint() {
            tracing::warn!(
                operation = %pending.dry_run.operation,
                "confirmation rejected: operation differs from preview"
            );
            return Err(WorkflowError::DryRunChanged);
        }

        match execute().await {
            Ok(value) => {
                tracing::info!(operation = %pending.dry_run.operation, "confirmed operation executed");
                Ok(value)
            }
            Err(e) => {
                tracing::error!(
                    operation = %pending.dry_run.operation,
                    error = %e,
                    "confirmed operation failed; token restored"
                );
                self.store.insert(pending).await;
                Err(e)
            }
        }
    }

    pub async fn purge_expired(&self) -> usize {
        let purged = self.store.purge_expired(self.ttl).await;
        if purged > 0 {
            tracing::debug!(purged, "expired confirmation tokens purged");
        }
        purged
    }

    pub async fn pending_count(&self) -> usize {
        self.store.len().await
    }
}
