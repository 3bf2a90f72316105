// AdsFlow - audit
//! Audit trail for executed writes.
//!
//! Entries go to the `audit` tracing target so they can be routed to their
//! own sink by the subscriber. Recording never fails the write it describes.

use serde_json::Value;

/// Record an executed write and return its audit ID.
///
/// * `operation`: tool name (e.g. "set_keyword_bid").
/// * `account_id`: customer the write touched.
/// * `details`: changes and the raw API result.
pub fn log_write(operation: &str, account_id: &str, details: &Value) -> String {
    let audit_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        target: "audit",
        audit_id = %audit_id,
        operation = %operation,
        account_id = %account_id,
        details = %details,
        "write executed"
    );
    audit_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audit_ids_are_unique_uuids() {
        let a = log_write("update_budget", "1234567890", &json!({}));
        let b = log_write("update_budget", "1234567890", &json!({}));
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
