// AdsFlow - tool response shapes
// Three outcomes a tool call can have: guidance (discovery / input help),
// an approval request carrying a dry-run preview, or a final result.

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Text block shown to the agent (MCP `content[0].text`).
    #[serde(skip)]
    pub text: String,
}

impl ToolResponse {
    /// Discovery prompt or input guidance; `data` carries structured context.
    pub fn guidance(text: String, data: Value) -> Self {
        Self {
            success: true,
            requires_approval: None,
            preview: None,
            confirmation_token: None,
            message: None,
            data,
            text,
        }
    }

    pub fn approval_required(preview: String, token: String, message: String) -> Self {
        let text = format!(
            "{}\nconfirmationToken: {}\n\n{}",
            preview.trim_end(),
            token,
            message
        );
        Self {
            success: true,
            requires_approval: Some(true),
            preview: Some(preview),
            confirmation_token: Some(token),
            message: Some(message),
            data: Value::Null,
            text,
        }
    }

    pub fn completed(text: String, data: Value) -> Self {
        Self::guidance(text, data)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "success": self.success }))
    }
}

/// Success summary after an executed write.
pub fn format_success_summary(
    title: &str,
    operation: &str,
    details: &[(&str, String)],
    audit_id: &str,
    warnings: &[String],
    next_steps: &[&str],
) -> String {
    let mut out = format!("{}\n\n**Operation:** {}\n", title, operation);
    for (k, v) in details {
        out.push_str(&format!("**{}:** {}\n", k, v));
    }
    out.push_str(&format!(
        "\n**Audit Trail:**\n   • ID: {}\n   • Timestamp: {}\n",
        audit_id,
        chrono::Utc::now().to_rfc3339()
    ));
    if !warnings.is_empty() {
        out.push_str("\n**Important Notes:**\n");
        for w in warnings {
            out.push_str(&format!("   • {}\n", w));
        }
    }
    if !next_steps.is_empty() {
        out.push_str("\nWHAT YOU CAN DO NEXT:\n");
        for s in next_steps {
            out.push_str(&format!("   • {}\n", s));
        }
    }
    out
}
