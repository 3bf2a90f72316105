// AdsFlow - vagueness guard
// Heuristic check that a write request names concrete targets and values.
// Runs before any dry run is built. It is a nudge, not a security boundary.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::WorkflowError;

/// Scores at or above this block the operation.
pub const VAGUENESS_THRESHOLD: u32 = 30;
const MAX_SCORE: u32 = 100;

const QUANTIFIER_WEIGHT: u32 = 15;
const RELATIVE_WEIGHT: u32 = 20;
const INDEFINITE_WEIGHT: u32 = 25;
const CLARIFICATION_WEIGHT: u32 = 10;

const AMOUNT_KEYS: &[&str] = &[
    "dailyAmountDollars",
    "newDailyAmountDollars",
    "amount",
    "maxCpcDollars",
    "newBidDollars",
];
const CAMPAIGN_KEYS: &[&str] = &["campaignId", "campaignIds"];
const ACCOUNT_KEYS: &[&str] = &["customerId", "accountId", "property"];

static QUANTIFIERS: OnceLock<Vec<Regex>> = OnceLock::new();
static RELATIVE_TERMS: OnceLock<Vec<Regex>> = OnceLock::new();
static INDEFINITE_REFS: OnceLock<Vec<Regex>> = OnceLock::new();
static DIGIT_RE: OnceLock<Regex> = OnceLock::new();

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!(r"(?i)\b{}\b", p)).unwrap())
        .collect()
}

fn quantifiers() -> &'static [Regex] {
    QUANTIFIERS.get_or_init(|| {
        compile(&[
            "all",
            "every",
            "each",
            "most",
            "some",
            "few",
            "many",
            "several",
            "a (?:bunch|lot|few) of",
        ])
    })
}

fn relative_terms() -> &'static [Regex] {
    RELATIVE_TERMS.get_or_init(|| {
        compile(&[
            "high(?:er)?",
            "low(?:er)?",
            "big(?:ger)?",
            "small(?:er)?",
            "more",
            "less",
            "recent(?:ly)?",
            "old(?:er)?",
        ])
    })
}

fn indefinite_refs() -> &'static [Regex] {
    INDEFINITE_REFS.get_or_init(|| compile(&["it", "they", "them", "those", "these", "stuff", "things"]))
}

/// What a tool hands to the guard: operation name, a sentence describing the
/// request, the caller's own wording if any, and the parameters collected so far.
#[derive(Debug, Clone)]
pub struct VaguenessProbe<'a> {
    pub operation: &'a str,
    pub input_text: String,
    pub user_request: Option<String>,
    pub params: &'a Value,
}

impl<'a> VaguenessProbe<'a> {
    pub fn new(operation: &'a str, input_text: impl Into<String>, params: &'a Value) -> Self {
        Self {
            operation,
            input_text: input_text.into(),
            user_request: None,
            params,
        }
    }

    /// Attach the caller's own wording of the request, if any.
    pub fn with_user_request(mut self, user_request: Option<&str>) -> Self {
        self.user_request = user_request
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);
        self
    }

    /// Each piece of text scored on its own, lowercased.
    fn segments(&self) -> Vec<String> {
        std::iter::once(&self.input_text)
            .chain(self.user_request.as_ref())
            .map(|s| s.to_lowercase())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaguenessReport {
    pub is_vague: bool,
    pub score: u32,
    pub vague_terms: Vec<String>,
    pub required_clarifications: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VaguenessDetector;

impl VaguenessDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, probe: &VaguenessProbe<'_>) -> VaguenessReport {
        let segments = probe.segments();
        let text = segments.join(" ");
        let mut report = VaguenessReport::default();
        let mut score = 0u32;

        for re in quantifiers() {
            if let Some(m) = re.find(&text) {
                report.vague_terms.push(m.as_str().to_string());
                report
                    .required_clarifications
                    .push(format!("Specify exactly which items you want to {}", probe.operation));
                score += QUANTIFIER_WEIGHT;
            }
        }

        // A number in a segment makes its relative terms concrete ("raise to 50"),
        // but only within that segment.
        let digit = DIGIT_RE.get_or_init(|| Regex::new(r"\d").unwrap());
        let unquantified: Vec<&str> = segments
            .iter()
            .map(String::as_str)
            .filter(|s| !digit.is_match(s))
            .collect();
        for re in relative_terms() {
            if let Some(m) = unquantified.iter().find_map(|s| re.find(s)) {
                report.vague_terms.push(m.as_str().to_string());
                report.required_clarifications.push(format!(
                    "Specify exact values instead of relative terms like \"{}\"",
                    m.as_str()
                ));
                score += RELATIVE_WEIGHT;
            }
        }

        for re in indefinite_refs() {
            if let Some(m) = re.find(&text) {
                report.vague_terms.push(m.as_str().to_string());
                report.required_clarifications.push(format!(
                    "Specify what \"{}\" refers to (campaign ID, account ID, etc.)",
                    m.as_str()
                ));
                score += INDEFINITE_WEIGHT;
            }
        }

        check_missing_specifics(probe, &mut report);

        let clarifications = report.required_clarifications.len() as u32;
        report.score = (score + clarifications * CLARIFICATION_WEIGHT).min(MAX_SCORE);
        report.is_vague = report.score >= VAGUENESS_THRESHOLD;

        if report.is_vague {
            tracing::warn!(
                operation = probe.operation,
                score = report.score,
                terms = ?report.vague_terms,
                "vague request detected"
            );
        } else {
            tracing::debug!(operation = probe.operation, score = report.score, "vagueness check passed");
        }
        report
    }

    /// Explanation shown to the caller when a request is blocked.
    pub fn format(&self, report: &VaguenessReport) -> String {
        if !report.is_vague {
            return String::new();
        }

        let mut out = format!(
            "VAGUE REQUEST DETECTED\n\nVagueness Score: {}/100 ({}+ blocks execution)\n\n",
            report.score, VAGUENESS_THRESHOLD
        );
        if !report.vague_terms.is_empty() {
            out.push_str(&format!("Vague terms found: {}\n\n", report.vague_terms.join(", ")));
        }
        if !report.required_clarifications.is_empty() {
            out.push_str("Required clarifications:\n");
            for (i, c) in report.required_clarifications.iter().enumerate() {
                out.push_str(&format!("   {}. {}\n", i + 1, c));
            }
            out.push('\n');
        }
        if !report.suggestions.is_empty() {
            out.push_str("Suggestions:\n");
            for s in &report.suggestions {
                out.push_str(&format!("   • {}\n", s));
            }
            out.push('\n');
        }
        out.push_str("This operation is blocked until you provide specific details.\n");
        out.push_str("Please rephrase your request with exact values and identifiers.\n");
        out
    }

    pub fn enforce(&self, probe: &VaguenessProbe<'_>) -> Result<VaguenessReport, WorkflowError> {
        let report = self.detect(probe);
        if report.is_vague {
            return Err(WorkflowError::Vague(self.format(&report)));
        }
        Ok(report)
    }
}

/// Truthiness of a parameter: missing, null, false, 0 and "" all count as absent.
fn has_any(params: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|k| match params.get(*k) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(_) => true,
    })
}

fn check_missing_specifics(probe: &VaguenessProbe<'_>, report: &mut VaguenessReport) {
    let op = probe.operation;
    let params = probe.params;

    if (op.contains("budget") || op.contains("bid")) && !has_any(params, AMOUNT_KEYS) {
        report
            .required_clarifications
            .push("Specify the exact budget or bid amount in dollars".to_string());
        report.suggestions.push("Example: \"Set budget to $100/day\"".to_string());
    }

    if op.contains("campaign") && !op.starts_with("create_") && !has_any(params, CAMPAIGN_KEYS) {
        report
            .required_clarifications
            .push("Specify the campaign ID or list of campaign IDs".to_string());
        report.suggestions.push("Use list_campaigns first to get campaign IDs".to_string());
    }

    if !has_any(params, ACCOUNT_KEYS) {
        report
            .required_clarifications
            .push("Specify which account/customer to operate on".to_string());
        report.suggestions.push("Provide the customerId parameter".to_string());
    }

    if (op.contains("status") || op.contains("pause") || op.contains("enable")) && !has_any(params, &["status"]) {
        report
            .required_clarifications
            .push("Specify the target status (ENABLED, PAUSED, or REMOVED)".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(op: &str, text: &str, params: Value) -> VaguenessReport {
        VaguenessDetector::new().detect(&VaguenessProbe::new(op, text, &params))
    }

    #[test]
    fn specific_request_passes() {
        let r = detect(
            "update_campaign_status",
            "update campaign 123 to PAUSED",
            json!({ "customerId": "1234567890", "campaignId": "123", "status": "PAUSED" }),
        );
        assert!(!r.is_vague);
        assert_eq!(r.score, 0);
    }

    #[test]
    fn quantifier_and_indefinite_reference_block() {
        // "all" +15, "them" +25, two clarifications +20
        let r = detect(
            "update_campaign_status",
            "pause all of them",
            json!({ "customerId": "1234567890", "campaignId": "123", "status": "PAUSED" }),
        );
        assert!(r.is_vague);
        assert_eq!(r.score, 60);
        assert_eq!(r.vague_terms, vec!["all", "them"]);
    }

    #[test]
    fn relative_terms_ignored_when_numbers_present() {
        let params = json!({ "customerId": "1234567890", "budgetId": "9", "newDailyAmountDollars": 50 });
        let with_number = detect("update_budget", "make budget higher, to 50", params.clone());
        assert!(!with_number.is_vague);

        // "higher" +20, clarification +10
        let without = detect("update_budget", "make budget higher", params);
        assert_eq!(without.score, 30);
        assert!(without.is_vague);
    }

    #[test]
    fn relative_terms_in_user_request_count_despite_numeric_description() {
        let params = json!({ "customerId": "1234567890", "adGroupId": "111", "maxCpcDollars": 2.5 });
        let probe = VaguenessProbe::new("set_keyword_bid", "set keyword 222 in ad group 111 bid to $2.50", &params)
            .with_user_request(Some("make the bid higher"));
        let r = VaguenessDetector::new().detect(&probe);
        // "higher" +20, clarification +10
        assert_eq!(r.vague_terms, vec!["higher"]);
        assert_eq!(r.score, 30);
        assert!(r.is_vague);

        let concrete = VaguenessProbe::new("set_keyword_bid", "set keyword 222 in ad group 111 bid to $2.50", &params)
            .with_user_request(Some("make the bid higher, to 2.50"));
        assert!(!VaguenessDetector::new().detect(&concrete).is_vague);
    }

    #[test]
    fn new_campaigns_do_not_need_a_campaign_id() {
        let r = detect(
            "create_campaign",
            "create SEARCH campaign Spring Sale on budget 9",
            json!({ "customerId": "1234567890", "budgetId": "9", "name": "Spring Sale" }),
        );
        assert!(r.required_clarifications.is_empty());
        assert!(!r.is_vague);
    }

    #[test]
    fn missing_specifics_add_up() {
        // missing amount, campaign, account, status: 4 × 10
        let r = detect("update_campaign_status_budget", "do the update", json!({}));
        assert_eq!(r.required_clarifications.len(), 4);
        assert_eq!(r.score, 40);
        assert!(r.is_vague);
    }

    #[test]
    fn zero_amount_counts_as_missing() {
        let r = detect("set_keyword_bid", "set bid", json!({ "customerId": "1", "maxCpcDollars": 0 }));
        assert_eq!(r.required_clarifications.len(), 1);
        assert!(!r.is_vague);
    }

    #[test]
    fn score_is_capped() {
        let r = detect(
            "update_campaign_status",
            "all every each most some few many several of them these those things stuff",
            json!({}),
        );
        assert_eq!(r.score, 100);
    }

    #[test]
    fn user_request_is_scored() {
        let params = json!({ "customerId": "1234567890", "campaignId": "5", "status": "PAUSED" });
        let probe = VaguenessProbe::new("update_campaign_status", "update campaign 5 to PAUSED", &params)
            .with_user_request(Some("pause those things"));
        let err = VaguenessDetector::new().enforce(&probe).unwrap_err();
        match err {
            WorkflowError::Vague(msg) => {
                assert!(msg.contains("VAGUE REQUEST DETECTED"));
                assert!(msg.contains("those"));
                assert!(msg.contains("blocked until you provide specific details"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn words_containing_terms_do_not_match() {
        let r = detect(
            "add_keywords",
            "add 3 keywords: italy tours, smallville",
            json!({ "customerId": "1234567890" }),
        );
        assert!(r.vague_terms.is_empty());
    }
}
