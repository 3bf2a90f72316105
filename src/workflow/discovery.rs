//! Discovery step builder.
//!
//! Tools declare their required parameters in order. On every call the
//! builder finds the first one the caller has not supplied yet, fetches the
//! selectable candidates for it (accounts, campaigns, ad groups, keywords,
//! budgets) and renders a numbered prompt. The server keeps no session: the
//! agent echoes the collected parameters back on the next call.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::ads::gaql::Query;
use crate::ads::{self, AdsClient};
use crate::error::WorkflowError;
use crate::workflow::response::ToolResponse;

/// Where candidates for a parameter come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Account,
    Campaign,
    AdGroup,
    Keyword,
    Budget,
    /// Free-form value (amount, status, keyword list); guidance only, no fetch.
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub title: &'static str,
    /// Question shown under the candidate list (or the whole guidance for `Input`).
    pub prompt: &'static str,
    pub kind: ParamKind,
    /// Explanation used when the candidate list comes back empty.
    pub empty_guidance: &'static str,
    /// Tool that fixes an empty list, if any.
    pub remedy_tool: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub label: String,
    pub value: String,
}

// ── Context ─────────────────────────────────────────────────────────────────

/// Parameters collected so far, exactly as the caller sent them.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryContext {
    params: Map<String, Value>,
}

impl DiscoveryContext {
    pub fn from_args(args: &Value) -> Self {
        Self {
            params: args.as_object().cloned().unwrap_or_default(),
        }
    }

    /// Present = non-null and not an empty string / array / object.
    pub fn is_present(&self, name: &str) -> bool {
        match self.params.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(_) => true,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Numbers may arrive as JSON numbers or numeric strings.
    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.params.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_start_matches('$').parse().ok(),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Customer ID normalized to 10 digits.
    pub fn customer_id(&self) -> Result<String, WorkflowError> {
        let raw = self
            .str("customerId")
            .ok_or_else(|| WorkflowError::validation("customerId is required"))?;
        ads::normalize_customer_id(raw)
    }

    /// Snapshot of the declared parameters, in declared order, for echoing back.
    pub fn snapshot(&self, specs: &[ParamSpec]) -> Map<String, Value> {
        specs
            .iter()
            .filter(|s| self.is_present(s.name))
            .filter_map(|s| self.params.get(s.name).map(|v| (s.name.to_string(), v.clone())))
            .collect()
    }
}

// ── Steps ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum DiscoveryStep {
    /// Candidates to choose from for `param`.
    Prompt {
        param: &'static str,
        text: String,
        candidates: Vec<Candidate>,
        context: Map<String, Value>,
    },
    /// Candidate list came back empty; guidance explains why and what to do.
    NoCandidates {
        param: &'static str,
        text: String,
        context: Map<String, Value>,
    },
    /// Free-form parameter; guidance describes the expected value.
    Input {
        param: &'static str,
        text: String,
        context: Map<String, Value>,
    },
    /// Every required parameter is present.
    Complete,
}

impl DiscoveryStep {
    pub fn param(&self) -> Option<&'static str> {
        match self {
            DiscoveryStep::Prompt { param, .. }
            | DiscoveryStep::NoCandidates { param, .. }
            | DiscoveryStep::Input { param, .. } => Some(param),
            DiscoveryStep::Complete => None,
        }
    }

    /// Rendered response for the caller, or None once discovery is done.
    pub fn into_response(self) -> Option<ToolResponse> {
        match self {
            DiscoveryStep::Prompt {
                param,
                text,
                candidates,
                context,
            } => Some(ToolResponse::guidance(
                text,
                json!({ "items": candidates, "nextParam": param, "context": context }),
            )),
            DiscoveryStep::NoCandidates { param, text, context }
            | DiscoveryStep::Input { param, text, context } => Some(ToolResponse::guidance(
                text,
                json!({ "items": [], "nextParam": param, "context": context }),
            )),
            DiscoveryStep::Complete => None,
        }
    }
}

/// Resolve the next missing parameter, strictly in declared order.
pub async fn next_step(
    specs: &[ParamSpec],
    ctx: &DiscoveryContext,
    client: &dyn AdsClient,
) -> Result<DiscoveryStep, WorkflowError> {
    let Some((index, spec)) = specs.iter().enumerate().find(|(_, s)| !ctx.is_present(s.name)) else {
        return Ok(DiscoveryStep::Complete);
    };

    let step = format!("{}/{}", index + 1, specs.len());
    // Only what precedes the gap counts as collected context.
    let context = ctx.snapshot(&specs[..index]);

    tracing::debug!(param = spec.name, step = %step, "discovery: requesting parameter");

    if spec.kind == ParamKind::Input {
        let text = format!(
            "{} (Step {})\n{}\n{}\n\nProvide: {}",
            spec.title,
            step,
            render_context(&context),
            spec.prompt,
            spec.name
        );
        return Ok(DiscoveryStep::Input {
            param: spec.name,
            text,
            context,
        });
    }

    let candidates = fetch_candidates(spec.kind, ctx).run(client).await?;

    if candidates.is_empty() {
        let mut text = format!(
            "NO OPTIONS FOUND FOR {} (Step {})\n{}\n{}",
            spec.name,
            step,
            render_context(&context),
            spec.empty_guidance
        );
        if let Some(tool) = spec.remedy_tool {
            text.push_str(&format!("\n\nNext step: use {} first, then call this tool again.", tool));
        }
        return Ok(DiscoveryStep::NoCandidates {
            param: spec.name,
            text,
            context,
        });
    }

    let list = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.label))
        .collect::<Vec<_>>()
        .join("\n");
    let text = format!(
        "{} (Step {})\n{}\n{}\n\n{}\nProvide: {}",
        spec.title,
        step,
        render_context(&context),
        list,
        spec.prompt,
        spec.name
    );

    Ok(DiscoveryStep::Prompt {
        param: spec.name,
        text,
        candidates,
        context,
    })
}

fn render_context(context: &Map<String, Value>) -> String {
    if context.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = context
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("- {}: {}", k, s),
            other => format!("- {}: {}", k, other),
        })
        .collect();
    format!("\nCurrent Context:\n{}\n", lines.join("\n"))
}

// ── Candidate fetching ──────────────────────────────────────────────────────

/// A read-only lookup against the facade, prepared from the context.
enum Fetch {
    Accounts,
    Query {
        customer_id: String,
        query: String,
        kind: ParamKind,
    },
    Invalid(WorkflowError),
}

fn fetch_candidates(kind: ParamKind, ctx: &DiscoveryContext) -> Fetch {
    if kind == ParamKind::Account {
        return Fetch::Accounts;
    }
    let customer_id = match ctx.customer_id() {
        Ok(id) => id,
        Err(e) => return Fetch::Invalid(e),
    };
    let query = match candidate_query(kind, ctx) {
        Ok(q) => q,
        Err(e) => return Fetch::Invalid(e),
    };
    Fetch::Query {
        customer_id,
        query,
        kind,
    }
}

fn candidate_query(kind: ParamKind, ctx: &DiscoveryContext) -> Result<String, WorkflowError> {
    let query = match kind {
        ParamKind::Campaign => Query::select(&["campaign.id", "campaign.name", "campaign.status"])
            .from("campaign")
            .filter("campaign.status != 'REMOVED'")
            .order_by("campaign.name"),
        ParamKind::AdGroup => {
            let mut q = Query::select(&["ad_group.id", "ad_group.name", "ad_group.status", "campaign.name"])
                .from("ad_group")
                .filter("ad_group.status != 'REMOVED'");
            if let Some(campaign_id) = ctx.str("campaignId") {
                q = q.where_id("campaign.id", campaign_id)?;
            }
            q.order_by("ad_group.name")
        }
        ParamKind::Keyword => {
            let mut q = Query::select(&[
                "ad_group_criterion.resource_name",
                "ad_group_criterion.criterion_id",
                "ad_group_criterion.keyword.text",
                "ad_group_criterion.keyword.match_type",
                "ad_group_criterion.cpc_bid_micros",
                "ad_group.name",
            ])
            .from("keyword_view")
            .filter("ad_group_criterion.status != 'REMOVED'");
            if let Some(ad_group_id) = ctx.str("adGroupId") {
                q = q.where_id("ad_group.id", ad_group_id)?;
            }
            q.limit(100)
        }
        ParamKind::Budget => Query::select(&[
            "campaign_budget.id",
            "campaign_budget.name",
            "campaign_budget.amount_micros",
        ])
        .from("campaign_budget")
        .filter("campaign_budget.status = 'ENABLED'"),
        ParamKind::Account | ParamKind::Input => {
            return Err(WorkflowError::validation("parameter has no candidate query"));
        }
    };
    Ok(query.build())
}

impl Fetch {
    async fn run(self, client: &dyn AdsClient) -> Result<Vec<Candidate>, WorkflowError> {
        match self {
            Fetch::Invalid(e) => Err(e),
            Fetch::Accounts => {
                let names = client.list_accessible_customers().await?;
                Ok(names
                    .iter()
                    .map(|rn| {
                        let id = ads::customer_id_from_resource(rn).to_string();
                        Candidate {
                            label: format!("Customer ID: {}", id),
                            value: id,
                        }
                    })
                    .collect())
            }
            Fetch::Query {
                customer_id,
                query,
                kind,
            } => {
                let rows = client.search(&customer_id, &query).await?;
                Ok(rows.iter().filter_map(|row| candidate_from_row(kind, row)).collect())
            }
        }
    }
}

fn candidate_from_row(kind: ParamKind, row: &Value) -> Option<Candidate> {
    match kind {
        ParamKind::Campaign => {
            let id = ads::str_at(row, "/campaign/id")?;
            let name = ads::str_at(row, "/campaign/name").unwrap_or_else(|| "Unnamed campaign".into());
            let status = ads::str_at(row, "/campaign/status").unwrap_or_default();
            Some(Candidate {
                label: format!("{} (ID: {}) [{}]", name, id, status),
                value: id,
            })
        }
        ParamKind::AdGroup => {
            let id = ads::str_at(row, "/adGroup/id")?;
            let name = ads::str_at(row, "/adGroup/name").unwrap_or_else(|| "Unnamed ad group".into());
            let campaign = ads::str_at(row, "/campaign/name").unwrap_or_default();
            Some(Candidate {
                label: format!("{} (ID: {}) in campaign \"{}\"", name, id, campaign),
                value: id,
            })
        }
        ParamKind::Keyword => {
            let resource = ads::str_at(row, "/adGroupCriterion/resourceName")?;
            let text = ads::str_at(row, "/adGroupCriterion/keyword/text").unwrap_or_default();
            let match_type = ads::str_at(row, "/adGroupCriterion/keyword/matchType").unwrap_or_default();
            let bid = ads::i64_at(row, "/adGroupCriterion/cpcBidMicros")
                .map(|m| ads::format_dollars(ads::micros_to_amount(m)))
                .unwrap_or_else(|| "Not set".into());
            Some(Candidate {
                label: format!("\"{}\" [{}] max CPC {} ({})", text, match_type, bid, resource),
                value: resource,
            })
        }
        ParamKind::Budget => {
            let id = ads::str_at(row, "/campaignBudget/id")?;
            let name = ads::str_at(row, "/campaignBudget/name").unwrap_or_else(|| "Unnamed budget".into());
            let amount = ads::i64_at(row, "/campaignBudget/amountMicros")
                .map(|m| ads::format_dollars(ads::micros_to_amount(m)))
                .unwrap_or_else(|| "$0.00".into());
            Some(Candidate {
                label: format!("{} (ID: {}) {}/day", name, id, amount),
                value: id,
            })
        }
        ParamKind::Account | ParamKind::Input => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::{AdsError, MutateResource};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAds {
        accounts: Vec<String>,
        rows: Vec<Value>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AdsClient for FakeAds {
        async fn list_accessible_customers(&self) -> Result<Vec<String>, AdsError> {
            Ok(self.accounts.clone())
        }
        async fn search(&self, _customer_id: &str, query: &str) -> Result<Vec<Value>, AdsError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.rows.clone())
        }
        async fn mutate(&self, _: &str, _: MutateResource, _: Vec<Value>) -> Result<Value, AdsError> {
            panic!("discovery must never write");
        }
    }

    const SPECS: &[ParamSpec] = &[
        ParamSpec {
            name: "customerId",
            title: "SELECT GOOGLE ADS ACCOUNT",
            prompt: "Which account?",
            kind: ParamKind::Account,
            empty_guidance: "No accessible accounts.",
            remedy_tool: None,
        },
        ParamSpec {
            name: "campaignId",
            title: "SELECT CAMPAIGN",
            prompt: "Which campaign?",
            kind: ParamKind::Campaign,
            empty_guidance: "This account has no campaigns.",
            remedy_tool: Some("create_campaign"),
        },
        ParamSpec {
            name: "status",
            title: "SELECT STATUS",
            prompt: "ENABLED, PAUSED or REMOVED?",
            kind: ParamKind::Input,
            empty_guidance: "",
            remedy_tool: None,
        },
    ];

    #[tokio::test]
    async fn asks_for_first_missing_param_even_if_later_ones_are_present() {
        let ads = FakeAds {
            accounts: vec!["customers/1234567890".into(), "customers/9876543210".into()],
            ..Default::default()
        };
        let ctx = DiscoveryContext::from_args(&json!({ "status": "PAUSED", "campaignId": "5" }));

        let step = next_step(SPECS, &ctx, &ads).await.unwrap();
        assert_eq!(step.param(), Some("customerId"));
        match step {
            DiscoveryStep::Prompt { text, candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert_eq!(candidates[0].value, "1234567890");
                assert!(text.contains("(Step 1/3)"));
                assert!(text.contains("1. Customer ID: 1234567890"));
                assert!(text.contains("Provide: customerId"));
            }
            other => panic!("expected prompt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn every_missing_combination_yields_earliest_gap() {
        let ads = FakeAds {
            accounts: vec!["customers/1234567890".into()],
            rows: vec![json!({ "campaign": { "id": "5", "name": "Brand", "status": "ENABLED" } })],
            ..Default::default()
        };
        let all = [("customerId", json!("1234567890")), ("campaignId", json!("5")), ("status", json!("PAUSED"))];
        for mask in 0u8..8 {
            let mut args = Map::new();
            for (i, (k, v)) in all.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    args.insert(k.to_string(), v.clone());
                }
            }
            let ctx = DiscoveryContext::from_args(&Value::Object(args));
            let expected = all
                .iter()
                .enumerate()
                .find(|(i, _)| mask & (1 << i) == 0)
                .map(|(_, (k, _))| *k);
            let step = next_step(SPECS, &ctx, &ads).await.unwrap();
            assert_eq!(step.param(), expected, "mask {:03b}", mask);
        }
    }

    #[tokio::test]
    async fn empty_candidate_list_returns_guidance_not_error() {
        let ads = FakeAds::default();
        let ctx = DiscoveryContext::from_args(&json!({ "customerId": "123-456-7890" }));

        let step = next_step(SPECS, &ctx, &ads).await.unwrap();
        match step {
            DiscoveryStep::NoCandidates { text, context, .. } => {
                assert!(text.contains("This account has no campaigns."));
                assert!(text.contains("use create_campaign"));
                assert_eq!(context["customerId"], "123-456-7890");
            }
            other => panic!("expected no-candidates guidance, got {:?}", other),
        }
        let queries = ads.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("FROM campaign"));
    }

    #[tokio::test]
    async fn input_params_do_not_query() {
        let ads = FakeAds::default();
        let ctx = DiscoveryContext::from_args(&json!({ "customerId": "1234567890", "campaignId": "5" }));

        let step = next_step(SPECS, &ctx, &ads).await.unwrap();
        assert!(matches!(step, DiscoveryStep::Input { param: "status", .. }));
        assert!(ads.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_when_all_present() {
        let ads = FakeAds::default();
        let ctx = DiscoveryContext::from_args(&json!({
            "customerId": "1234567890", "campaignId": "5", "status": "PAUSED"
        }));
        let step = next_step(SPECS, &ctx, &ads).await.unwrap();
        assert!(matches!(step, DiscoveryStep::Complete));
        assert!(step.into_response().is_none());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let ctx = DiscoveryContext::from_args(&json!({ "a": "  ", "b": [], "c": null, "d": 0 }));
        assert!(!ctx.is_present("a"));
        assert!(!ctx.is_present("b"));
        assert!(!ctx.is_present("c"));
        assert!(ctx.is_present("d"));
    }

    #[test]
    fn numbers_parse_from_strings() {
        let ctx = DiscoveryContext::from_args(&json!({ "x": "$2.50", "y": 3 }));
        assert_eq!(ctx.f64("x"), Some(2.5));
        assert_eq!(ctx.f64("y"), Some(3.0));
    }

    #[test]
    fn keyword_candidates_filter_by_ad_group() {
        let ctx = DiscoveryContext::from_args(&json!({ "adGroupId": "77" }));
        let q = candidate_query(ParamKind::Keyword, &ctx).unwrap();
        assert!(q.contains("ad_group.id = 77"));

        let bad = DiscoveryContext::from_args(&json!({ "adGroupId": "77 OR 1=1" }));
        assert!(candidate_query(ParamKind::Keyword, &bad).is_err());
    }
}
