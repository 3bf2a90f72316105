// AdsFlow - keyword tools

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ads::gaql::{self, Query};
use crate::ads::{self, AdsClient, MutateResource};
use crate::error::WorkflowError;
use crate::workflow::response::format_success_summary;
use crate::workflow::{DiscoveryContext, DryRun, DryRunBuilder, ParamKind, ParamSpec, ProposedChange, ToolResponse, WriteOperation};

use super::accounts::{select_account, AccountSelection};
use super::{ACCOUNT_PARAM, AD_GROUP_PARAM, KEYWORD_PARAM, MAX_BULK_ITEMS};

/// Google Ads limit on keyword text length.
pub const MAX_KEYWORD_LEN: usize = 80;
/// Bids above this are flagged as high.
const HIGH_BID_DOLLARS: f64 = 10.0;
const LARGE_BID_CHANGE_RATIO: f64 = 0.5;
const LARGE_BATCH: usize = 20;

const KEYWORD_FIELDS: &[&str] = &[
    "ad_group_criterion.resource_name",
    "ad_group_criterion.criterion_id",
    "ad_group_criterion.keyword.text",
    "ad_group_criterion.keyword.match_type",
    "ad_group_criterion.cpc_bid_micros",
    "ad_group_criterion.status",
    "ad_group.id",
    "ad_group.name",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "EXACT",
            MatchType::Phrase => "PHRASE",
            MatchType::Broad => "BROAD",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXACT" => Ok(MatchType::Exact),
            "PHRASE" => Ok(MatchType::Phrase),
            "BROAD" => Ok(MatchType::Broad),
            other => Err(WorkflowError::validation(format!(
                "matchType must be EXACT, PHRASE or BROAD (got '{}')",
                other
            ))),
        }
    }
}

// ── list_keywords ───────────────────────────────────────────────────────────

pub async fn list_keywords(args: &Value, ads: &dyn AdsClient) -> Result<ToolResponse, WorkflowError> {
    let customer_id = match select_account(args, ads).await? {
        AccountSelection::Selected(id) => id,
        AccountSelection::Discovery(resp) => return Ok(resp),
    };

    let mut query = Query::select(KEYWORD_FIELDS)
        .from("keyword_view")
        .filter("ad_group_criterion.status != 'REMOVED'");
    let ad_group = DiscoveryContext::from_args(args).str("adGroupId").map(String::from);
    if let Some(id) = &ad_group {
        query = query.where_id("ad_group.id", id)?;
    }
    let rows = ads.search(&customer_id, &query.limit(500).build()).await?;

    let keywords: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "resourceName": ads::str_at(row, "/adGroupCriterion/resourceName"),
                "criterionId": ads::str_at(row, "/adGroupCriterion/criterionId"),
                "text": ads::str_at(row, "/adGroupCriterion/keyword/text"),
                "matchType": ads::str_at(row, "/adGroupCriterion/keyword/matchType"),
                "maxCpcDollars": ads::i64_at(row, "/adGroupCriterion/cpcBidMicros").map(ads::micros_to_amount),
                "status": ads::str_at(row, "/adGroupCriterion/status"),
                "adGroupId": ads::str_at(row, "/adGroup/id"),
                "adGroupName": ads::str_at(row, "/adGroup/name"),
            })
        })
        .collect();

    let scope = ad_group
        .map(|id| format!("AD GROUP {}", id))
        .unwrap_or_else(|| format!("ACCOUNT {}", customer_id));
    let mut text = format!("KEYWORDS IN {} ({})\n\n", scope, keywords.len());
    for (i, k) in keywords.iter().enumerate() {
        let bid = k["maxCpcDollars"]
            .as_f64()
            .map(ads::format_dollars)
            .unwrap_or_else(|| "Not set".into());
        text.push_str(&format!(
            "{}. \"{}\" [{}] max CPC {}\n   {} | ad group: {}\n",
            i + 1,
            k["text"].as_str().unwrap_or(""),
            k["matchType"].as_str().unwrap_or("?"),
            bid,
            k["resourceName"].as_str().unwrap_or("?"),
            k["adGroupName"].as_str().unwrap_or("?")
        ));
    }

    Ok(ToolResponse::completed(
        text,
        json!({ "customerId": customer_id, "keywords": keywords, "count": keywords.len() }),
    ))
}

// ── set_keyword_bid ─────────────────────────────────────────────────────────

const BID_PARAM: ParamSpec = ParamSpec {
    name: "maxCpcDollars",
    title: "SPECIFY NEW MAX CPC",
    prompt: "Provide maxCpcDollars as a number (e.g. 2.5 for $2.50 per click).\n\
             Changes above 50% shift traffic and spend noticeably; prefer 10-20% steps.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const BID_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, AD_GROUP_PARAM, KEYWORD_PARAM, BID_PARAM];

pub struct SetKeywordBid;

#[derive(Debug, Clone)]
pub struct BidRequest {
    pub customer_id: String,
    pub ad_group_id: String,
    pub criterion_id: String,
    pub resource_name: String,
    pub max_cpc: f64,
}

/// Split `customers/{cid}/adGroupCriteria/{agid}~{crit}` and check it belongs
/// to the given account and ad group.
pub fn parse_criterion_resource(
    resource_name: &str,
    customer_id: &str,
    ad_group_id: &str,
) -> Result<String, WorkflowError> {
    let invalid = || {
        WorkflowError::validation(format!(
            "keywordResourceName must look like customers/{}/adGroupCriteria/{}~<criterionId>, got '{}'",
            customer_id, ad_group_id, resource_name
        ))
    };

    let rest = resource_name
        .trim()
        .strip_prefix("customers/")
        .ok_or_else(invalid)?;
    let (cid, rest) = rest.split_once("/adGroupCriteria/").ok_or_else(invalid)?;
    let (agid, criterion) = rest.split_once('~').ok_or_else(invalid)?;

    if cid != customer_id || agid != ad_group_id {
        return Err(invalid());
    }
    Ok(gaql::numeric_id("criterionId", criterion)?.to_string())
}

#[async_trait]
impl WriteOperation for SetKeywordBid {
    type Request = BidRequest;

    fn name(&self) -> &'static str {
        "set_keyword_bid"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        BID_PARAMS
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<BidRequest, WorkflowError> {
        let customer_id = ctx.customer_id()?;
        let ad_group_id = gaql::numeric_id("adGroupId", ctx.str("adGroupId").unwrap_or_default())?.to_string();
        let resource_name = ctx.str("keywordResourceName").unwrap_or_default().to_string();
        let criterion_id = parse_criterion_resource(&resource_name, &customer_id, &ad_group_id)?;
        let bid = ctx
            .f64("maxCpcDollars")
            .ok_or_else(|| WorkflowError::validation("maxCpcDollars must be a number"))?;

        Ok(BidRequest {
            customer_id,
            ad_group_id,
            criterion_id,
            resource_name,
            max_cpc: ads::positive_amount("maxCpcDollars", bid)?,
        })
    }

    fn describe(&self, req: &BidRequest) -> String {
        format!(
            "set bid for keyword {} in ad group {} to {}",
            req.criterion_id,
            req.ad_group_id,
            ads::format_dollars(req.max_cpc)
        )
    }

    async fn build_dry_run(&self, req: &BidRequest, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let query = Query::select(KEYWORD_FIELDS)
            .from("keyword_view")
            .where_str("ad_group_criterion.resource_name", &req.resource_name)
            .build();
        let rows = ads.search(&req.customer_id, &query).await?;
        let row = rows.first().ok_or_else(|| {
            WorkflowError::validation(format!(
                "Keyword {} not found. Use list_keywords to find valid resource names.",
                req.resource_name
            ))
        })?;

        let text = ads::str_at(row, "/adGroupCriterion/keyword/text").unwrap_or_default();
        let match_type = ads::str_at(row, "/adGroupCriterion/keyword/matchType").unwrap_or_default();
        let current = ads::i64_at(row, "/adGroupCriterion/cpcBidMicros").map(ads::micros_to_amount);
        let current_label = current
            .map(|c| format!("{}/click", ads::format_dollars(c)))
            .unwrap_or_else(|| "not set (ad group default)".to_string());

        let mut builder = DryRunBuilder::new("Set keyword max CPC bid", "Google Ads", &req.customer_id).change(
            ProposedChange::update(
                "Keyword Bid",
                &req.resource_name,
                "cpc_bid_micros",
                json!(format!("\"{}\" [{}] - {}", text, match_type, current_label)),
                json!(format!("{}/click", ads::format_dollars(req.max_cpc))),
            ),
        );

        if let Some(current) = current {
            let change = req.max_cpc - current;
            if change.abs() > current * LARGE_BID_CHANGE_RATIO {
                let pct = if current > 0.0 { change / current * 100.0 } else { 100.0 };
                builder = builder
                    .risk(format!(
                        "Large bid change ({:+.1}%) may cause significant traffic/spend changes",
                        pct
                    ))
                    .recommendation("Consider smaller incremental changes (10-20%) and monitor results");
            }
            builder = if change > 0.0 {
                builder.recommendation("Monitor impression share and position after the bid increase")
            } else {
                builder.recommendation("Monitor impression share; it may decrease after the bid reduction")
            };
        }

        if req.max_cpc > HIGH_BID_DOLLARS {
            builder = builder.risk(format!(
                "High CPC bid ({}) may increase spend rapidly",
                ads::format_dollars(req.max_cpc)
            ));
        }

        Ok(builder.build())
    }

    async fn execute(&self, req: &BidRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let operation = json!({
            "updateMask": "cpcBidMicros",
            "update": {
                "resourceName": req.resource_name,
                "cpcBidMicros": ads::amount_to_micros(req.max_cpc),
            }
        });
        Ok(ads
            .mutate(&req.customer_id, MutateResource::AdGroupCriteria, vec![operation])
            .await?)
    }

    fn summarize(&self, req: &BidRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let previous = dry_run
            .changes
            .first()
            .and_then(|c| c.current_value.as_ref())
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let text = format_success_summary(
            "KEYWORD BID UPDATED",
            &dry_run.operation,
            &[
                ("Keyword", req.resource_name.clone()),
                ("Previous", previous),
                ("New Max CPC", format!("{}/click", ads::format_dollars(req.max_cpc))),
            ],
            audit_id,
            &[],
            &["Use list_keywords to verify the new bid", "Check impression share after 2-3 days"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "adGroupId": req.ad_group_id,
                "criterionId": req.criterion_id,
                "maxCpcDollars": req.max_cpc,
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}

// ── add_keywords ────────────────────────────────────────────────────────────

const KEYWORDS_PARAM: ParamSpec = ParamSpec {
    name: "keywords",
    title: "SPECIFY KEYWORDS TO ADD",
    prompt: "Provide keywords as an array of objects (at most 50):\n\
             [{ \"text\": \"running shoes\", \"matchType\": \"PHRASE\" },\n \
             { \"text\": \"buy running shoes\", \"matchType\": \"EXACT\", \"maxCpcDollars\": 1.5 }]\n\
             matchType: EXACT (most precise), PHRASE (balanced), BROAD (widest reach, needs monitoring).\n\
             Optional per keyword: maxCpcDollars, finalUrls (http/https).",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const ADD_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, AD_GROUP_PARAM, KEYWORDS_PARAM];

pub struct AddKeywords;

#[derive(Debug, Clone, PartialEq)]
pub struct NewKeyword {
    pub text: String,
    pub match_type: MatchType,
    pub max_cpc: Option<f64>,
    pub final_urls: Vec<String>,
}

impl NewKeyword {
    fn label(&self) -> String {
        let mut s = format!("\"{}\" [{}]", self.text, self.match_type);
        if let Some(bid) = self.max_cpc {
            s.push_str(&format!(" @ {}/click", ads::format_dollars(bid)));
        }
        if let Some(url) = self.final_urls.first() {
            s.push_str(&format!(" → {}", url));
        }
        s
    }
}

#[derive(Debug, Clone)]
pub struct AddKeywordsRequest {
    pub customer_id: String,
    pub ad_group_id: String,
    pub keywords: Vec<NewKeyword>,
}

fn parse_final_url(field: &str, raw: &Value) -> Result<String, WorkflowError> {
    let s = raw
        .as_str()
        .ok_or_else(|| WorkflowError::validation(format!("{} must be a string URL", field)))?;
    let parsed = url::Url::parse(s.trim())
        .map_err(|e| WorkflowError::validation(format!("{} is not a valid URL ({}): {}", field, e, s)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WorkflowError::validation(format!("{} must use http or https: {}", field, s)));
    }
    Ok(parsed.to_string())
}

fn parse_keyword(index: usize, raw: &Value) -> Result<NewKeyword, WorkflowError> {
    let field = |name: &str| format!("keywords[{}].{}", index, name);

    let obj = raw
        .as_object()
        .ok_or_else(|| WorkflowError::validation(format!("keywords[{}] must be an object", index)))?;

    let text = obj
        .get("text")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| WorkflowError::validation(format!("{} is required", field("text"))))?;
    if text.chars().count() > MAX_KEYWORD_LEN {
        return Err(WorkflowError::validation(format!(
            "{} exceeds {} characters",
            field("text"),
            MAX_KEYWORD_LEN
        )));
    }

    let match_type = obj
        .get("matchType")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WorkflowError::validation(format!("{} is required", field("matchType"))))?
        .parse::<MatchType>()?;

    let max_cpc = match obj.get("maxCpcDollars") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let bid = v
                .as_f64()
                .ok_or_else(|| WorkflowError::validation(format!("{} must be a number", field("maxCpcDollars"))))?;
            Some(ads::positive_amount(&field("maxCpcDollars"), bid)?)
        }
    };

    let final_urls = match obj.get("finalUrls") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(urls)) => urls
            .iter()
            .enumerate()
            .map(|(j, u)| parse_final_url(&format!("{}[{}]", field("finalUrls"), j), u))
            .collect::<Result<Vec<_>, WorkflowError>>()?,
        Some(_) => {
            return Err(WorkflowError::validation(format!("{} must be an array", field("finalUrls"))));
        }
    };

    Ok(NewKeyword {
        text: text.to_string(),
        match_type,
        max_cpc,
        final_urls,
    })
}

#[async_trait]
impl WriteOperation for AddKeywords {
    type Request = AddKeywordsRequest;

    fn name(&self) -> &'static str {
        "add_keywords"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        ADD_PARAMS
    }

    fn preflight(&self, ctx: &DiscoveryContext) -> Result<(), WorkflowError> {
        if let Some(Value::Array(keywords)) = ctx.get("keywords") {
            if keywords.len() > MAX_BULK_ITEMS {
                tracing::warn!(count = keywords.len(), "add_keywords: bulk limit exceeded");
                return Err(WorkflowError::validation(format!(
                    "Cannot add {} keywords in one operation. Maximum is {}. Please batch into smaller operations.",
                    keywords.len(),
                    MAX_BULK_ITEMS
                )));
            }
        }
        Ok(())
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<AddKeywordsRequest, WorkflowError> {
        let customer_id = ctx.customer_id()?;
        let ad_group_id = gaql::numeric_id("adGroupId", ctx.str("adGroupId").unwrap_or_default())?.to_string();
        let raw = ctx
            .get("keywords")
            .and_then(|v| v.as_array())
            .ok_or_else(|| WorkflowError::validation("keywords must be an array of {text, matchType} objects"))?;

        let keywords = raw
            .iter()
            .enumerate()
            .map(|(i, k)| parse_keyword(i, k))
            .collect::<Result<Vec<_>, WorkflowError>>()?;

        Ok(AddKeywordsRequest {
            customer_id,
            ad_group_id,
            keywords,
        })
    }

    fn describe(&self, req: &AddKeywordsRequest) -> String {
        format!("add {} keywords to ad group {}", req.keywords.len(), req.ad_group_id)
    }

    async fn build_dry_run(&self, req: &AddKeywordsRequest, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let query = Query::select(&["ad_group.id", "ad_group.name", "ad_group.status"])
            .from("ad_group")
            .where_id("ad_group.id", &req.ad_group_id)?
            .build();
        let rows = ads.search(&req.customer_id, &query).await?;
        let row = rows.first().ok_or_else(|| {
            WorkflowError::validation(format!(
                "Ad group {} not found in account {}.",
                req.ad_group_id, req.customer_id
            ))
        })?;
        let name = ads::str_at(row, "/adGroup/name").unwrap_or_else(|| req.ad_group_id.clone());

        let mut builder = DryRunBuilder::new(
            &format!("Add {} keywords to ad group \"{}\"", req.keywords.len(), name),
            "Google Ads",
            &req.customer_id,
        );
        for (i, kw) in req.keywords.iter().enumerate() {
            builder = builder.change(ProposedChange::create(
                "Keyword",
                &format!("new_{}", i + 1),
                "keyword",
                json!(kw.label()),
            ));
        }

        let broad = req.keywords.iter().filter(|k| k.match_type == MatchType::Broad).count();
        if broad > 0 {
            builder = builder.risk(format!(
                "{} BROAD match keyword(s) can match loosely related searches and raise spend",
                broad
            ));
        }
        if req.keywords.len() > LARGE_BATCH {
            builder = builder.risk(format!(
                "Large batch ({} keywords) may be hard to monitor; consider smaller groups",
                req.keywords.len()
            ));
        }
        if req.keywords.iter().any(|k| k.max_cpc.is_some_and(|b| b > HIGH_BID_DOLLARS)) {
            builder = builder.risk(format!(
                "Some keyword bids exceed {} per click",
                ads::format_dollars(HIGH_BID_DOLLARS)
            ));
        }

        Ok(builder
            .recommendation("New keywords start ENABLED; review the search terms report during the first week")
            .build())
    }

    async fn execute(&self, req: &AddKeywordsRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let ad_group = format!("customers/{}/adGroups/{}", req.customer_id, req.ad_group_id);
        let operations: Vec<Value> = req
            .keywords
            .iter()
            .map(|kw| {
                let mut create = json!({
                    "adGroup": ad_group,
                    "status": "ENABLED",
                    "keyword": { "text": kw.text, "matchType": kw.match_type.as_str() },
                });
                if let Some(bid) = kw.max_cpc {
                    create["cpcBidMicros"] = json!(ads::amount_to_micros(bid));
                }
                if !kw.final_urls.is_empty() {
                    create["finalUrls"] = json!(kw.final_urls);
                }
                json!({ "create": create })
            })
            .collect();

        Ok(ads
            .mutate(&req.customer_id, MutateResource::AdGroupCriteria, operations)
            .await?)
    }

    fn summarize(&self, req: &AddKeywordsRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let created: Vec<String> = result
            .get("results")
            .and_then(|r| r.as_array())
            .map(|rs| {
                rs.iter()
                    .filter_map(|r| r.get("resourceName").and_then(|n| n.as_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let keyword_list = req
            .keywords
            .iter()
            .map(NewKeyword::label)
            .collect::<Vec<_>>()
            .join(", ");

        let text = format_success_summary(
            "KEYWORDS ADDED",
            &dry_run.operation,
            &[
                ("Ad Group ID", req.ad_group_id.clone()),
                ("Keywords Added", req.keywords.len().to_string()),
                ("Keywords", keyword_list),
            ],
            audit_id,
            &dry_run.risks,
            &["Use list_keywords to review the new keywords", "Use set_keyword_bid to tune individual bids"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "adGroupId": req.ad_group_id,
                "keywordsAdded": req.keywords.len(),
                "resourceNames": created,
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}

// ── remove_keywords ─────────────────────────────────────────────────────────

/// Historical spend above this is called out before removal.
const SPENT_WARNING_DOLLARS: f64 = 100.0;

const REMOVE_FIELDS: &[&str] = &[
    "ad_group_criterion.resource_name",
    "ad_group_criterion.criterion_id",
    "ad_group_criterion.keyword.text",
    "ad_group_criterion.keyword.match_type",
    "ad_group_criterion.status",
    "ad_group.id",
    "ad_group.name",
    "metrics.cost_micros",
    "metrics.conversions",
];

const CRITERION_IDS_PARAM: ParamSpec = ParamSpec {
    name: "criterionIds",
    title: "SPECIFY KEYWORDS TO REMOVE",
    prompt: "Provide criterionIds as an array of keyword criterion IDs (at most 50), e.g. [\"222\", \"333\"].\n\
             Use list_keywords with this adGroupId to see them.\n\
             Removal cannot be undone; pausing is the reversible alternative.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const REMOVE_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, AD_GROUP_PARAM, CRITERION_IDS_PARAM];

pub struct RemoveKeywords;

#[derive(Debug, Clone)]
pub struct RemoveKeywordsRequest {
    pub customer_id: String,
    pub ad_group_id: String,
    pub criterion_ids: Vec<String>,
}

impl RemoveKeywordsRequest {
    fn resource_name(&self, criterion_id: &str) -> String {
        format!(
            "customers/{}/adGroupCriteria/{}~{}",
            self.customer_id, self.ad_group_id, criterion_id
        )
    }
}

/// IDs may arrive as strings or numbers; duplicates are dropped, order kept.
fn parse_criterion_ids(raw: &[Value]) -> Result<Vec<String>, WorkflowError> {
    let mut ids: Vec<String> = Vec::with_capacity(raw.len());
    for (i, v) in raw.iter().enumerate() {
        let field = format!("criterionIds[{}]", i);
        let id = match v {
            Value::String(s) => gaql::numeric_id(&field, s)?.to_string(),
            Value::Number(n) if n.is_u64() => n.to_string(),
            _ => return Err(WorkflowError::validation(format!("{} must be a numeric ID", field))),
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn status_label(status: &str) -> &str {
    match status {
        "ENABLED" => "Active",
        "PAUSED" => "Paused",
        other => other,
    }
}

#[async_trait]
impl WriteOperation for RemoveKeywords {
    type Request = RemoveKeywordsRequest;

    fn name(&self) -> &'static str {
        "remove_keywords"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        REMOVE_PARAMS
    }

    fn preflight(&self, ctx: &DiscoveryContext) -> Result<(), WorkflowError> {
        if let Some(Value::Array(ids)) = ctx.get("criterionIds") {
            if ids.len() > MAX_BULK_ITEMS {
                tracing::warn!(count = ids.len(), "remove_keywords: bulk limit exceeded");
                return Err(WorkflowError::validation(format!(
                    "Cannot remove {} keywords in one operation. Maximum is {}. Please batch into smaller operations.",
                    ids.len(),
                    MAX_BULK_ITEMS
                )));
            }
        }
        Ok(())
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<RemoveKeywordsRequest, WorkflowError> {
        let customer_id = ctx.customer_id()?;
        let ad_group_id = gaql::numeric_id("adGroupId", ctx.str("adGroupId").unwrap_or_default())?.to_string();
        let raw = ctx
            .get("criterionIds")
            .and_then(|v| v.as_array())
            .ok_or_else(|| WorkflowError::validation("criterionIds must be an array of criterion IDs"))?;

        Ok(RemoveKeywordsRequest {
            customer_id,
            ad_group_id,
            criterion_ids: parse_criterion_ids(raw)?,
        })
    }

    fn describe(&self, req: &RemoveKeywordsRequest) -> String {
        format!(
            "remove {} keywords ({}) from ad group {}",
            req.criterion_ids.len(),
            req.criterion_ids.join(", "),
            req.ad_group_id
        )
    }

    async fn build_dry_run(&self, req: &RemoveKeywordsRequest, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let query = Query::select(REMOVE_FIELDS)
            .from("keyword_view")
            .filter("ad_group_criterion.status != 'REMOVED'")
            .where_id("ad_group.id", &req.ad_group_id)?
            .where_ids_in("ad_group_criterion.criterion_id", &req.criterion_ids)?
            .build();
        let rows = ads.search(&req.customer_id, &query).await?;

        let found: Vec<&Value> = req
            .criterion_ids
            .iter()
            .filter_map(|id| {
                rows.iter()
                    .find(|row| ads::str_at(row, "/adGroupCriterion/criterionId").as_deref() == Some(id.as_str()))
            })
            .collect();
        let missing: Vec<&str> = req
            .criterion_ids
            .iter()
            .filter(|id| {
                !rows
                    .iter()
                    .any(|row| ads::str_at(row, "/adGroupCriterion/criterionId").as_deref() == Some(id.as_str()))
            })
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::validation(format!(
                "Keyword(s) {} not found in ad group {}. Use list_keywords to find valid criterion IDs.",
                missing.join(", "),
                req.ad_group_id
            )));
        }

        let ad_group_name = found
            .first()
            .and_then(|row| ads::str_at(row, "/adGroup/name"))
            .unwrap_or_else(|| req.ad_group_id.clone());
        let mut builder = DryRunBuilder::new(
            &format!("Remove {} keywords from ad group \"{}\"", found.len(), ad_group_name),
            "Google Ads",
            &req.customer_id,
        );

        let mut total_cost = 0.0;
        let mut has_conversions = false;
        for row in &found {
            let id = ads::str_at(row, "/adGroupCriterion/criterionId").unwrap_or_default();
            let text = ads::str_at(row, "/adGroupCriterion/keyword/text").unwrap_or_default();
            let match_type = ads::str_at(row, "/adGroupCriterion/keyword/matchType").unwrap_or_default();
            let status = ads::str_at(row, "/adGroupCriterion/status").unwrap_or_default();
            total_cost += ads::micros_to_amount(ads::i64_at(row, "/metrics/costMicros").unwrap_or(0));
            has_conversions |= row
                .pointer("/metrics/conversions")
                .and_then(Value::as_f64)
                .is_some_and(|c| c > 0.0);

            builder = builder.change(ProposedChange::delete(
                "Keyword",
                &id,
                "status",
                json!(format!("\"{}\" [{}] - {}", text, match_type, status_label(&status))),
                json!("REMOVED (deleted)"),
            ));
        }

        builder = builder.risk(format!(
            "Removing {} keyword(s) is DESTRUCTIVE and cannot be easily undone",
            found.len()
        ));
        if total_cost > SPENT_WARNING_DOLLARS {
            builder = builder.risk(format!(
                "These keywords have spent {} historically - verify you want to remove them",
                ads::format_dollars(total_cost)
            ));
        }
        if has_conversions {
            builder = builder.risk("Some keywords have generated conversions - removing may impact performance");
        }

        Ok(builder
            .recommendation("Consider pausing keywords instead of removing if you want to test disabling them first")
            .build())
    }

    async fn execute(&self, req: &RemoveKeywordsRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let operations: Vec<Value> = req
            .criterion_ids
            .iter()
            .map(|id| json!({ "remove": req.resource_name(id) }))
            .collect();
        Ok(ads
            .mutate(&req.customer_id, MutateResource::AdGroupCriteria, operations)
            .await?)
    }

    fn summarize(&self, req: &RemoveKeywordsRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let removed: Vec<String> = dry_run
            .changes
            .iter()
            .filter_map(|c| c.current_value.as_ref().and_then(|v| v.as_str()).map(String::from))
            .collect();

        let text = format_success_summary(
            "KEYWORDS REMOVED",
            &dry_run.operation,
            &[
                ("Ad Group ID", req.ad_group_id.clone()),
                ("Keywords Removed", req.criterion_ids.len().to_string()),
                ("Keywords", removed.join(", ")),
            ],
            audit_id,
            &["Removed keywords stop serving immediately and cannot be re-enabled".to_string()],
            &["Use list_keywords to confirm the remaining keywords", "Use add_keywords to re-create a keyword if needed"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "adGroupId": req.ad_group_id,
                "criterionIds": req.criterion_ids,
                "keywordsRemoved": req.criterion_ids.len(),
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}
