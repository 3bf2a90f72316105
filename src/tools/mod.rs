// AdsFlow - Google Ads tools
//! Tool dispatch for the MCP endpoint.
//!
//! Read tools:
//! - `list_accessible_accounts`: accounts reachable with the caller's token
//! - `list_campaigns`: campaigns of one account with status and budget
//! - `list_budgets`: shared and campaign budgets with daily amounts
//! - `list_keywords`: keywords with match type and max CPC
//!
//! Write tools (guided workflow, preview + confirmation):
//! - `update_campaign_status`: ENABLED / PAUSED / REMOVED
//! - `update_budget`: new daily amount, with financial impact
//! - `create_budget`: new daily budget, not spending until a campaign uses it
//! - `create_campaign`: new campaign on an existing budget, PAUSED by default
//! - `set_keyword_bid`: keyword max CPC
//! - `add_keywords`: up to 50 keywords into one ad group
//! - `remove_keywords`: up to 50 keywords out of one ad group

pub mod accounts;
pub mod budgets;
pub mod campaigns;
pub mod keywords;

use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::credentials;
use crate::error::WorkflowError;
use crate::state::AppState;
use crate::workflow::{ParamKind, ParamSpec, ToolResponse, Workflow};

/// Most items a single write may create or change.
pub const MAX_BULK_ITEMS: usize = 50;

// ── Shared parameter declarations ───────────────────────────────────────────

pub(crate) const ACCOUNT_PARAM: ParamSpec = ParamSpec {
    name: "customerId",
    title: "SELECT GOOGLE ADS ACCOUNT",
    prompt: "Which account do you want to work in?",
    kind: ParamKind::Account,
    empty_guidance: "The refresh token has no accessible Google Ads accounts. \
                     Check that the signed-in Google user has been granted access to an account.",
    remedy_tool: None,
};

pub(crate) const CAMPAIGN_PARAM: ParamSpec = ParamSpec {
    name: "campaignId",
    title: "SELECT CAMPAIGN",
    prompt: "Which campaign?",
    kind: ParamKind::Campaign,
    empty_guidance: "This account has no campaigns.",
    remedy_tool: Some("create_campaign"),
};

pub(crate) const AD_GROUP_PARAM: ParamSpec = ParamSpec {
    name: "adGroupId",
    title: "SELECT AD GROUP",
    prompt: "Which ad group?",
    kind: ParamKind::AdGroup,
    empty_guidance: "No ad groups found in this account. Create an ad group in the Google Ads UI, then call again.",
    remedy_tool: None,
};

pub(crate) const KEYWORD_PARAM: ParamSpec = ParamSpec {
    name: "keywordResourceName",
    title: "SELECT KEYWORD",
    prompt: "Which keyword? Provide its resource name.",
    kind: ParamKind::Keyword,
    empty_guidance: "This ad group has no keywords.",
    remedy_tool: Some("add_keywords"),
};

pub(crate) const BUDGET_PARAM: ParamSpec = ParamSpec {
    name: "budgetId",
    title: "SELECT BUDGET",
    prompt: "Which budget do you want to change? Changes affect every campaign sharing it.",
    kind: ParamKind::Budget,
    empty_guidance: "This account has no enabled budgets.",
    remedy_tool: Some("create_budget"),
};

const TOOL_NAMES: &[&str] = &[
    "list_accessible_accounts",
    "list_campaigns",
    "list_budgets",
    "list_keywords",
    "update_campaign_status",
    "update_budget",
    "create_budget",
    "create_campaign",
    "set_keyword_bid",
    "add_keywords",
    "remove_keywords",
];

pub fn is_known_tool(name: &str) -> bool {
    TOOL_NAMES.contains(&name)
}

/// Execute a tool by name.
///
/// Credentials are resolved first; a missing refresh or developer token
/// fails the call before any Ads request is made.
pub async fn execute_tool(
    name: &str,
    args: &Value,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<ToolResponse, WorkflowError> {
    if !is_known_tool(name) {
        return Err(WorkflowError::validation(format!("Unknown tool: {}", name)));
    }

    let creds = credentials::resolve(headers, args, &state.config)?;
    let mut args = if args.is_object() { args.clone() } else { json!({}) };
    credentials::strip_credential_args(&mut args);

    let client = state.ads.connect(&creds)?;
    let ads = client.as_ref();
    let workflow = Workflow {
        registry: &state.registry,
        vagueness: &state.vagueness,
        ads,
    };

    match name {
        "list_accessible_accounts" => accounts::list_accessible_accounts(ads).await,
        "list_campaigns" => campaigns::list_campaigns(&args, ads).await,
        "list_budgets" => budgets::list_budgets(&args, ads).await,
        "list_keywords" => keywords::list_keywords(&args, ads).await,
        "update_campaign_status" => workflow.run(&campaigns::UpdateCampaignStatus, &args).await,
        "update_budget" => workflow.run(&budgets::UpdateBudget, &args).await,
        "create_budget" => workflow.run(&budgets::CreateBudget, &args).await,
        "create_campaign" => workflow.run(&campaigns::CreateCampaign, &args).await,
        "set_keyword_bid" => workflow.run(&keywords::SetKeywordBid, &args).await,
        "add_keywords" => workflow.run(&keywords::AddKeywords, &args).await,
        "remove_keywords" => workflow.run(&keywords::RemoveKeywords, &args).await,
        _ => Err(WorkflowError::validation(format!("Unknown tool: {}", name))),
    }
}

// ── MCP tool list ───────────────────────────────────────────────────────────

const WORKFLOW_NOTE: &str = " Call with whatever you know; missing parameters are discovered step by step. \
     The first complete call returns a preview and confirmationToken; call again with the token to execute.";

fn write_props(mut props: Value) -> Value {
    props["confirmationToken"] = json!({
        "type": "string",
        "description": "Token from the preview step. Omit to get a preview."
    });
    props["userRequest"] = json!({
        "type": "string",
        "description": "The user's request in their own words, checked for vagueness."
    });
    props
}

/// `tools/list` entries for every tool.
pub fn tool_definitions() -> Vec<Value> {
    let customer = json!({ "type": "string", "description": "Google Ads customer ID (10 digits, dashes allowed)" });
    vec![
        tool("list_accessible_accounts", "List Google Ads accounts accessible with the caller's credentials.", json!({
            "type": "object",
            "properties": {}
        })),
        tool("list_campaigns", "List campaigns in an account with status, channel and daily budget.", json!({
            "type": "object",
            "properties": { "customerId": customer }
        })),
        tool("list_budgets", "List enabled budgets in an account with daily amounts.", json!({
            "type": "object",
            "properties": { "customerId": customer }
        })),
        tool("list_keywords", "List keywords with match type and max CPC, optionally for one ad group.", json!({
            "type": "object",
            "properties": {
                "customerId": customer,
                "adGroupId": { "type": "string", "description": "Only keywords of this ad group" }
            }
        })),
        tool(
            "update_campaign_status",
            &format!("Enable, pause or remove a campaign.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "campaignId": { "type": "string", "description": "Campaign ID" },
                    "status": { "type": "string", "enum": ["ENABLED", "PAUSED", "REMOVED"] }
                }))
            }),
        ),
        tool(
            "update_budget",
            &format!("Change a budget's daily amount. Changes above 500% are rejected.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "budgetId": { "type": "string", "description": "Campaign budget ID" },
                    "newDailyAmountDollars": { "type": "number", "description": "New daily amount in dollars" }
                }))
            }),
        ),
        tool(
            "create_budget",
            &format!("Create a campaign budget. It spends nothing until a campaign uses it.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "name": { "type": "string", "description": "Budget name, unique in the account" },
                    "dailyAmountDollars": { "type": "number", "description": "Daily amount in dollars" }
                }))
            }),
        ),
        tool(
            "create_campaign",
            &format!("Create a campaign on an existing budget. New campaigns are PAUSED unless status is ENABLED.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "name": { "type": "string", "description": "Campaign name, unique in the account" },
                    "budgetId": { "type": "string", "description": "Campaign budget ID" },
                    "campaignType": {
                        "type": "string",
                        "enum": ["SEARCH", "DISPLAY", "SHOPPING", "VIDEO", "PERFORMANCE_MAX", "DEMAND_GEN"]
                    },
                    "status": { "type": "string", "enum": ["PAUSED", "ENABLED"], "default": "PAUSED" }
                }))
            }),
        ),
        tool(
            "set_keyword_bid",
            &format!("Set a keyword's max CPC bid.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "adGroupId": { "type": "string", "description": "Ad group ID" },
                    "keywordResourceName": {
                        "type": "string",
                        "description": "customers/{customerId}/adGroupCriteria/{adGroupId}~{criterionId}"
                    },
                    "maxCpcDollars": { "type": "number", "description": "New max CPC in dollars" }
                }))
            }),
        ),
        tool(
            "add_keywords",
            &format!("Add up to 50 keywords to an ad group.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "adGroupId": { "type": "string", "description": "Ad group ID" },
                    "keywords": {
                        "type": "array",
                        "maxItems": MAX_BULK_ITEMS,
                        "items": {
                            "type": "object",
                            "properties": {
                                "text": { "type": "string", "maxLength": keywords::MAX_KEYWORD_LEN },
                                "matchType": { "type": "string", "enum": ["EXACT", "PHRASE", "BROAD"] },
                                "maxCpcDollars": { "type": "number" },
                                "finalUrls": { "type": "array", "items": { "type": "string" } }
                            },
                            "required": ["text", "matchType"]
                        }
                    }
                }))
            }),
        ),
        tool(
            "remove_keywords",
            &format!("Remove up to 50 keywords from an ad group. Removal cannot be undone.{}", WORKFLOW_NOTE),
            json!({
                "type": "object",
                "properties": write_props(json!({
                    "customerId": customer,
                    "adGroupId": { "type": "string", "description": "Ad group ID" },
                    "criterionIds": {
                        "type": "array",
                        "maxItems": MAX_BULK_ITEMS,
                        "items": { "type": "string" },
                        "description": "Keyword criterion IDs from list_keywords"
                    }
                }))
            }),
        ),
    ]
}

fn tool(name: &str, description: &str, input_schema: Value) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": input_schema,
    })
}
