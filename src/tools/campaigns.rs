// AdsFlow - campaign tools

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ads::gaql::{self, Query};
use crate::ads::{self, AdsClient, MutateResource};
use crate::error::WorkflowError;
use crate::workflow::response::format_success_summary;
use crate::workflow::{
    DiscoveryContext, DryRun, DryRunBuilder, FinancialImpact, ParamKind, ParamSpec, ProposedChange, ToolResponse,
    WriteOperation,
};

use super::accounts::{select_account, AccountSelection};
use super::budgets::created_resource_name;
use super::{ACCOUNT_PARAM, CAMPAIGN_PARAM};

// ── list_campaigns ──────────────────────────────────────────────────────────

pub async fn list_campaigns(args: &Value, ads: &dyn AdsClient) -> Result<ToolResponse, WorkflowError> {
    let customer_id = match select_account(args, ads).await? {
        AccountSelection::Selected(id) => id,
        AccountSelection::Discovery(resp) => return Ok(resp),
    };

    let query = Query::select(&[
        "campaign.id",
        "campaign.name",
        "campaign.status",
        "campaign.advertising_channel_type",
        "campaign_budget.amount_micros",
    ])
    .from("campaign")
    .filter("campaign.status != 'REMOVED'")
    .order_by("campaign.name")
    .build();
    let rows = ads.search(&customer_id, &query).await?;

    let campaigns: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": ads::str_at(row, "/campaign/id"),
                "name": ads::str_at(row, "/campaign/name"),
                "status": ads::str_at(row, "/campaign/status"),
                "channel": ads::str_at(row, "/campaign/advertisingChannelType"),
                "dailyBudgetDollars": ads::i64_at(row, "/campaignBudget/amountMicros").map(ads::micros_to_amount),
            })
        })
        .collect();

    let mut text = format!("CAMPAIGNS IN {} ({})\n\n", customer_id, campaigns.len());
    if campaigns.is_empty() {
        text.push_str("No active or paused campaigns.\n");
    }
    for (i, c) in campaigns.iter().enumerate() {
        let budget = c["dailyBudgetDollars"]
            .as_f64()
            .map(|d| format!("{}/day", ads::format_dollars(d)))
            .unwrap_or_else(|| "N/A".into());
        text.push_str(&format!(
            "{}. {} (ID: {})\n   Status: {} | Channel: {} | Budget: {}\n",
            i + 1,
            c["name"].as_str().unwrap_or("Unnamed campaign"),
            c["id"].as_str().unwrap_or("?"),
            c["status"].as_str().unwrap_or("UNKNOWN"),
            c["channel"].as_str().unwrap_or("N/A"),
            budget
        ));
    }

    Ok(ToolResponse::completed(
        text,
        json!({ "customerId": customer_id, "campaigns": campaigns, "count": campaigns.len() }),
    ))
}

// ── update_campaign_status ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Enabled,
    Paused,
    Removed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Enabled => "ENABLED",
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENABLED" => Ok(CampaignStatus::Enabled),
            "PAUSED" => Ok(CampaignStatus::Paused),
            "REMOVED" => Ok(CampaignStatus::Removed),
            other => Err(WorkflowError::validation(format!(
                "status must be one of ENABLED, PAUSED, REMOVED (got '{}')",
                other
            ))),
        }
    }
}

const STATUS_PARAM: ParamSpec = ParamSpec {
    name: "status",
    title: "SELECT NEW STATUS",
    prompt: "Available statuses:\n\
             1. ENABLED - start ad delivery; the campaign starts spending its budget immediately\n\
             2. PAUSED - stop ad delivery; no traffic or spend until re-enabled\n\
             3. REMOVED - soft-delete; all delivery stops (consider pausing instead)",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const STATUS_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, CAMPAIGN_PARAM, STATUS_PARAM];

pub struct UpdateCampaignStatus;

#[derive(Debug, Clone)]
pub struct StatusRequest {
    pub customer_id: String,
    pub campaign_id: String,
    pub status: CampaignStatus,
}

#[async_trait]
impl WriteOperation for UpdateCampaignStatus {
    type Request = StatusRequest;

    fn name(&self) -> &'static str {
        "update_campaign_status"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        STATUS_PARAMS
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<StatusRequest, WorkflowError> {
        let campaign_id = ctx.str("campaignId").unwrap_or_default();
        Ok(StatusRequest {
            customer_id: ctx.customer_id()?,
            campaign_id: gaql::numeric_id("campaignId", campaign_id)?.to_string(),
            status: ctx.str("status").unwrap_or_default().parse()?,
        })
    }

    fn describe(&self, req: &StatusRequest) -> String {
        format!("update campaign {} to {}", req.campaign_id, req.status)
    }

    async fn build_dry_run(&self, req: &StatusRequest, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let query = Query::select(&["campaign.id", "campaign.name", "campaign.status"])
            .from("campaign")
            .where_id("campaign.id", &req.campaign_id)?
            .build();
        let rows = ads.search(&req.customer_id, &query).await?;
        let row = rows.first().ok_or_else(|| {
            WorkflowError::validation(format!(
                "Campaign {} not found in account {}. Use list_campaigns to find valid IDs.",
                req.campaign_id, req.customer_id
            ))
        })?;
        let current = ads::str_at(row, "/campaign/status").unwrap_or_else(|| "UNKNOWN".into());
        let name = ads::str_at(row, "/campaign/name").unwrap_or_else(|| req.campaign_id.clone());

        let mut builder = DryRunBuilder::new(&format!("Update status of campaign \"{}\"", name), "Google Ads", &req.customer_id)
            .change(ProposedChange::update(
                "Campaign",
                &req.campaign_id,
                "status",
                json!(current),
                json!(req.status.as_str()),
            ));

        if current == req.status.as_str() {
            builder = builder.risk(format!("Campaign is already {}; this change has no effect", current));
        }

        builder = match req.status {
            CampaignStatus::Enabled => {
                let b = builder.risk("Campaign will start spending budget immediately once enabled");
                if current == "PAUSED" {
                    b.recommendation("Verify budget and ads are configured correctly before enabling")
                } else {
                    b
                }
            }
            CampaignStatus::Paused => builder
                .risk("All ad delivery will stop immediately - no traffic or conversions")
                .recommendation("Check if this is the only active campaign to avoid complete traffic loss"),
            CampaignStatus::Removed => builder
                .risk("Campaign will be soft-deleted and all delivery stops")
                .recommendation("Consider pausing instead of removing for temporary deactivation"),
        };

        Ok(builder.build())
    }

    async fn execute(&self, req: &StatusRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let operation = json!({
            "updateMask": "status",
            "update": {
                "resourceName": format!("customers/{}/campaigns/{}", req.customer_id, req.campaign_id),
                "status": req.status.as_str(),
            }
        });
        Ok(ads.mutate(&req.customer_id, MutateResource::Campaigns, vec![operation]).await?)
    }

    fn summarize(&self, req: &StatusRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let previous = dry_run
            .changes
            .first()
            .and_then(|c| c.current_value.as_ref())
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN")
            .to_string();

        let impact = match req.status {
            CampaignStatus::Enabled => "Ad delivery started",
            CampaignStatus::Paused => "Ad delivery stopped",
            CampaignStatus::Removed => "Campaign soft-deleted",
        };
        let text = format_success_summary(
            "CAMPAIGN STATUS UPDATED",
            &dry_run.operation,
            &[
                ("Campaign ID", req.campaign_id.clone()),
                ("Previous Status", previous.clone()),
                ("New Status", req.status.to_string()),
                ("Impact", impact.to_string()),
            ],
            audit_id,
            &[],
            &["Use list_campaigns to verify the new status"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "campaignId": req.campaign_id,
                "previousStatus": previous,
                "newStatus": req.status.as_str(),
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}

// ── create_campaign ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Search,
    Display,
    Shopping,
    Video,
    PerformanceMax,
    DemandGen,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Search => "SEARCH",
            ChannelType::Display => "DISPLAY",
            ChannelType::Shopping => "SHOPPING",
            ChannelType::Video => "VIDEO",
            ChannelType::PerformanceMax => "PERFORMANCE_MAX",
            ChannelType::DemandGen => "DEMAND_GEN",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SEARCH" => Ok(ChannelType::Search),
            "DISPLAY" => Ok(ChannelType::Display),
            "SHOPPING" => Ok(ChannelType::Shopping),
            "VIDEO" => Ok(ChannelType::Video),
            "PERFORMANCE_MAX" => Ok(ChannelType::PerformanceMax),
            "DEMAND_GEN" => Ok(ChannelType::DemandGen),
            other => Err(WorkflowError::validation(format!(
                "campaignType must be one of SEARCH, DISPLAY, SHOPPING, VIDEO, PERFORMANCE_MAX, DEMAND_GEN (got '{}')",
                other
            ))),
        }
    }
}

const MAX_CAMPAIGN_NAME_LEN: usize = 255;

const CAMPAIGN_NAME_PARAM: ParamSpec = ParamSpec {
    name: "name",
    title: "NAME THE NEW CAMPAIGN",
    prompt: "Provide a campaign name (e.g. \"Search - Brand - US\"). Names must be unique in the account.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const CAMPAIGN_BUDGET_PARAM: ParamSpec = ParamSpec {
    name: "budgetId",
    title: "SELECT BUDGET FOR THE NEW CAMPAIGN",
    prompt: "Which budget should the campaign spend from?",
    kind: ParamKind::Budget,
    empty_guidance: "This account has no enabled budgets. A campaign needs one before it can be created.",
    remedy_tool: Some("create_budget"),
};

const CHANNEL_PARAM: ParamSpec = ParamSpec {
    name: "campaignType",
    title: "SELECT CAMPAIGN TYPE",
    prompt: "Available types:\n\
             1. SEARCH - text ads on Google search results\n\
             2. DISPLAY - image ads across the Display Network\n\
             3. SHOPPING - product ads (needs a linked Merchant Center feed)\n\
             4. VIDEO - YouTube video ads\n\
             5. PERFORMANCE_MAX - all channels from one asset group\n\
             6. DEMAND_GEN - visual ads on YouTube, Discover and Gmail\n\
             Optional: status PAUSED (default) or ENABLED.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const CREATE_CAMPAIGN_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, CAMPAIGN_NAME_PARAM, CAMPAIGN_BUDGET_PARAM, CHANNEL_PARAM];

pub struct CreateCampaign;

#[derive(Debug, Clone)]
pub struct CreateCampaignRequest {
    pub customer_id: String,
    pub name: String,
    pub budget_id: String,
    pub channel: ChannelType,
    pub status: CampaignStatus,
}

#[async_trait]
impl WriteOperation for CreateCampaign {
    type Request = CreateCampaignRequest;

    fn name(&self) -> &'static str {
        "create_campaign"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        CREATE_CAMPAIGN_PARAMS
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<CreateCampaignRequest, WorkflowError> {
        let name = ctx.str("name").unwrap_or_default();
        if name.chars().count() > MAX_CAMPAIGN_NAME_LEN {
            return Err(WorkflowError::validation(format!(
                "name exceeds {} characters",
                MAX_CAMPAIGN_NAME_LEN
            )));
        }
        let status = match ctx.str("status") {
            None => CampaignStatus::Paused,
            Some(raw) => match raw.parse::<CampaignStatus>()? {
                CampaignStatus::Removed => {
                    return Err(WorkflowError::validation("A new campaign can only be PAUSED or ENABLED"));
                }
                s => s,
            },
        };
        Ok(CreateCampaignRequest {
            customer_id: ctx.customer_id()?,
            name: name.to_string(),
            budget_id: gaql::numeric_id("budgetId", ctx.str("budgetId").unwrap_or_default())?.to_string(),
            channel: ctx.str("campaignType").unwrap_or_default().parse()?,
            status,
        })
    }

    fn describe(&self, req: &CreateCampaignRequest) -> String {
        format!(
            "create {} campaign on budget {} as {}",
            req.channel, req.budget_id, req.status
        )
    }

    async fn build_dry_run(&self, req: &CreateCampaignRequest, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let query = Query::select(&["campaign_budget.id", "campaign_budget.name", "campaign_budget.amount_micros"])
            .from("campaign_budget")
            .where_id("campaign_budget.id", &req.budget_id)?
            .build();
        let rows = ads.search(&req.customer_id, &query).await?;
        let row = rows.first().ok_or_else(|| {
            WorkflowError::validation(format!(
                "Budget {} not found in account {}. Use list_budgets or create_budget first.",
                req.budget_id, req.customer_id
            ))
        })?;
        let budget_name = ads::str_at(row, "/campaignBudget/name").unwrap_or_else(|| req.budget_id.clone());
        let daily = ads::micros_to_amount(ads::i64_at(row, "/campaignBudget/amountMicros").unwrap_or(0));

        let mut builder = DryRunBuilder::new(&format!("Create campaign \"{}\"", req.name), "Google Ads", &req.customer_id)
            .change(ProposedChange::create("Campaign", "new", "name", json!(req.name)))
            .change(ProposedChange::create(
                "Campaign",
                "new",
                "advertising_channel_type",
                json!(req.channel.as_str()),
            ))
            .change(ProposedChange::create(
                "Campaign",
                "new",
                "campaign_budget",
                json!(format!("{} ({}/day)", budget_name, ads::format_dollars(daily))),
            ))
            .change(ProposedChange::create("Campaign", "new", "status", json!(req.status.as_str())));

        builder = match req.status {
            CampaignStatus::Enabled => builder
                .financial_impact(FinancialImpact::from_daily(0.0, daily))
                .risk("Campaign will be ENABLED and can start spending immediately once ads and keywords exist"),
            _ => builder.recommendation(
                "Campaign is created PAUSED. Add ad groups, ads and keywords, then enable it with update_campaign_status",
            ),
        };
        if !matches!(req.channel, ChannelType::Search | ChannelType::Display) {
            builder = builder.risk(format!(
                "{} campaigns need extra setup (feeds, assets or a different bidding strategy) before they can serve",
                req.channel
            ));
        }

        Ok(builder
            .recommendation("Bidding starts as manual CPC; review it after the first week of data")
            .build())
    }

    async fn execute(&self, req: &CreateCampaignRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let operation = json!({
            "create": {
                "name": req.name,
                "status": req.status.as_str(),
                "campaignBudget": format!("customers/{}/campaignBudgets/{}", req.customer_id, req.budget_id),
                "advertisingChannelType": req.channel.as_str(),
                "containsEuPoliticalAdvertising": "DOES_NOT_CONTAIN_EU_POLITICAL_ADVERTISING",
                "manualCpc": { "enhancedCpcEnabled": false },
                "networkSettings": {
                    "targetGoogleSearch": true,
                    "targetSearchNetwork": false,
                    "targetContentNetwork": req.channel == ChannelType::Display,
                    "targetPartnerSearchNetwork": false,
                },
            }
        });
        Ok(ads.mutate(&req.customer_id, MutateResource::Campaigns, vec![operation]).await?)
    }

    fn summarize(&self, req: &CreateCampaignRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let resource_name = created_resource_name(result);
        let campaign_id = resource_name
            .as_deref()
            .and_then(|rn| rn.rsplit('/').next())
            .map(String::from);

        let warnings = match req.status {
            CampaignStatus::Enabled => vec!["Campaign is ENABLED and will spend as soon as it has ads".to_string()],
            _ => Vec::new(),
        };
        let text = format_success_summary(
            "CAMPAIGN CREATED",
            &dry_run.operation,
            &[
                ("Campaign ID", campaign_id.clone().unwrap_or_else(|| "unknown".into())),
                ("Type", req.channel.to_string()),
                ("Budget ID", req.budget_id.clone()),
                ("Status", req.status.to_string()),
            ],
            audit_id,
            &warnings,
            &["Use list_campaigns to verify", "Use update_campaign_status to enable it when ready"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "campaignId": campaign_id,
                "resourceName": resource_name,
                "name": req.name,
                "campaignType": req.channel.as_str(),
                "status": req.status.as_str(),
                "budgetId": req.budget_id,
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}
