// AdsFlow - budget tools

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
use super::{ACCOUNT_PARAM, BUDGET_PARAM};

/// Largest relative change (either direction) accepted in one step.
pub const MAX_BUDGET_CHANGE_PERCENT: f64 = 500.0;
const LARGE_CHANGE_PERCENT: f64 = 100.0;
const GRADUAL_CHANGE_PERCENT: f64 = 20.0;

const BUDGET_FIELDS: &[&str] = &[
    "campaign_budget.id",
    "campaign_budget.name",
    "campaign_budget.amount_micros",
    "campaign_budget.explicitly_shared",
    "campaign_budget.reference_count",
];

// ── list_budgets ────────────────────────────────────────────────────────────

pub async fn list_budgets(args: &Value, ads: &dyn AdsClient) -> Result<ToolResponse, WorkflowError> {
    let customer_id = match select_account(args, ads).await? {
        AccountSelection::Selected(id) => id,
        AccountSelection::Discovery(resp) => return Ok(resp),
    };

    let query = Query::select(BUDGET_FIELDS)
        .from("campaign_budget")
        .filter("campaign_budget.status = 'ENABLED'")
        .build();
    let rows = ads.search(&customer_id, &query).await?;

    let budgets: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": ads::str_at(row, "/campaignBudget/id"),
                "name": ads::str_at(row, "/campaignBudget/name"),
                "dailyAmountDollars": ads::i64_at(row, "/campaignBudget/amountMicros").map(ads::micros_to_amount),
                "shared": row.pointer("/campaignBudget/explicitlyShared").and_then(|v| v.as_bool()).unwrap_or(false),
                "campaignCount": ads::i64_at(row, "/campaignBudget/referenceCount").unwrap_or(0),
            })
        })
        .collect();

    let mut text = format!("BUDGETS IN {} ({})\n\n", customer_id, budgets.len());
    for (i, b) in budgets.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} (ID: {})\n   {}/day | used by {} campaign(s){}\n",
            i + 1,
            b["name"].as_str().unwrap_or("Unnamed budget"),
            b["id"].as_str().unwrap_or("?"),
            ads::format_dollars(b["dailyAmountDollars"].as_f64().unwrap_or(0.0)),
            b["campaignCount"],
            if b["shared"].as_bool().unwrap_or(false) { " | shared" } else { "" }
        ));
    }

    Ok(ToolResponse::completed(
        text,
        json!({ "customerId": customer_id, "budgets": budgets, "count": budgets.len() }),
    ))
}

// ── update_budget ───────────────────────────────────────────────────────────

const AMOUNT_PARAM: ParamSpec = ParamSpec {
    name: "newDailyAmountDollars",
    title: "SPECIFY NEW DAILY BUDGET",
    prompt: "Provide newDailyAmountDollars as a number (e.g. 75 for $75/day).\n\
             Changes take effect immediately and affect every campaign using this budget.\n\
             Changes above 500% are rejected; for increases above 20% prefer 10-15% steps.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const BUDGET_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, BUDGET_PARAM, AMOUNT_PARAM];

pub struct UpdateBudget;

#[derive(Debug, Clone)]
pub struct BudgetRequest {
    pub customer_id: String,
    pub budget_id: String,
    pub new_daily: f64,
}

#[async_trait]
impl WriteOperation for UpdateBudget {
    type Request = BudgetRequest;

    fn name(&self) -> &'static str {
        "update_budget"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        BUDGET_PARAMS
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<BudgetRequest, WorkflowError> {
        let amount = ctx
            .f64("newDailyAmountDollars")
            .ok_or_else(|| WorkflowError::validation("newDailyAmountDollars must be a number"))?;
        Ok(BudgetRequest {
            customer_id: ctx.customer_id()?,
            budget_id: gaql::numeric_id("budgetId", ctx.str("budgetId").unwrap_or_default())?.to_string(),
            new_daily: ads::positive_amount("newDailyAmountDollars", amount)?,
        })
    }

    fn describe(&self, req: &BudgetRequest) -> String {
        format!("set budget {} to {}/day", req.budget_id, ads::format_dollars(req.new_daily))
    }

    async fn build_dry_run(&self, req: &BudgetRequest, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let query = Query::select(BUDGET_FIELDS)
            .from("campaign_budget")
            .where_id("campaign_budget.id", &req.budget_id)?
            .build();
        let rows = ads.search(&req.customer_id, &query).await?;
        let row = rows.first().ok_or_else(|| {
            WorkflowError::validation(format!(
                "Budget {} not found in account {}. Use list_budgets to find valid IDs.",
                req.budget_id, req.customer_id
            ))
        })?;

        let current = ads::micros_to_amount(ads::i64_at(row, "/campaignBudget/amountMicros").unwrap_or(0));
        let name = ads::str_at(row, "/campaignBudget/name").unwrap_or_else(|| req.budget_id.clone());
        let campaigns = ads::i64_at(row, "/campaignBudget/referenceCount").unwrap_or(0);

        let impact = FinancialImpact::from_daily(current, req.new_daily);
        check_change_limit(&impact)?;

        let mut builder = DryRunBuilder::new(&format!("Update budget \"{}\"", name), "Google Ads", &req.customer_id)
            .change(ProposedChange::update(
                "Campaign Budget",
                &req.budget_id,
                "amount_micros",
                json!(format!("{}/day", ads::format_dollars(current))),
                json!(format!("{}/day", ads::format_dollars(req.new_daily))),
            ))
            .financial_impact(impact.clone());

        match impact.percentage_change {
            Some(pct) => {
                if pct.abs() > LARGE_CHANGE_PERCENT {
                    builder = builder.risk(format!(
                        "Large budget change ({:.1}%) may cause delivery fluctuations",
                        pct
                    ));
                }
                if pct.abs() > GRADUAL_CHANGE_PERCENT {
                    builder = builder
                        .recommendation("Consider making budget changes in smaller increments (10-15% at a time)")
                        .recommendation("Wait 7 days between budget increases to allow the algorithm to optimize");
                }
            }
            None => {
                builder = builder.risk("Budget currently has no amount; every dollar of the new amount is new spend");
            }
        }
        if impact.daily_difference < 0.0 {
            builder = builder
                .risk("Decreasing budget may pause ad delivery if today's spend already exceeds the new limit");
        }
        if campaigns > 1 {
            builder = builder.risk(format!("Budget is shared by {} campaigns; all of them are affected", campaigns));
        }

        Ok(builder.build())
    }

    async fn execute(&self, req: &BudgetRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let operation = json!({
            "updateMask": "amountMicros",
            "update": {
                "resourceName": format!("customers/{}/campaignBudgets/{}", req.customer_id, req.budget_id),
                "amountMicros": ads::amount_to_micros(req.new_daily),
            }
        });
        Ok(ads
            .mutate(&req.customer_id, MutateResource::CampaignBudgets, vec![operation])
            .await?)
    }

    fn summarize(&self, req: &BudgetRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let mut details = vec![
            ("Budget ID", req.budget_id.clone()),
            ("New Daily Budget", format!("{}/day", ads::format_dollars(req.new_daily))),
        ];
        let mut warnings = Vec::new();
        if let Some(impact) = &dry_run.estimated_impact {
            details.insert(1, ("Previous Daily Budget", format!("{}/day", ads::format_dollars(impact.current_daily_spend))));
            details.push(("Monthly Difference", format!("{:+.2} USD", impact.monthly_difference)));
            if impact.daily_difference > 0.0 {
                warnings.push(format!(
                    "Spend may increase by up to {} per month",
                    ads::format_dollars(impact.monthly_difference)
                ));
            }
        }

        let text = format_success_summary(
            "BUDGET UPDATED",
            &dry_run.operation,
            &details,
            audit_id,
            &warnings,
            &["Use list_budgets to verify the new amount", "Review performance after 7 days"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "budgetId": req.budget_id,
                "newDailyAmountDollars": req.new_daily,
                "financialImpact": dry_run.estimated_impact,
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}

// ── create_budget ───────────────────────────────────────────────────────────

/// New budgets above this daily amount get a "start lower" recommendation.
const HIGH_NEW_BUDGET_DOLLARS: f64 = 100.0;
const MAX_BUDGET_NAME_LEN: usize = 255;

const BUDGET_NAME_PARAM: ParamSpec = ParamSpec {
    name: "name",
    title: "NAME THE NEW BUDGET",
    prompt: "Provide a name for the budget (e.g. \"Search - Brand - Daily\"). Names must be unique in the account.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const DAILY_AMOUNT_PARAM: ParamSpec = ParamSpec {
    name: "dailyAmountDollars",
    title: "SPECIFY DAILY AMOUNT",
    prompt: "Provide dailyAmountDollars as a number (e.g. 50 for $50/day).\n\
             The budget does not spend anything until a campaign uses it.",
    kind: ParamKind::Input,
    empty_guidance: "",
    remedy_tool: None,
};

const CREATE_BUDGET_PARAMS: &[ParamSpec] = &[ACCOUNT_PARAM, BUDGET_NAME_PARAM, DAILY_AMOUNT_PARAM];

pub struct CreateBudget;

#[derive(Debug, Clone)]
pub struct CreateBudgetRequest {
    pub customer_id: String,
    pub name: String,
    pub daily: f64,
}

#[async_trait]
impl WriteOperation for CreateBudget {
    type Request = CreateBudgetRequest;

    fn name(&self) -> &'static str {
        "create_budget"
    }

    fn required_params(&self) -> &'static [ParamSpec] {
        CREATE_BUDGET_PARAMS
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<CreateBudgetRequest, WorkflowError> {
        let name = ctx.str("name").unwrap_or_default();
        if name.chars().count() > MAX_BUDGET_NAME_LEN {
            return Err(WorkflowError::validation(format!(
                "name exceeds {} characters",
                MAX_BUDGET_NAME_LEN
            )));
        }
        let amount = ctx
            .f64("dailyAmountDollars")
            .ok_or_else(|| WorkflowError::validation("dailyAmountDollars must be a number"))?;
        Ok(CreateBudgetRequest {
            customer_id: ctx.customer_id()?,
            name: name.to_string(),
            daily: ads::positive_amount("dailyAmountDollars", amount)?,
        })
    }

    fn describe(&self, req: &CreateBudgetRequest) -> String {
        format!("create budget of {}/day", ads::format_dollars(req.daily))
    }

    async fn build_dry_run(&self, req: &CreateBudgetRequest, _ads: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
        let mut builder = DryRunBuilder::new(&format!("Create budget \"{}\"", req.name), "Google Ads", &req.customer_id)
            .change(ProposedChange::create(
                "Campaign Budget",
                "new",
                "amount_micros",
                json!(format!("{}/day", ads::format_dollars(req.daily))),
            ))
            .financial_impact(FinancialImpact::from_daily(0.0, req.daily));

        if req.daily > HIGH_NEW_BUDGET_DOLLARS {
            builder = builder.recommendation(
                "This is a relatively high daily budget for a new budget. Consider starting lower and scaling up.",
            );
        }

        Ok(builder
            .recommendation("This budget will not affect spend until assigned to an active campaign")
            .build())
    }

    async fn execute(&self, req: &CreateBudgetRequest, ads: &dyn AdsClient) -> Result<Value, WorkflowError> {
        let operation = json!({
            "create": {
                "name": req.name,
                "amountMicros": ads::amount_to_micros(req.daily),
                "deliveryMethod": "STANDARD",
                "explicitlyShared": false,
            }
        });
        Ok(ads
            .mutate(&req.customer_id, MutateResource::CampaignBudgets, vec![operation])
            .await?)
    }

    fn summarize(&self, req: &CreateBudgetRequest, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
        let resource_name = created_resource_name(result);
        let budget_id = resource_name
            .as_deref()
            .and_then(|rn| rn.rsplit('/').next())
            .map(String::from);

        let text = format_success_summary(
            "BUDGET CREATED",
            &dry_run.operation,
            &[
                ("Budget ID", budget_id.clone().unwrap_or_else(|| "unknown".into())),
                ("Name", req.name.clone()),
                ("Daily Amount", format!("{}/day", ads::format_dollars(req.daily))),
            ],
            audit_id,
            &[],
            &["Use create_campaign with this budgetId to start spending it", "Use list_budgets to verify"],
        );

        ToolResponse::completed(
            text,
            json!({
                "customerId": req.customer_id,
                "budgetId": budget_id,
                "resourceName": resource_name,
                "name": req.name,
                "dailyAmountDollars": req.daily,
                "auditId": audit_id,
                "result": result,
            }),
        )
    }
}

/// Resource name of the first created object in a mutate response.
pub(crate) fn created_resource_name(result: &Value) -> Option<String> {
    result
        .pointer("/results/0/resourceName")
        .and_then(|v| v.as_str())
        .map(String::from)
}

fn check_change_limit(impact: &FinancialImpact) -> Result<(), WorkflowError> {
    match impact.percentage_change {
        Some(pct) if pct.abs() > MAX_BUDGET_CHANGE_PERCENT => Err(WorkflowError::validation(format!(
            "Budget change of {:.0}% exceeds the maximum allowed ({:.0}%). Make this change directly in \
             the Google Ads UI. Current: {}/day, Proposed: {}/day",
            pct,
            MAX_BUDGET_CHANGE_PERCENT,
            ads::format_dollars(impact.current_daily_spend),
            ads::format_dollars(impact.new_daily_spend)
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_limit_rejects_above_500_percent() {
        assert!(check_change_limit(&FinancialImpact::from_daily(10.0, 60.0)).is_ok());
        let err = check_change_limit(&FinancialImpact::from_daily(10.0, 61.0)).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum allowed (500%)"));
        assert!(check_change_limit(&FinancialImpact::from_daily(0.0, 100.0)).is_ok());
    }

    #[test]
    fn validate_requires_positive_amount() {
        let ctx = DiscoveryContext::from_args(&json!({
            "customerId": "1234567890", "budgetId": "9", "newDailyAmountDollars": -5
        }));
        assert!(UpdateBudget.validate(&ctx).is_err());

        let ctx = DiscoveryContext::from_args(&json!({
            "customerId": "1234567890", "budgetId": "9", "newDailyAmountDollars": "75"
        }));
        assert_eq!(UpdateBudget.validate(&ctx).unwrap().new_daily, 75.0);
    }

    #[tokio::test]
    async fn new_budget_preview_is_a_create_with_monthly_projection() {
        let req = CreateBudgetRequest {
            customer_id: "1234567890".into(),
            name: "Spring".into(),
            daily: 150.0,
        };
        let dry_run = CreateBudget.build_dry_run(&req, &NoAds).await.unwrap();
        assert_eq!(dry_run.changes[0].change_type, crate::workflow::dry_run::ChangeType::Create);
        let impact = dry_run.estimated_impact.unwrap();
        assert_eq!(impact.current_daily_spend, 0.0);
        assert!((impact.monthly_difference - 150.0 * 30.4).abs() < 1e-6);
        assert!(dry_run.recommendations[0].contains("relatively high daily budget"));
        assert!(dry_run.recommendations[1].contains("until assigned to an active campaign"));
    }

    #[test]
    fn created_budget_id_comes_from_the_resource_name() {
        let result = json!({ "results": [{ "resourceName": "customers/1234567890/campaignBudgets/77" }] });
        assert_eq!(
            created_resource_name(&result).as_deref(),
            Some("customers/1234567890/campaignBudgets/77")
        );
        assert_eq!(created_resource_name(&json!({})), None);
    }

    struct NoAds;

    #[async_trait]
    impl AdsClient for NoAds {
        async fn list_accessible_customers(&self) -> Result<Vec<String>, ads::AdsError> {
            Ok(Vec::new())
        }

        async fn search(&self, _customer_id: &str, _query: &str) -> Result<Vec<Value>, ads::AdsError> {
            Ok(Vec::new())
        }

        async fn mutate(
            &self,
            _customer_id: &str,
            _resource: MutateResource,
            _operations: Vec<Value>,
        ) -> Result<Value, ads::AdsError> {
            Ok(json!({}))
        }
    }
}
