// AdsFlow - account tools

use serde_json::{json, Value};

use crate::ads::{self, AdsClient};
use crate::error::WorkflowError;
use crate::workflow::discovery::{self, DiscoveryContext};
use crate::workflow::ToolResponse;

use super::ACCOUNT_PARAM;

pub async fn list_accessible_accounts(ads: &dyn AdsClient) -> Result<ToolResponse, WorkflowError> {
    let names = ads.list_accessible_customers().await?;

    let accounts: Vec<Value> = names
        .iter()
        .map(|rn| json!({ "resourceName": rn, "customerId": ads::customer_id_from_resource(rn) }))
        .collect();

    let mut text = format!("ACCESSIBLE GOOGLE ADS ACCOUNTS ({})\n\n", accounts.len());
    if accounts.is_empty() {
        text.push_str(ACCOUNT_PARAM.empty_guidance);
        text.push('\n');
    }
    for (i, rn) in names.iter().enumerate() {
        text.push_str(&format!("{}. Customer ID: {}\n", i + 1, ads::customer_id_from_resource(rn)));
    }
    text.push_str("\nUse a customerId from this list with any other tool.");

    Ok(ToolResponse::completed(
        text,
        json!({ "accounts": accounts, "count": accounts.len() }),
    ))
}

pub(crate) enum AccountSelection {
    Selected(String),
    /// `customerId` missing; the account discovery prompt to return.
    Discovery(ToolResponse),
}

/// Account gate for read tools: discovery when `customerId` is missing.
pub(crate) async fn select_account(args: &Value, ads: &dyn AdsClient) -> Result<AccountSelection, WorkflowError> {
    let ctx = DiscoveryContext::from_args(args);
    match discovery::next_step(&[ACCOUNT_PARAM], &ctx, ads).await?.into_response() {
        Some(resp) => Ok(AccountSelection::Discovery(resp)),
        None => Ok(AccountSelection::Selected(ctx.customer_id()?)),
    }
}
