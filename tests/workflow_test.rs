// AdsFlow - guided write workflow, end to end through /mcp

mod common;

use serde_json::{json, Value};
use tower::ServiceExt;

use adsflow_backend::ads::MutateResource;
use adsflow_backend::config::Config;
use common::{
    body_json, call_tool, mcp_request, test_config, test_state, text_of, AD_GROUP_ID, CUSTOMER_ID, KEYWORD_RESOURCE,
};

fn bid_args(dollars: f64) -> Value {
    json!({
        "customerId": CUSTOMER_ID,
        "adGroupId": AD_GROUP_ID,
        "keywordResourceName": KEYWORD_RESOURCE,
        "maxCpcDollars": dollars,
    })
}

fn with_token(mut args: Value, token: &str) -> Value {
    args["confirmationToken"] = json!(token);
    args
}

fn keywords(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({ "text": format!("trail shoes {}", i), "matchType": "PHRASE" }))
        .collect()
}

#[tokio::test]
async fn keyword_bid_preview_then_confirm_mutates_once() {
    let (state, ads) = test_state(test_config());

    let preview = call_tool(&state, "set_keyword_bid", bid_args(2.5)).await;
    assert_eq!(preview["isError"], false);
    let structured = &preview["structuredContent"];
    assert_eq!(structured["requiresApproval"], true);
    assert!(structured["preview"].as_str().unwrap().contains("$2.50"));
    assert!(text_of(&preview).contains("confirmationToken"));
    let token = structured["confirmationToken"].as_str().unwrap().to_string();
    assert_eq!(ads.mutation_count(), 0);
    assert_eq!(state.registry.pending_count().await, 1);

    let done = call_tool(&state, "set_keyword_bid", with_token(bid_args(2.5), &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    assert_eq!(ads.mutation_count(), 1);
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.customer_id, CUSTOMER_ID);
    assert_eq!(call.resource, MutateResource::AdGroupCriteria);
    assert_eq!(call.operations[0]["update"]["cpcBidMicros"], 2_500_000);
    assert_eq!(call.operations[0]["update"]["resourceName"], KEYWORD_RESOURCE);
    assert!(done["structuredContent"]["data"]["auditId"].is_string());

    let reused = call_tool(&state, "set_keyword_bid", with_token(bid_args(2.5), &token)).await;
    assert_eq!(reused["isError"], true);
    assert!(text_of(&reused).contains("already used"));
    assert_eq!(ads.mutation_count(), 1);
}

#[tokio::test]
async fn confirming_different_parameters_is_rejected() {
    let (state, ads) = test_state(test_config());

    let preview = call_tool(&state, "set_keyword_bid", bid_args(2.5)).await;
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();

    let changed = call_tool(&state, "set_keyword_bid", with_token(bid_args(3.0), &token)).await;
    assert_eq!(changed["isError"], true);
    assert!(text_of(&changed).contains("no longer matches the preview"));
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn unknown_token_never_executes() {
    let (state, ads) = test_state(test_config());

    let result = call_tool(&state, "set_keyword_bid", with_token(bid_args(2.5), "deadbeef")).await;
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["errorKind"], "invalid_confirmation");
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let config = Config {
        confirmation_ttl: std::time::Duration::ZERO,
        ..test_config()
    };
    let (state, ads) = test_state(config);

    let preview = call_tool(&state, "set_keyword_bid", bid_args(2.5)).await;
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();

    let result = call_tool(&state, "set_keyword_bid", with_token(bid_args(2.5), &token)).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("expired"));
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn bulk_keyword_limit_blocks_before_preview_and_execution() {
    let (state, ads) = test_state(test_config());
    let args = json!({
        "customerId": CUSTOMER_ID,
        "adGroupId": AD_GROUP_ID,
        "keywords": keywords(51),
    });

    let result = call_tool(&state, "add_keywords", args.clone()).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("Cannot add 51 keywords"));
    assert!(text_of(&result).contains("Maximum is 50"));

    let result = call_tool(&state, "add_keywords", with_token(args, "any-token")).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("Cannot add 51 keywords"));

    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn add_keywords_creates_one_criterion_per_keyword() {
    let (state, ads) = test_state(test_config());
    let args = json!({
        "customerId": CUSTOMER_ID,
        "adGroupId": AD_GROUP_ID,
        "keywords": keywords(3),
    });

    let preview = call_tool(&state, "add_keywords", args.clone()).await;
    assert_eq!(preview["isError"], false, "{}", text_of(&preview));
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();

    let done = call_tool(&state, "add_keywords", with_token(args, &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.resource, MutateResource::AdGroupCriteria);
    assert_eq!(call.operations.len(), 3);
    assert_eq!(call.operations[0]["create"]["keyword"]["text"], "trail shoes 0");
    assert_eq!(call.operations[0]["create"]["keyword"]["matchType"], "PHRASE");
}

#[tokio::test]
async fn missing_refresh_token_fails_before_any_ads_call() {
    let (state, ads) = test_state(test_config());
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": "set_keyword_bid", "arguments": bid_args(2.5) }
    });

    let response = adsflow_backend::create_router(state)
        .oneshot(mcp_request(&body, None))
        .await
        .unwrap();
    let json = body_json(response).await;

    assert_eq!(json["result"]["isError"], true);
    assert!(text_of(&json["result"]).contains("Refresh token required"));
    assert!(ads.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_developer_token_is_a_configuration_error() {
    let (state, _) = test_state(Config::default());

    let result = call_tool(&state, "list_accessible_accounts", json!({})).await;
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["errorKind"], "configuration");
}

#[tokio::test]
async fn vague_user_request_is_blocked_without_a_preview() {
    let (state, ads) = test_state(test_config());
    let mut args = bid_args(2.5);
    args["userRequest"] = json!("change all of them");

    let result = call_tool(&state, "set_keyword_bid", args).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("VAGUE REQUEST DETECTED"));
    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn discovery_walks_parameters_in_declared_order() {
    let (state, ads) = test_state(test_config());

    let step = call_tool(&state, "set_keyword_bid", json!({})).await;
    assert_eq!(step["isError"], false);
    assert_eq!(step["structuredContent"]["data"]["nextParam"], "customerId");
    assert!(text_of(&step).contains("Step 1/4"));
    assert!(text_of(&step).contains(CUSTOMER_ID));

    let step = call_tool(&state, "set_keyword_bid", json!({ "customerId": CUSTOMER_ID })).await;
    assert_eq!(step["structuredContent"]["data"]["nextParam"], "adGroupId");
    assert!(text_of(&step).contains("Shoes (ID: 111)"));

    let step = call_tool(
        &state,
        "set_keyword_bid",
        json!({ "customerId": CUSTOMER_ID, "adGroupId": AD_GROUP_ID }),
    )
    .await;
    assert_eq!(step["structuredContent"]["data"]["nextParam"], "keywordResourceName");
    assert!(text_of(&step).contains(KEYWORD_RESOURCE));

    let step = call_tool(
        &state,
        "set_keyword_bid",
        json!({
            "customerId": CUSTOMER_ID,
            "adGroupId": AD_GROUP_ID,
            "keywordResourceName": KEYWORD_RESOURCE,
        }),
    )
    .await;
    assert_eq!(step["structuredContent"]["data"]["nextParam"], "maxCpcDollars");
    assert_eq!(step["structuredContent"]["data"]["context"]["adGroupId"], AD_GROUP_ID);

    assert_eq!(ads.mutation_count(), 0);
    assert_eq!(state.registry.pending_count().await, 0);
}

#[tokio::test]
async fn budget_preview_shows_financial_impact_and_executes() {
    let (state, ads) = test_state(test_config());
    let args = json!({ "customerId": CUSTOMER_ID, "budgetId": "9", "newDailyAmountDollars": 75 });

    let preview = call_tool(&state, "update_budget", args.clone()).await;
    assert_eq!(preview["isError"], false, "{}", text_of(&preview));
    let text = preview["structuredContent"]["preview"].as_str().unwrap();
    assert!(text.contains("$50.00"));
    assert!(text.contains("$75.00"));
    assert!(text.contains("+50.0%"));
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();

    let done = call_tool(&state, "update_budget", with_token(args, &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.resource, MutateResource::CampaignBudgets);
    assert_eq!(call.operations[0]["update"]["amountMicros"], 75_000_000);
}

#[tokio::test]
async fn budget_change_above_limit_is_rejected() {
    let (state, ads) = test_state(test_config());
    let args = json!({ "customerId": CUSTOMER_ID, "budgetId": "9", "newDailyAmountDollars": 400 });

    let result = call_tool(&state, "update_budget", args).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("exceeds the maximum allowed"));
    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn campaign_status_update_round_trip() {
    let (state, ads) = test_state(test_config());
    let args = json!({ "customerId": CUSTOMER_ID, "campaignId": "5", "status": "paused" });

    let preview = call_tool(&state, "update_campaign_status", args.clone()).await;
    assert_eq!(preview["isError"], false, "{}", text_of(&preview));
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();

    let done = call_tool(&state, "update_campaign_status", with_token(args, &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.resource, MutateResource::Campaigns);
    assert_eq!(call.operations[0]["update"]["status"], "PAUSED");
    assert_eq!(call.operations[0]["updateMask"], "status");
}

#[tokio::test]
async fn read_tools_list_without_a_workflow() {
    let (state, ads) = test_state(test_config());

    let accounts = call_tool(&state, "list_accessible_accounts", json!({})).await;
    assert_eq!(accounts["isError"], false);
    assert!(text_of(&accounts).contains(CUSTOMER_ID));

    let kws = call_tool(&state, "list_keywords", json!({ "customerId": CUSTOMER_ID })).await;
    assert_eq!(kws["isError"], false);
    assert!(text_of(&kws).contains("running shoes"));

    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn relative_terms_in_user_request_block_despite_numeric_parameters() {
    let (state, ads) = test_state(test_config());
    let mut args = bid_args(2.5);
    args["userRequest"] = json!("make the bid higher");

    let result = call_tool(&state, "set_keyword_bid", args).await;
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["errorKind"], "vague");
    let text = text_of(&result);
    assert!(text.contains("VAGUE REQUEST DETECTED"));
    assert!(text.contains("higher"));
    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn remove_keywords_previews_each_deletion_then_removes() {
    let (state, ads) = test_state(test_config());
    let args = json!({
        "customerId": CUSTOMER_ID,
        "adGroupId": AD_GROUP_ID,
        "criterionIds": ["222"],
    });

    let preview = call_tool(&state, "remove_keywords", args.clone()).await;
    assert_eq!(preview["isError"], false, "{}", text_of(&preview));
    let text = preview["structuredContent"]["preview"].as_str().unwrap();
    assert!(text.contains("[DELETE] Keyword 222 :: status"));
    assert!(text.contains("\"running shoes\" [EXACT] - Active"));
    assert!(text.contains("REMOVED (deleted)"));
    assert!(text.contains("DESTRUCTIVE"));
    assert!(text.contains("Consider pausing keywords instead of removing"));
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();
    assert_eq!(ads.mutation_count(), 0);

    let done = call_tool(&state, "remove_keywords", with_token(args, &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    assert_eq!(ads.mutation_count(), 1);
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.resource, MutateResource::AdGroupCriteria);
    assert_eq!(call.operations, vec![json!({ "remove": KEYWORD_RESOURCE })]);
    assert_eq!(done["structuredContent"]["data"]["keywordsRemoved"], 1);
}

#[tokio::test]
async fn removing_an_unknown_keyword_fails_before_preview() {
    let (state, ads) = test_state(test_config());
    let args = json!({
        "customerId": CUSTOMER_ID,
        "adGroupId": AD_GROUP_ID,
        "criterionIds": ["222", "999"],
    });

    let result = call_tool(&state, "remove_keywords", args).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("999 not found"));
    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn bulk_removal_limit_blocks_before_preview_and_execution() {
    let (state, ads) = test_state(test_config());
    let ids: Vec<String> = (1..=51).map(|i| i.to_string()).collect();
    let args = json!({ "customerId": CUSTOMER_ID, "adGroupId": AD_GROUP_ID, "criterionIds": ids });

    let result = call_tool(&state, "remove_keywords", args.clone()).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("Cannot remove 51 keywords"));

    let result = call_tool(&state, "remove_keywords", with_token(args, "any-token")).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("Maximum is 50"));

    assert!(ads.queries.lock().unwrap().is_empty());
    assert_eq!(state.registry.pending_count().await, 0);
    assert_eq!(ads.mutation_count(), 0);
}

#[tokio::test]
async fn create_budget_previews_new_spend_and_creates() {
    let (state, ads) = test_state(test_config());
    let args = json!({ "customerId": CUSTOMER_ID, "name": "Spring", "dailyAmountDollars": 40 });

    let preview = call_tool(&state, "create_budget", args.clone()).await;
    assert_eq!(preview["isError"], false, "{}", text_of(&preview));
    let text = preview["structuredContent"]["preview"].as_str().unwrap();
    assert!(text.contains("[CREATE] Campaign Budget new"));
    assert!(text.contains("new value: $40.00/day"));
    assert!(text.contains("FINANCIAL IMPACT"));
    assert!(text.contains("will not affect spend until assigned"));
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();

    let done = call_tool(&state, "create_budget", with_token(args, &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.resource, MutateResource::CampaignBudgets);
    assert_eq!(call.operations[0]["create"]["name"], "Spring");
    assert_eq!(call.operations[0]["create"]["amountMicros"], 40_000_000);
    assert_eq!(call.operations[0]["create"]["deliveryMethod"], "STANDARD");
}

#[tokio::test]
async fn create_campaign_discovers_budget_and_creates_paused() {
    let (state, ads) = test_state(test_config());

    let step = call_tool(&state, "create_campaign", json!({ "customerId": CUSTOMER_ID, "name": "Spring Sale" })).await;
    assert_eq!(step["isError"], false, "{}", text_of(&step));
    assert_eq!(step["structuredContent"]["data"]["nextParam"], "budgetId");
    assert!(text_of(&step).contains("Main budget (ID: 9) $50.00/day"));

    let args = json!({
        "customerId": CUSTOMER_ID,
        "name": "Spring Sale",
        "budgetId": "9",
        "campaignType": "SEARCH",
    });
    let preview = call_tool(&state, "create_campaign", args.clone()).await;
    assert_eq!(preview["isError"], false, "{}", text_of(&preview));
    let text = preview["structuredContent"]["preview"].as_str().unwrap();
    assert!(text.contains("[CREATE] Campaign new :: status"));
    assert!(text.contains("Main budget ($50.00/day)"));
    let token = preview["structuredContent"]["confirmationToken"].as_str().unwrap().to_string();
    assert_eq!(ads.mutation_count(), 0);

    let done = call_tool(&state, "create_campaign", with_token(args, &token)).await;
    assert_eq!(done["isError"], false, "{}", text_of(&done));
    let call = ads.last_mutation().unwrap();
    assert_eq!(call.resource, MutateResource::Campaigns);
    let create = &call.operations[0]["create"];
    assert_eq!(create["status"], "PAUSED");
    assert_eq!(create["advertisingChannelType"], "SEARCH");
    assert_eq!(create["campaignBudget"], "customers/1234567890/campaignBudgets/9");
    assert_eq!(create["networkSettings"]["targetContentNetwork"], false);
}
