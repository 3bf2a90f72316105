// AdsFlow - shared integration test harness
// A recording Ads client plus helpers that drive the real router.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use adsflow_backend::ads::{AdsClient, AdsClientFactory, AdsError, MutateResource};
use adsflow_backend::config::Config;
use adsflow_backend::credentials::{Credentials, REFRESH_TOKEN_HEADER};
use adsflow_backend::error::WorkflowError;
use adsflow_backend::state::AppState;
use adsflow_backend::workflow::InMemoryStore;

pub const CUSTOMER_ID: &str = "1234567890";
pub const AD_GROUP_ID: &str = "111";
pub const KEYWORD_RESOURCE: &str = "customers/1234567890/adGroupCriteria/111~222";

#[derive(Debug, Clone)]
pub struct MutateCall {
    pub customer_id: String,
    pub resource: MutateResource,
    pub operations: Vec<Value>,
}

/// Ads account with one campaign, one budget, one ad group and one keyword.
#[derive(Default)]
pub struct MockAds {
    pub queries: Mutex<Vec<String>>,
    pub mutations: Mutex<Vec<MutateCall>>,
}

impl MockAds {
    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    pub fn last_mutation(&self) -> Option<MutateCall> {
        self.mutations.lock().unwrap().last().cloned()
    }
}

fn resource_of(query: &str) -> &str {
    query
        .split("FROM ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("")
}

#[async_trait]
impl AdsClient for MockAds {
    async fn list_accessible_customers(&self) -> Result<Vec<String>, AdsError> {
        Ok(vec![format!("customers/{}", CUSTOMER_ID), "customers/9876543210".to_string()])
    }

    async fn search(&self, _customer_id: &str, query: &str) -> Result<Vec<Value>, AdsError> {
        self.queries.lock().unwrap().push(query.to_string());
        let rows = match resource_of(query) {
            "keyword_view" => vec![json!({
                "adGroupCriterion": {
                    "resourceName": KEYWORD_RESOURCE,
                    "criterionId": "222",
                    "keyword": { "text": "running shoes", "matchType": "EXACT" },
                    "cpcBidMicros": "1500000",
                    "status": "ENABLED"
                },
                "adGroup": { "id": AD_GROUP_ID, "name": "Shoes" }
            })],
            "ad_group" => vec![json!({
                "adGroup": { "id": AD_GROUP_ID, "name": "Shoes", "status": "ENABLED" },
                "campaign": { "name": "Brand" }
            })],
            "campaign_budget" => vec![json!({
                "campaignBudget": {
                    "id": "9",
                    "name": "Main budget",
                    "amountMicros": "50000000",
                    "explicitlyShared": false,
                    "referenceCount": "1"
                }
            })],
            "campaign" => vec![json!({
                "campaign": { "id": "5", "name": "Brand", "status": "ENABLED" }
            })],
            _ => vec![],
        };
        Ok(rows)
    }

    async fn mutate(
        &self,
        customer_id: &str,
        resource: MutateResource,
        operations: Vec<Value>,
    ) -> Result<Value, AdsError> {
        self.mutations.lock().unwrap().push(MutateCall {
            customer_id: customer_id.to_string(),
            resource,
            operations,
        });
        Ok(json!({ "results": [{ "resourceName": "customers/1234567890/mock" }] }))
    }
}

pub struct MockFactory {
    pub ads: Arc<MockAds>,
}

impl AdsClientFactory for MockFactory {
    fn connect(&self, _credentials: &Credentials) -> Result<Arc<dyn AdsClient>, WorkflowError> {
        let ads: Arc<dyn AdsClient> = self.ads.clone();
        Ok(ads)
    }
}

pub fn test_config() -> Config {
    Config {
        developer_token: Some("dev-token".to_string()),
        ..Config::default()
    }
}

/// App state wired to a fresh [`MockAds`].
pub fn test_state(config: Config) -> (AppState, Arc<MockAds>) {
    let ads = Arc::new(MockAds::default());
    let state = AppState::with_parts(
        config,
        Arc::new(MockFactory { ads: ads.clone() }),
        Arc::new(InMemoryStore::new()),
    );
    (state, ads)
}

/// Collect a response body into a `serde_json::Value`.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn mcp_request(body: &Value, refresh_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(token) = refresh_token {
        builder = builder.header(REFRESH_TOKEN_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// `tools/call` through the real router; returns the JSON-RPC `result`.
pub async fn call_tool(state: &AppState, name: &str, arguments: Value) -> Value {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    });
    let response = adsflow_backend::create_router(state.clone())
        .oneshot(mcp_request(&body, Some("refresh-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["result"].clone()
}

pub fn text_of(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap_or("")
}
