//! Guided write workflow.
//!
//! Every mutating tool implements [`WriteOperation`] and is driven through
//! [`Workflow::run`]:
//!
//! 1. pre-flight checks on whatever was supplied (bulk limits)
//! 2. discovery of the first missing parameter (early return)
//! 3. full validation into a typed request
//! 4. vagueness guard
//! 5. dry run; without a token the preview is returned (early return)
//! 6. confirmation, execution, audit, summary

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::discovery::{self, DiscoveryContext, ParamSpec};
use super::dry_run::{DryRun, DryRunRegistry};
use super::response::ToolResponse;
use super::vagueness::{VaguenessDetector, VaguenessProbe};
use crate::ads::AdsClient;
use crate::audit;
use crate::error::WorkflowError;

pub const CONFIRMATION_TOKEN_ARG: &str = "confirmationToken";
pub const USER_REQUEST_ARG: &str = "userRequest";

/// Where a call stands, decided from its arguments alone.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStage<'a> {
    NeedsParam(&'a ParamSpec),
    ReadyForPreview,
    ReadyToExecute(String),
}

impl<'a> WorkflowStage<'a> {
    pub fn classify(specs: &'a [ParamSpec], ctx: &DiscoveryContext) -> Self {
        if let Some(spec) = specs.iter().find(|s| !ctx.is_present(s.name)) {
            return WorkflowStage::NeedsParam(spec);
        }
        match ctx.str(CONFIRMATION_TOKEN_ARG) {
            Some(token) => WorkflowStage::ReadyToExecute(token.to_string()),
            None => WorkflowStage::ReadyForPreview,
        }
    }
}

#[async_trait]
pub trait WriteOperation: Send + Sync {
    /// Validated, typed input.
    type Request: Send + Sync;

    fn name(&self) -> &'static str;

    fn required_params(&self) -> &'static [ParamSpec];

    /// Checks on supplied values that must fail before anything else runs.
    fn preflight(&self, _ctx: &DiscoveryContext) -> Result<(), WorkflowError> {
        Ok(())
    }

    fn validate(&self, ctx: &DiscoveryContext) -> Result<Self::Request, WorkflowError>;

    /// One-line description of the request, scored by the vagueness guard.
    fn describe(&self, request: &Self::Request) -> String;

    /// Read current state and describe the change. Must not write.
    async fn build_dry_run(&self, request: &Self::Request, ads: &dyn AdsClient) -> Result<DryRun, WorkflowError>;

    async fn execute(&self, request: &Self::Request, ads: &dyn AdsClient) -> Result<Value, WorkflowError>;

    fn summarize(&self, request: &Self::Request, dry_run: &DryRun, result: &Value, audit_id: &str) -> ToolResponse;
}

/// Shared collaborators for one tool call.
pub struct Workflow<'a> {
    pub registry: &'a DryRunRegistry,
    pub vagueness: &'a VaguenessDetector,
    pub ads: &'a dyn AdsClient,
}

impl Workflow<'_> {
    pub async fn run<O: WriteOperation>(&self, op: &O, args: &Value) -> Result<ToolResponse, WorkflowError> {
        let ctx = DiscoveryContext::from_args(args);
        let specs = op.required_params();

        op.preflight(&ctx)?;

        let stage = WorkflowStage::classify(specs, &ctx);
        if let WorkflowStage::NeedsParam(spec) = &stage {
            tracing::debug!(tool = op.name(), param = spec.name, "workflow: discovery");
            if let Some(resp) = discovery::next_step(specs, &ctx, self.ads).await?.into_response() {
                return Ok(resp);
            }
        }

        let request = op.validate(&ctx)?;

        let probe = VaguenessProbe::new(op.name(), op.describe(&request), args)
            .with_user_request(ctx.str(USER_REQUEST_ARG));
        self.vagueness.enforce(&probe)?;

        let dry_run = op.build_dry_run(&request, self.ads).await?;

        let token = match stage {
            WorkflowStage::ReadyToExecute(token) => token,
            _ => {
                let created = self
                    .registry
                    .create_dry_run(dry_run, Value::Object(ctx.snapshot(specs)))
                    .await;
                let message = format!(
                    "Review the preview above. To execute, call {} again with the same parameters \
                     plus confirmationToken. Nothing is changed until you do.",
                    op.name()
                );
                return Ok(ToolResponse::approval_required(
                    created.preview,
                    created.confirmation_token,
                    message,
                ));
            }
        };

        let result = self
            .registry
            .validate_and_execute(&token, &dry_run, || op.execute(&request, self.ads))
            .await?;

        let mut details = Map::new();
        details.insert("changes".into(), serde_json::to_value(&dry_run.changes).unwrap_or(Value::Null));
        details.insert("result".into(), result.clone());
        let audit_id = audit::log_write(op.name(), &dry_run.account_id, &Value::Object(details));

        Ok(op.summarize(&request, &dry_run, &result, &audit_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::{AdsError, MutateResource};
    use crate::workflow::discovery::ParamKind;
    use crate::workflow::dry_run::{DryRunBuilder, ProposedChange};
    use crate::workflow::store::InMemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct NoAds;

    #[async_trait]
    impl AdsClient for NoAds {
        async fn list_accessible_customers(&self) -> Result<Vec<String>, AdsError> {
            Ok(vec!["customers/1234567890".into()])
        }
        async fn search(&self, _: &str, _: &str) -> Result<Vec<Value>, AdsError> {
            Ok(vec![])
        }
        async fn mutate(&self, _: &str, _: MutateResource, _: Vec<Value>) -> Result<Value, AdsError> {
            Ok(json!({}))
        }
    }

    const PARAMS: &[ParamSpec] = &[
        ParamSpec {
            name: "customerId",
            title: "SELECT ACCOUNT",
            prompt: "Which account?",
            kind: ParamKind::Account,
            empty_guidance: "No accounts.",
            remedy_tool: None,
        },
        ParamSpec {
            name: "label",
            title: "LABEL",
            prompt: "Label text",
            kind: ParamKind::Input,
            empty_guidance: "",
            remedy_tool: None,
        },
    ];

    #[derive(Default)]
    struct Rename {
        executed: AtomicUsize,
    }

    #[async_trait]
    impl WriteOperation for Rename {
        type Request = (String, String);

        fn name(&self) -> &'static str {
            "rename_thing"
        }
        fn required_params(&self) -> &'static [ParamSpec] {
            PARAMS
        }
        fn validate(&self, ctx: &DiscoveryContext) -> Result<Self::Request, WorkflowError> {
            Ok((ctx.customer_id()?, ctx.str("label").unwrap_or_default().to_string()))
        }
        fn describe(&self, request: &Self::Request) -> String {
            format!("rename label to {}", request.1)
        }
        async fn build_dry_run(&self, request: &Self::Request, _: &dyn AdsClient) -> Result<DryRun, WorkflowError> {
            Ok(DryRunBuilder::new("Rename", "Google Ads", &request.0)
                .change(ProposedChange::update("label", "1", "name", json!("old"), json!(request.1)))
                .build())
        }
        async fn execute(&self, _: &Self::Request, _: &dyn AdsClient) -> Result<Value, WorkflowError> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "ok": true }))
        }
        fn summarize(&self, _: &Self::Request, _: &DryRun, result: &Value, audit_id: &str) -> ToolResponse {
            ToolResponse::completed(format!("done {}", audit_id), result.clone())
        }
    }

    fn registry() -> DryRunRegistry {
        DryRunRegistry::new(Arc::new(InMemoryStore::new()), Duration::from_secs(300))
    }

    #[test]
    fn classify_stages() {
        let ctx = DiscoveryContext::from_args(&json!({ "customerId": "1234567890" }));
        assert_eq!(WorkflowStage::classify(PARAMS, &ctx), WorkflowStage::NeedsParam(&PARAMS[1]));

        let ctx = DiscoveryContext::from_args(&json!({ "customerId": "1234567890", "label": "x" }));
        assert_eq!(WorkflowStage::classify(PARAMS, &ctx), WorkflowStage::ReadyForPreview);

        let ctx = DiscoveryContext::from_args(&json!({
            "customerId": "1234567890", "label": "x", "confirmationToken": "tok"
        }));
        assert_eq!(
            WorkflowStage::classify(PARAMS, &ctx),
            WorkflowStage::ReadyToExecute("tok".into())
        );
    }

    #[tokio::test]
    async fn preview_then_execute() {
        let reg = registry();
        let vagueness = VaguenessDetector::new();
        let wf = Workflow { registry: &reg, vagueness: &vagueness, ads: &NoAds };
        let op = Rename::default();

        let args = json!({ "customerId": "1234567890", "label": "Spring 2026" });
        let preview = wf.run(&op, &args).await.unwrap();
        assert_eq!(preview.requires_approval, Some(true));
        let token = preview.confirmation_token.unwrap();
        assert_eq!(op.executed.load(Ordering::SeqCst), 0);

        let mut confirm = args.clone();
        confirm["confirmationToken"] = json!(token);
        let done = wf.run(&op, &confirm).await.unwrap();
        assert!(done.text.starts_with("done "));
        assert_eq!(op.executed.load(Ordering::SeqCst), 1);

        let again = wf.run(&op, &confirm).await;
        assert!(matches!(again, Err(WorkflowError::InvalidConfirmation)));
        assert_eq!(op.executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn vague_request_creates_no_token() {
        let reg = registry();
        let vagueness = VaguenessDetector::new();
        let wf = Workflow { registry: &reg, vagueness: &vagueness, ads: &NoAds };

        let args = json!({
            "customerId": "1234567890",
            "label": "x",
            "userRequest": "rename all of those things"
        });
        let res = wf.run(&Rename::default(), &args).await;
        assert!(matches!(res, Err(WorkflowError::Vague(_))));
        assert_eq!(reg.pending_count().await, 0);
    }

    #[tokio::test]
    async fn missing_param_returns_guidance() {
        let reg = registry();
        let vagueness = VaguenessDetector::new();
        let wf = Workflow { registry: &reg, vagueness: &vagueness, ads: &NoAds };

        let resp = wf.run(&Rename::default(), &json!({})).await.unwrap();
        assert_eq!(resp.requires_approval, None);
        assert_eq!(resp.data["nextParam"], "customerId");
        assert!(resp.text.contains("Customer ID: 1234567890"));
        assert_eq!(reg.pending_count().await, 0);
    }
}
