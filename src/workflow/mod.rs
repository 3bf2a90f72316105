//! Guided write workflow: discovery, vagueness guard, dry-run preview and
//! confirmation. Tools plug in through [`engine::WriteOperation`].

pub mod discovery;
pub mod dry_run;
pub mod engine;
pub mod response;
pub mod store;
pub mod vagueness;

pub use discovery::{Candidate, DiscoveryContext, DiscoveryStep, ParamKind, ParamSpec};
pub use dry_run::{DryRun, DryRunBuilder, DryRunRegistry, FinancialImpact, ProposedChange};
pub use engine::{Workflow, WorkflowStage, WriteOperation};
pub use response::ToolResponse;
pub use store::{InMemoryStore, PendingStore};
pub use vagueness::{VaguenessDetector, VaguenessProbe};
