//! # Declarative
//!
//! Declarative reconciliation of remote resources.
//!
//! This crate turns a set of declared resources into remote objects and keeps
//! them converged: it plans the difference between what is declared and what
//! is tracked, then drives each resource through one lifecycle state machine.
//!
//! ## Core Concepts
//!
//! - **ResourceKind**: A thin per-kind descriptor (validate, encode requests,
//!   decode responses, identity shape, diff rules)
//! - **Reconciler**: The lifecycle (create, read, update, delete, dry-run),
//!   implemented once for every kind
//! - **Registry**: Type-erased reconcilers addressable by kind name
//! - **Plan**: Ordered create/update/replace/delete steps
//! - **Executor**: Applies a plan and refreshes tracked state
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{planner, executor, ApplyContext, AutoConfirm, NoProgress, Registry};
//!
//! let registry = Registry::new().with(Redirect);
//! let plan = planner::plan(&desired, &state, &registry)?;
//!
//! let ctx = ApplyContext::new(client, false);
//! let summary = executor::execute(
//!     &plan, &registry, &ctx, &mut state, &mut NoProgress, &mut AutoConfirm,
//! )?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates and state checkpoints
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or state storage.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod registry;
pub mod resource;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DiffOutcome, DiffRules};
pub use executor::{RefreshOutcome, RefreshReport, execute, refresh};
pub use planner::{Action, Plan, PlanSummary, Step};
pub use reconciler::Reconciler;
pub use registry::{DynReconciler, Registry};
pub use resource::ResourceKind;
pub use types::{
    ApplyResult, DeletePolicy, DesiredResource, ExecuteSummary, PREVIEW_TIMESTAMP,
    Snapshot, StateRecord, TrackedState,
};
