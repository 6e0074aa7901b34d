//! Resource-kind descriptor trait
//!
//! A [`ResourceKind`] is a thin adapter between typed inputs and the remote
//! API: it validates, encodes requests and decodes responses. The lifecycle
//! itself (dry-run, identity handling, not-found semantics) is implemented
//! once in [`crate::reconciler::Reconciler`].

use crate::context::ApplyContext;
use crate::diff::DiffRules;
use crate::types::{DeletePolicy, Snapshot};
use flowkit::{IdShape, ResourceId, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Core trait for remote resource kinds
///
/// # Example
///
/// ```ignore
/// impl ResourceKind for Robots {
///     type Inputs = RobotsInputs;
///     type Outputs = RobotsOutputs;
///
///     fn type_name(&self) -> &'static str { "robots_txt" }
///     fn shape(&self) -> IdShape {
///         IdShape::Singleton { parent: "siteId", suffix: "robots.txt" }
///     }
///     // ...
/// }
/// ```
pub trait ResourceKind: Send + Sync {
    /// User-declared configuration
    type Inputs: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync;
    /// Server-populated fields
    type Outputs: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync;

    /// Kind name used in manifests and state (e.g. "redirect")
    fn type_name(&self) -> &'static str;

    /// Identity layout
    fn shape(&self) -> IdShape;

    /// How inputs are compared
    fn diff_rules(&self) -> DiffRules;

    /// Pre-flight checks; must not touch the network
    fn validate(&self, inputs: &Self::Inputs) -> Result<()>;

    /// Parent segment of the identity (site, collection or page ID)
    fn parent(&self, inputs: &Self::Inputs) -> String;

    /// Human-readable description for progress output
    fn describe(&self, inputs: &Self::Inputs) -> String {
        format!("{} under {}", self.type_name(), self.parent(inputs))
    }

    /// Server fields a dry-run create reports, computed without network access
    fn preview(&self, inputs: &Self::Inputs, created_on: &str) -> Self::Outputs;

    /// Create the remote object
    fn create(&self, ctx: &ApplyContext, inputs: &Self::Inputs)
    -> Result<(ResourceId, Self::Outputs)>;

    /// Fetch the remote object
    ///
    /// Returns an [`flowkit::Error::NotFound`] error when it no longer exists.
    /// `prior` supplies last-known values for fields the API cannot project
    /// and for server fields it does not report.
    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<Self::Inputs, Self::Outputs>,
    ) -> Result<(Self::Inputs, Self::Outputs)>;

    /// Update mutable fields in place
    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &Self::Inputs,
        prior: &Self::Outputs,
    ) -> Result<Self::Outputs>;

    /// Delete the remote object; a missing object is not an error
    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()>;

    /// What delete means for this kind
    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::Remote
    }
}
