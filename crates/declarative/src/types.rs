//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder timestamp recorded by dry-run creates.
pub const PREVIEW_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

/// What happens when a tracked resource is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletePolicy {
    /// Delete the remote object
    #[default]
    Remote,
    /// Stop tracking it; the remote object is left as-is
    Untrack,
}

/// Persisted record for one tracked resource.
///
/// This is exactly what the state file stores per resource name; the engine
/// reads and writes it whole and never keeps it across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Resource kind name (e.g. "redirect")
    pub kind: String,
    /// Encoded identity
    pub id: String,
    /// Inputs last applied (or observed by refresh)
    pub inputs: Value,
    /// Server-populated fields
    pub outputs: Value,
}

/// Tracked resources keyed by their declared name.
pub type TrackedState = BTreeMap<String, StateRecord>;

/// A resource as declared by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredResource {
    /// Unique name within the manifest
    pub name: String,
    /// Resource kind name
    pub kind: String,
    /// Kind-specific inputs
    #[serde(default)]
    pub inputs: Value,
}

/// Typed snapshot of a resource: identity, inputs and server fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<I, O> {
    /// Encoded identity
    pub id: String,
    /// Inputs
    pub inputs: I,
    /// Server-populated fields
    pub outputs: O,
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was deleted and created again
    Replaced,
    /// Resource was removed (or untracked)
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.replaced += other.replaced;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Replaced);
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ExecuteSummary {
            created: 1,
            ..Default::default()
        };
        let b = ExecuteSummary {
            removed: 2,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.total_changes(), 3);
    }

    #[test]
    fn test_state_record_serializes_flat() {
        let record = StateRecord {
            kind: "redirect".into(),
            id: "site/redirects/abc".into(),
            inputs: json!({"sourcePath": "/a"}),
            outputs: json!({"createdOn": PREVIEW_TIMESTAMP}),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "redirect");
        assert_eq!(value["inputs"]["sourcePath"], "/a");
    }

    #[test]
    fn test_desired_resource_defaults_inputs() {
        let desired: DesiredResource =
            serde_json::from_value(json!({"name": "r", "kind": "redirect"})).unwrap();
        assert!(desired.inputs.is_null());
    }
}
