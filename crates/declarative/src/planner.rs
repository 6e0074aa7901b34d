//! Execution planner - compares declared resources with tracked state

use crate::diff::DiffOutcome;
use crate::registry::Registry;
use crate::types::{DesiredResource, StateRecord, TrackedState};
use flowkit::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// What a step will do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Declared but not tracked
    Create,
    /// Tracked; mutable fields changed
    Update { fields: Vec<String> },
    /// Tracked; identity-bearing fields (or the kind) changed
    Replace { fields: Vec<String> },
    /// Tracked but no longer declared
    Delete,
    /// Tracked and unchanged
    NoChange,
}

impl Action {
    /// Check if the action changes anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Short symbol for plan output
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update { .. } => "~",
            Self::Replace { .. } => "-/+",
            Self::Delete => "-",
            Self::NoChange => " ",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update { fields } => write!(f, "update ({})", fields.join(", ")),
            Self::Replace { fields } => write!(f, "replace ({})", fields.join(", ")),
            Self::Delete => write!(f, "delete"),
            Self::NoChange => write!(f, "no change"),
        }
    }
}

/// One resource's planned action.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Declared name
    pub name: String,
    /// Kind the step ends with (the tracked kind for deletes)
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// What will happen
    pub action: Action,
    /// Desired inputs (absent for deletes)
    pub desired: Option<Value>,
    /// Tracked record (absent for creates)
    pub tracked: Option<StateRecord>,
}

/// Ordered steps: declared resources in manifest order, then deletes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    /// Steps that change something
    pub fn changes(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|step| step.action.is_change())
    }

    /// Check if any step changes something
    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Count steps by action
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for step in &self.steps {
            match step.action {
                Action::Create => summary.creates += 1,
                Action::Update { .. } => summary.updates += 1,
                Action::Replace { .. } => summary.replaces += 1,
                Action::Delete => summary.deletes += 1,
                Action::NoChange => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Keep only steps matching a target
    ///
    /// Target format: "kind" or "kind.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                Self {
                    steps: self
                        .steps
                        .into_iter()
                        .filter(|step| matches_filter(step, kind.as_deref(), name.as_deref()))
                        .collect(),
                }
            }
        }
    }
}

/// Plan statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.creates, self.updates, self.replaces, self.deletes, self.unchanged
        )
    }
}

/// Build a plan from declared resources and tracked state
///
/// Every declared resource is validated here, so local errors surface
/// before anything is applied.
pub fn plan(
    desired: &[DesiredResource],
    tracked: &TrackedState,
    registry: &Registry,
) -> Result<Plan> {
    let mut seen = BTreeSet::new();
    let mut steps = Vec::with_capacity(desired.len() + tracked.len());

    for resource in desired {
        if !seen.insert(resource.name.as_str()) {
            return Err(Error::validation(
                "name",
                format!(
                    "resource name '{}' is declared more than once; names must be unique",
                    resource.name
                ),
            ));
        }

        let kind = registry.get(&resource.kind)?;
        kind.validate(&resource.inputs).map_err(|err| prefix(&resource.name, err))?;

        let record = tracked.get(&resource.name);
        let action = match record {
            None => Action::Create,
            Some(record) if record.kind != resource.kind => Action::Replace {
                fields: vec!["kind".to_string()],
            },
            Some(record) => match kind
                .diff(record, &resource.inputs)
                .map_err(|err| prefix(&resource.name, err))?
            {
                DiffOutcome::NoChange => Action::NoChange,
                DiffOutcome::Update { fields } => Action::Update { fields },
                DiffOutcome::Replace { fields } => Action::Replace { fields },
            },
        };

        steps.push(Step {
            name: resource.name.clone(),
            kind: resource.kind.clone(),
            description: kind.describe(&resource.inputs),
            action,
            desired: Some(resource.inputs.clone()),
            tracked: record.cloned(),
        });
    }

    for (name, record) in tracked.iter().rev() {
        if seen.contains(name.as_str()) {
            continue;
        }
        steps.push(Step {
            name: name.clone(),
            kind: record.kind.clone(),
            description: record.id.clone(),
            action: Action::Delete,
            desired: None,
            tracked: Some(record.clone()),
        });
    }

    Ok(Plan { steps })
}

fn prefix(name: &str, err: Error) -> Error {
    match err {
        Error::Validation { field, message } => Error::Validation {
            field: format!("{name}.{field}"),
            message,
        },
        other => other,
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if !kind.is_empty() => (Some(kind.to_string()), Some(name.to_string())),
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a step matches the filter criteria
fn matches_filter(step: &Step, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind
        && step.kind != k
    {
        return false;
    }

    if let Some(n) = name
        && step.name != n
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Note, PARENT};
    use serde_json::json;

    fn registry() -> Registry {
        Registry::new().with(Note::new())
    }

    fn declared(name: &str, title: &str) -> DesiredResource {
        DesiredResource {
            name: name.into(),
            kind: "note".into(),
            inputs: json!({"parentId": PARENT, "title": title}),
        }
    }

    fn tracked(name: &str, title: &str) -> (String, StateRecord) {
        (
            name.to_string(),
            StateRecord {
                kind: "note".into(),
                id: format!("{PARENT}/notes/{name}"),
                inputs: json!({"parentId": PARENT, "title": title}),
                outputs: json!({"createdOn": "2024-01-01T00:00:00Z"}),
            },
        )
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("redirect"), (Some("redirect".to_string()), None));
        assert_eq!(
            parse_target("redirect.old-blog"),
            (Some("redirect".to_string()), Some("old-blog".to_string()))
        );
        assert_eq!(parse_target(".x"), (None, Some(".x".to_string())));
    }

    #[test]
    fn test_plan_actions() {
        let desired = vec![
            declared("new", "n"),
            declared("same", "s"),
            declared("changed", "after"),
        ];
        let state: TrackedState = [
            tracked("same", "s"),
            tracked("changed", "before"),
            tracked("orphan", "o"),
        ]
        .into_iter()
        .collect();

        let plan = plan(&desired, &state, &registry()).unwrap();
        let actions: Vec<(&str, &Action)> = plan
            .steps
            .iter()
            .map(|s| (s.name.as_str(), &s.action))
            .collect();

        assert_eq!(actions[0], ("new", &Action::Create));
        assert_eq!(actions[1], ("same", &Action::NoChange));
        assert_eq!(
            actions[2],
            (
                "changed",
                &Action::Update {
                    fields: vec!["title".into()]
                }
            )
        );
        assert_eq!(actions[3], ("orphan", &Action::Delete));

        let summary = plan.summary();
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.unchanged, 1);
        assert!(plan.has_changes());
    }

    #[test]
    fn test_parent_change_plans_replace() {
        let mut desired = declared("a", "t");
        desired.inputs["parentId"] = json!("aaaaaaaaaaaaaaaaaaaaaaaa");
        let state: TrackedState = [tracked("a", "t")].into_iter().collect();

        let plan = plan(&[desired], &state, &registry()).unwrap();
        assert!(matches!(plan.steps[0].action, Action::Replace { .. }));
    }

    #[test]
    fn test_kind_change_plans_replace() {
        let state: TrackedState = [(
            "a".to_string(),
            StateRecord {
                kind: "other".into(),
                ..tracked("a", "t").1
            },
        )]
        .into_iter()
        .collect();

        let plan = plan(&[declared("a", "t")], &state, &registry()).unwrap();
        assert_eq!(
            plan.steps[0].action,
            Action::Replace {
                fields: vec!["kind".into()]
            }
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let desired = vec![declared("a", "1"), declared("a", "2")];
        assert!(plan(&desired, &TrackedState::new(), &registry()).is_err());
    }

    #[test]
    fn test_validation_errors_name_the_resource() {
        let mut bad = declared("bad", "t");
        bad.inputs["parentId"] = json!("nope");
        let err = plan(&[bad], &TrackedState::new(), &registry()).unwrap_err();
        assert!(err.to_string().contains("bad.parentId"));
    }

    #[test]
    fn test_filter_by_target() {
        let desired = vec![declared("a", "1"), declared("b", "2")];
        let plan = plan(&desired, &TrackedState::new(), &registry()).unwrap();

        assert_eq!(plan.clone().filter_by_target(Some("note")).steps.len(), 2);
        assert_eq!(plan.clone().filter_by_target(Some("note.b")).steps.len(), 1);
        assert_eq!(plan.filter_by_target(Some("redirect")).steps.len(), 0);
    }
}
