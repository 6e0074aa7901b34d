//! Diff computation for resource inputs
//!
//! Inputs are compared as JSON projections, field by field. A change to any
//! replace-class field forces delete-before-create; any other change is an
//! in-place update. Missing and `null` fields are equal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-kind rules telling the diff engine how to compare inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffRules {
    /// Identity-bearing fields; a change means replacement
    pub replace: &'static [&'static str],
    /// List fields compared as maps keyed on a natural identifier: `(field, key)`
    pub keyed: &'static [(&'static str, &'static str)],
    /// List fields whose order is significant (others compare as multisets)
    pub ordered: &'static [&'static str],
    /// Fields never compared
    pub ignore: &'static [&'static str],
}

impl DiffRules {
    /// Rules for kinds whose every field is identity-bearing.
    pub const fn replace_all() -> Self {
        Self {
            replace: &["*"],
            keyed: &[],
            ordered: &[],
            ignore: &[],
        }
    }

    fn is_replace(&self, field: &str) -> bool {
        self.replace.iter().any(|f| *f == "*" || *f == field)
    }
}

/// Outcome of comparing tracked inputs with desired inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffOutcome {
    /// Nothing to do
    NoChange,
    /// Change in place; lists the changed fields
    Update { fields: Vec<String> },
    /// Delete then create; lists the identity-bearing fields that changed
    Replace { fields: Vec<String> },
}

impl DiffOutcome {
    /// Check if any change is needed
    pub fn has_changes(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Changed field names (empty for no-change)
    pub fn fields(&self) -> &[String] {
        match self {
            Self::NoChange => &[],
            Self::Update { fields } | Self::Replace { fields } => fields,
        }
    }
}

/// Compare tracked inputs against desired inputs.
pub fn compute(rules: &DiffRules, observed: &Value, desired: &Value) -> DiffOutcome {
    let empty = serde_json::Map::new();
    let observed = observed.as_object().unwrap_or(&empty);
    let desired = desired.as_object().unwrap_or(&empty);

    let mut names: Vec<&String> = observed.keys().chain(desired.keys()).collect();
    names.sort();
    names.dedup();

    let mut replace = Vec::new();
    let mut update = Vec::new();
    for name in names {
        if rules.ignore.contains(&name.as_str()) {
            continue;
        }
        let before = observed.get(name).unwrap_or(&Value::Null);
        let after = desired.get(name).unwrap_or(&Value::Null);
        if field_equal(rules, name, before, after) {
            continue;
        }
        if rules.is_replace(name) {
            replace.push(name.clone());
        } else {
            update.push(name.clone());
        }
    }

    if !replace.is_empty() {
        DiffOutcome::Replace { fields: replace }
    } else if !update.is_empty() {
        DiffOutcome::Update { fields: update }
    } else {
        DiffOutcome::NoChange
    }
}

fn field_equal(rules: &DiffRules, name: &str, before: &Value, after: &Value) -> bool {
    match (before, after) {
        (Value::Array(a), Value::Array(b)) => {
            if let Some((_, key)) = rules.keyed.iter().find(|(field, _)| *field == name) {
                keyed(a, key) == keyed(b, key)
            } else if rules.ordered.contains(&name) {
                a == b
            } else {
                multiset(a) == multiset(b)
            }
        }
        (Value::Null, Value::Array(items)) | (Value::Array(items), Value::Null) => {
            items.is_empty()
        }
        _ => before == after,
    }
}

fn keyed<'a>(items: &'a [Value], key: &str) -> BTreeMap<String, &'a Value> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let natural = item
                .get(key)
                .map_or_else(|| format!("#{index}"), Value::to_string);
            (natural, item)
        })
        .collect()
}

fn multiset(items: &[Value]) -> Vec<String> {
    let mut rendered: Vec<String> = items.iter().map(Value::to_string).collect();
    rendered.sort();
    rendered
}
