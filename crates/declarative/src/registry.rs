//! Type-erased reconcilers addressable by kind name.
//!
//! Hosts work with JSON inputs and [`StateRecord`]s; the registry converts
//! them to each kind's typed inputs and outputs at the boundary.

use crate::context::ApplyContext;
use crate::diff::DiffOutcome;
use crate::reconciler::{KindSnapshot, Reconciler};
use crate::resource::ResourceKind;
use crate::types::{DeletePolicy, Snapshot, StateRecord};
use flowkit::{Error, IdShape, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Object-safe view of a [`Reconciler`].
pub trait DynReconciler: Send + Sync {
    /// Kind name
    fn type_name(&self) -> &'static str;

    /// Identity shape
    fn shape(&self) -> IdShape;

    /// What deleting a tracked resource of this kind does
    fn delete_policy(&self) -> DeletePolicy;

    /// Validate JSON inputs without touching the network
    fn validate(&self, inputs: &Value) -> Result<()>;

    /// Human-readable description of the inputs
    fn describe(&self, inputs: &Value) -> String;

    /// Compare a tracked record with desired inputs
    fn diff(&self, record: &StateRecord, desired: &Value) -> Result<DiffOutcome>;

    /// Create (or preview) a resource
    fn create(&self, ctx: &ApplyContext, inputs: &Value) -> Result<StateRecord>;

    /// Refresh a record; `None` if it no longer exists
    fn read(&self, ctx: &ApplyContext, record: &StateRecord) -> Result<Option<StateRecord>>;

    /// Update a record in place
    fn update(&self, ctx: &ApplyContext, record: &StateRecord, desired: &Value)
    -> Result<StateRecord>;

    /// Delete a record's remote object
    fn delete(&self, ctx: &ApplyContext, record: &StateRecord) -> Result<()>;
}

impl<K: ResourceKind> Reconciler<K> {
    fn inputs(&self, value: &Value) -> Result<K::Inputs> {
        decode_inputs(self.kind().type_name(), value)
    }

    fn snapshot(&self, record: &StateRecord) -> Result<KindSnapshot<K>> {
        let outputs = serde_json::from_value(record.outputs.clone()).map_err(|err| {
            Error::Decode {
                message: format!("tracked outputs for {} are unreadable: {err}", record.id),
            }
        })?;
        Ok(Snapshot {
            id: record.id.clone(),
            inputs: self.inputs(&record.inputs)?,
            outputs,
        })
    }

    fn record(&self, snapshot: &KindSnapshot<K>) -> Result<StateRecord> {
        Ok(StateRecord {
            kind: self.kind().type_name().to_string(),
            id: snapshot.id.clone(),
            inputs: serde_json::to_value(&snapshot.inputs)?,
            outputs: serde_json::to_value(&snapshot.outputs)?,
        })
    }
}

fn decode_inputs<T: DeserializeOwned>(kind: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|err| Error::validation("inputs", format!("invalid {kind} inputs: {err}")))
}

impl<K: ResourceKind> DynReconciler for Reconciler<K> {
    fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    fn shape(&self) -> IdShape {
        self.kind().shape()
    }

    fn delete_policy(&self) -> DeletePolicy {
        self.kind().delete_policy()
    }

    fn validate(&self, inputs: &Value) -> Result<()> {
        self.kind().validate(&self.inputs(inputs)?)
    }

    fn describe(&self, inputs: &Value) -> String {
        match self.inputs(inputs) {
            Ok(typed) => self.kind().describe(&typed),
            Err(_) => self.kind().type_name().to_string(),
        }
    }

    fn diff(&self, record: &StateRecord, desired: &Value) -> Result<DiffOutcome> {
        Reconciler::diff(self, &self.inputs(&record.inputs)?, &self.inputs(desired)?)
    }

    fn create(&self, ctx: &ApplyContext, inputs: &Value) -> Result<StateRecord> {
        let snapshot = Reconciler::create(self, ctx, &self.inputs(inputs)?)?;
        self.record(&snapshot)
    }

    fn read(&self, ctx: &ApplyContext, record: &StateRecord) -> Result<Option<StateRecord>> {
        let current = self.snapshot(record)?;
        Reconciler::read(self, ctx, &current)?
            .map(|snapshot| self.record(&snapshot))
            .transpose()
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        record: &StateRecord,
        desired: &Value,
    ) -> Result<StateRecord> {
        let current = self.snapshot(record)?;
        let updated = Reconciler::update(self, ctx, &current, &self.inputs(desired)?)?;
        self.record(&updated)
    }

    fn delete(&self, ctx: &ApplyContext, record: &StateRecord) -> Result<()> {
        Reconciler::delete(self, ctx, &record.id)
    }
}

/// Registered kinds, by name.
#[derive(Default)]
pub struct Registry {
    kinds: BTreeMap<&'static str, Box<dyn DynReconciler>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind
    pub fn register<K: ResourceKind + 'static>(&mut self, kind: K) {
        let reconciler = Reconciler::new(kind);
        self.kinds
            .insert(DynReconciler::type_name(&reconciler), Box::new(reconciler));
    }

    /// Builder-style [`Registry::register`]
    pub fn with<K: ResourceKind + 'static>(mut self, kind: K) -> Self {
        self.register(kind);
        self
    }

    /// Look up a kind by name
    pub fn get(&self, name: &str) -> Result<&dyn DynReconciler> {
        self.kinds
            .get(name)
            .map(|kind| &**kind)
            .ok_or_else(|| {
                Error::validation(
                    "kind",
                    format!(
                        "unknown resource kind '{name}'. Valid kinds: {}",
                        self.names().join(", ")
                    ),
                )
            })
    }

    /// Registered kind names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.keys().copied().collect()
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if no kinds are registered
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
