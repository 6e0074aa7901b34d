//! The per-resource lifecycle, implemented once for every kind.
//!
//! ```text
//! absent --create--> present --update*--> present --delete--> absent
//!                       |
//!                       +--read (not found)--> absent
//! ```
//!
//! Validation and identity decoding always run before any network call.
//! Dry-run creates synthesize a deterministic identity from the inputs, so
//! two previews of the same configuration are byte-identical.

use crate::context::ApplyContext;
use crate::diff::{self, DiffOutcome};
use crate::resource::ResourceKind;
use crate::types::{DeletePolicy, PREVIEW_TIMESTAMP, Snapshot};
use flowkit::validate::{PREVIEW_DIGEST_LEN, PREVIEW_PREFIX, is_preview_id};
use flowkit::{Error, IdShape, ResourceId, Result};
use log::{debug, info};
use serde_json::Value;

/// Typed snapshot for a kind.
pub type KindSnapshot<K> = Snapshot<<K as ResourceKind>::Inputs, <K as ResourceKind>::Outputs>;

/// Drives one resource kind through its lifecycle.
pub struct Reconciler<K> {
    kind: K,
}

impl<K: ResourceKind> Reconciler<K> {
    /// Wrap a kind descriptor
    pub fn new(kind: K) -> Self {
        Self { kind }
    }

    /// The wrapped kind
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Compare tracked inputs with desired inputs
    pub fn diff(&self, observed: &K::Inputs, desired: &K::Inputs) -> Result<DiffOutcome> {
        Ok(diff::compute(
            &self.kind.diff_rules(),
            &serde_json::to_value(observed)?,
            &serde_json::to_value(desired)?,
        ))
    }

    /// Create the resource, or preview it in dry-run mode
    pub fn create(&self, ctx: &ApplyContext, desired: &K::Inputs) -> Result<KindSnapshot<K>> {
        self.kind.validate(desired)?;

        if ctx.dry_run {
            let id = self.kind.shape().encode(&self.preview_identity(desired)?)?;
            preview_log(ctx, format_args!("would create {} {id}", self.kind.type_name()));
            return Ok(Snapshot {
                id,
                inputs: desired.clone(),
                outputs: self.kind.preview(desired, PREVIEW_TIMESTAMP),
            });
        }

        reject_placeholders(&serde_json::to_value(desired)?, "")?;
        let (id, outputs) = self.kind.create(ctx, desired)?;
        let id = self.kind.shape().encode(&id)?;
        info!("Created {} {id}", self.kind.type_name());
        Ok(Snapshot {
            id,
            inputs: desired.clone(),
            outputs,
        })
    }

    /// Refresh a tracked resource; `None` means it no longer exists
    pub fn read(
        &self,
        ctx: &ApplyContext,
        current: &KindSnapshot<K>,
    ) -> Result<Option<KindSnapshot<K>>> {
        let id = self.kind.shape().decode(&current.id)?;
        match self.kind.read(ctx, &id, current) {
            Ok((inputs, outputs)) => Ok(Some(Snapshot {
                id: current.id.clone(),
                inputs,
                outputs,
            })),
            Err(err) if err.is_not_found() => {
                info!(
                    "{} {} no longer exists remotely",
                    self.kind.type_name(),
                    current.id
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Update mutable fields; identity-bearing changes are rejected
    pub fn update(
        &self,
        ctx: &ApplyContext,
        current: &KindSnapshot<K>,
        desired: &K::Inputs,
    ) -> Result<KindSnapshot<K>> {
        self.kind.validate(desired)?;
        let id = self.kind.shape().decode(&current.id)?;

        if let DiffOutcome::Replace { fields } = self.diff(&current.inputs, desired)? {
            let names = fields.join(", ");
            return Err(Error::validation(
                names.clone(),
                format!(
                    "{names} cannot be changed in place on {} {}; the resource must be \
                     replaced (deleted and created again)",
                    self.kind.type_name(),
                    current.id
                ),
            ));
        }

        if ctx.dry_run {
            preview_log(
                ctx,
                format_args!("would update {} {}", self.kind.type_name(), current.id),
            );
            return Ok(Snapshot {
                id: current.id.clone(),
                inputs: desired.clone(),
                outputs: current.outputs.clone(),
            });
        }

        reject_placeholders(&serde_json::to_value(desired)?, "")?;
        let outputs = self.kind.update(ctx, &id, desired, &current.outputs)?;
        info!("Updated {} {}", self.kind.type_name(), current.id);
        Ok(Snapshot {
            id: current.id.clone(),
            inputs: desired.clone(),
            outputs,
        })
    }

    /// Delete the resource; already-gone counts as success
    pub fn delete(&self, ctx: &ApplyContext, id: &str) -> Result<()> {
        let decoded = self.kind.shape().decode(id)?;

        if self.kind.delete_policy() == DeletePolicy::Untrack {
            info!(
                "{} {id} has no remote delete; removing it from state only",
                self.kind.type_name()
            );
            return Ok(());
        }
        if ctx.dry_run {
            preview_log(ctx, format_args!("would delete {} {id}", self.kind.type_name()));
            return Ok(());
        }

        match self.kind.delete(ctx, &decoded) {
            Err(err) if !err.is_not_found() => Err(err),
            _ => {
                info!("Deleted {} {id}", self.kind.type_name());
                Ok(())
            }
        }
    }

    fn preview_identity(&self, inputs: &K::Inputs) -> Result<ResourceId> {
        let parent = self.kind.parent(inputs);
        match self.kind.shape() {
            IdShape::Singleton { .. } => Ok(ResourceId::singleton(parent)),
            IdShape::Child { .. } => {
                let hash = blake3::hash(&serde_json::to_vec(inputs)?);
                let hex = hash.to_hex();
                let digest = &hex.as_str()[..PREVIEW_DIGEST_LEN];
                Ok(ResourceId::child(parent, format!("{PREVIEW_PREFIX}{digest}")))
            }
        }
    }
}

/// Fail if a live write would send an identity minted by a dry-run preview.
fn reject_placeholders(value: &Value, field: &str) -> Result<()> {
    match value {
        Value::String(text) if is_preview_id(text) => Err(Error::validation(
            field,
            format!(
                "{field} refers to '{text}', a placeholder from a dry-run preview. \
                 Apply the resource it stands for first and use its real ID"
            ),
        )),
        Value::Object(map) => map.iter().try_for_each(|(key, item)| {
            let nested = if field.is_empty() {
                key.clone()
            } else {
                format!("{field}.{key}")
            };
            reject_placeholders(item, &nested)
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| reject_placeholders(item, &format!("{field}[{index}]"))),
        _ => Ok(()),
    }
}

/// Dry-run previews are surfaced at info level when the host asked for verbose output
fn preview_log(ctx: &ApplyContext, message: std::fmt::Arguments<'_>) {
    if ctx.verbose {
        info!("dry-run: {message}");
    } else {
        debug!("dry-run: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Note, PARENT, context, note};
    use flowkit::transport::MockTransport;
    use flowkit::{ErrorCategory, Method, RawResponse};
    use serde_json::json;

    fn created(mock: &MockTransport) {
        mock.respond_json(
            Method::Post,
            format!("/v2/parents/{PARENT}/notes"),
            201,
            &json!({"id": "n1", "createdOn": "2024-05-01T10:00:00Z"}),
        );
    }

    #[test]
    fn test_dry_run_create_is_deterministic_and_offline() {
        let mock = MockTransport::new();
        let ctx = context(&mock, true);
        let reconciler = Reconciler::new(Note::new());

        let first = reconciler.create(&ctx, &note("hello")).unwrap();
        let second = reconciler.create(&ctx, &note("hello")).unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.request_count(), 0);
        assert!(first.id.starts_with(&format!("{PARENT}/notes/preview-")));
        assert_eq!(first.outputs.created_on, PREVIEW_TIMESTAMP);
        assert_eq!(
            serde_json::to_vec(&first.outputs).unwrap(),
            serde_json::to_vec(&second.outputs).unwrap()
        );
    }

    #[test]
    fn test_dry_run_identity_depends_on_inputs() {
        let mock = MockTransport::new();
        let ctx = context(&mock, true);
        let reconciler = Reconciler::new(Note::new());

        let a = reconciler.create(&ctx, &note("a")).unwrap();
        let b = reconciler.create(&ctx, &note("b")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_validation_runs_before_network() {
        let mock = MockTransport::new();
        let ctx = context(&mock, false);
        let reconciler = Reconciler::new(Note::new());

        let mut inputs = note("x");
        inputs.parent_id = "not-hex".into();
        let err = reconciler.create(&ctx, &inputs).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_placeholder_parent_only_allowed_in_dry_run() {
        let mock = MockTransport::new();
        let reconciler = Reconciler::new(Note::new());
        let mut inputs = note("child");
        inputs.parent_id = "preview-0123456789abcdef".into();

        let preview = reconciler.create(&context(&mock, true), &inputs).unwrap();
        assert!(preview.id.starts_with("preview-0123456789abcdef/notes/"));

        let err = reconciler
            .create(&context(&mock, false), &inputs)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("parentId"));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_path_like_placeholder_never_reaches_the_wire() {
        let mock = MockTransport::new();
        let mut inputs = note("x");
        inputs.parent_id = "preview-../../token/introspect?x=".into();

        let err = Reconciler::new(Note::new())
            .create(&context(&mock, false), &inputs)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_create_encodes_identity() {
        let mock = MockTransport::new();
        created(&mock);
        let ctx = context(&mock, false);

        let snapshot = Reconciler::new(Note::new())
            .create(&ctx, &note("hello"))
            .unwrap();

        assert_eq!(snapshot.id, format!("{PARENT}/notes/n1"));
        assert_eq!(snapshot.outputs.created_on, "2024-05-01T10:00:00Z");
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_read_missing_is_absent() {
        let mock = MockTransport::new();
        let ctx = context(&mock, false);
        let current = Snapshot {
            id: format!("{PARENT}/notes/gone"),
            inputs: note("x"),
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };

        let observed = Reconciler::new(Note::new()).read(&ctx, &current).unwrap();
        assert!(observed.is_none());
    }

    #[test]
    fn test_read_other_errors_propagate() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "/v2/notes/n1", RawResponse::new(500, "oops"));
        let ctx = context(&mock, false);
        let current = Snapshot {
            id: format!("{PARENT}/notes/n1"),
            inputs: note("x"),
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };

        let err = Reconciler::new(Note::new()).read(&ctx, &current).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ServerError);
    }

    #[test]
    fn test_read_keeps_fields_the_api_omits() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            "/v2/notes/n1",
            200,
            &json!({"title": "remote title", "createdOn": "2024-01-01T00:00:00Z"}),
        );
        let ctx = context(&mock, false);
        let mut inputs = note("x");
        inputs.tags = vec!["kept".into()];
        let current = Snapshot {
            id: format!("{PARENT}/notes/n1"),
            inputs,
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };

        let observed = Reconciler::new(Note::new())
            .read(&ctx, &current)
            .unwrap()
            .unwrap();
        assert_eq!(observed.inputs.title, "remote title");
        assert_eq!(observed.inputs.tags, vec!["kept".to_string()]);
    }

    #[test]
    fn test_malformed_identity_rejected_before_network() {
        let mock = MockTransport::new();
        let ctx = context(&mock, false);
        let current = Snapshot {
            id: format!("{PARENT}/webhooks/n1"),
            inputs: note("x"),
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };

        let err = Reconciler::new(Note::new()).read(&ctx, &current).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidIdentity);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_update_rejects_identity_change() {
        let mock = MockTransport::new();
        let ctx = context(&mock, false);
        let current = Snapshot {
            id: format!("{PARENT}/notes/n1"),
            inputs: note("x"),
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };
        let mut desired = note("x");
        desired.parent_id = "aaaaaaaaaaaaaaaaaaaaaaaa".into();

        let err = Reconciler::new(Note::new())
            .update(&ctx, &current, &desired)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("parentId"));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_update_in_place() {
        let mock = MockTransport::new();
        mock.respond_json(Method::Patch, "/v2/notes/n1", 200, &json!({}));
        let ctx = context(&mock, false);
        let current = Snapshot {
            id: format!("{PARENT}/notes/n1"),
            inputs: note("x"),
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };

        let updated = Reconciler::new(Note::new())
            .update(&ctx, &current, &note("y"))
            .unwrap();
        assert_eq!(updated.id, current.id);
        assert_eq!(updated.inputs.title, "y");
        assert_eq!(mock.requests()[0].method, Method::Patch);
    }

    #[test]
    fn test_update_missing_is_error() {
        let mock = MockTransport::new();
        let ctx = context(&mock, false);
        let current = Snapshot {
            id: format!("{PARENT}/notes/n1"),
            inputs: note("x"),
            outputs: Note::new().preview(&note("x"), PREVIEW_TIMESTAMP),
        };

        let err = Reconciler::new(Note::new())
            .update(&ctx, &current, &note("y"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mock = MockTransport::new();
        mock.respond(Method::Delete, "/v2/notes/n1", RawResponse::new(204, ""));
        mock.respond(Method::Delete, "/v2/notes/n1", RawResponse::new(404, ""));
        let ctx = context(&mock, false);
        let reconciler = Reconciler::new(Note::new());
        let id = format!("{PARENT}/notes/n1");

        reconciler.delete(&ctx, &id).unwrap();
        reconciler.delete(&ctx, &id).unwrap();
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_untrack_policy_skips_network() {
        let mock = MockTransport::new();
        let ctx = context(&mock, false);
        let reconciler = Reconciler::new(Note {
            policy: DeletePolicy::Untrack,
        });

        reconciler.delete(&ctx, &format!("{PARENT}/notes/n1")).unwrap();
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_diff_outcomes() {
        let reconciler = Reconciler::new(Note::new());
        assert_eq!(
            reconciler.diff(&note("a"), &note("a")).unwrap(),
            DiffOutcome::NoChange
        );
        assert!(matches!(
            reconciler.diff(&note("a"), &note("b")).unwrap(),
            DiffOutcome::Update { .. }
        ));
    }
}
