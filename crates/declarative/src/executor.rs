//! Execution engine - applies a plan step by step and refreshes tracked state

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::planner::{Action, Plan, Step};
use crate::registry::Registry;
use crate::types::{ApplyResult, ExecuteSummary, StateRecord, TrackedState};
use anyhow::Result;
use flowkit::Error;
use log::warn;
use rayon::prelude::*;
use serde_json::Value;

/// Execute a plan against the remote API
///
/// Steps run sequentially in plan order. A failed step only affects its own
/// resource; the run continues with the next step. After every step that
/// changed `state` the progress callback gets a checkpoint, so the host can
/// persist it. A replace checkpoints twice: once after the delete half.
///
/// In dry-run mode nothing is confirmed, no remote writes happen, `state` is
/// left untouched and no checkpoints are emitted.
///
/// # Errors
/// Only confirmation and checkpoint failures abort the run; resource
/// failures are reported in the summary.
pub fn execute<P, C>(
    plan: &Plan,
    registry: &Registry,
    ctx: &ApplyContext,
    state: &mut TrackedState,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total_changes = plan.changes().count();
    let mut summary = ExecuteSummary {
        no_change: plan.steps.len() - total_changes,
        ..Default::default()
    };

    if total_changes == 0 {
        return Ok(summary);
    }

    // Confirm before proceeding (unless dry_run)
    if !ctx.dry_run && !confirm.confirm(&format!("Apply {total_changes} change(s)?"))? {
        summary.skipped = total_changes;
        return Ok(summary);
    }

    let mut scratch;
    let state: &mut TrackedState = if ctx.dry_run {
        scratch = state.clone();
        &mut scratch
    } else {
        state
    };

    for step in plan.changes() {
        progress.on_resource_start(&step.name, &step.description);

        let result = if ctx.cancel.is_cancelled() {
            ApplyResult::Skipped {
                reason: "run was cancelled".to_string(),
            }
        } else {
            match apply_step(step, registry, ctx, state, progress)? {
                Ok(result) => result,
                Err(err) => {
                    warn!("{} ({}): {err}", step.name, step.action);
                    ApplyResult::Failed {
                        error: err.to_string(),
                    }
                }
            }
        };

        if result.is_change() {
            checkpoint(ctx, state, progress)?;
        }
        progress.on_resource_complete(&step.name, &result);
        summary.add_result(&result);
    }

    Ok(summary)
}

/// Apply one step; the outer error is a checkpoint failure
fn apply_step<P: ProgressCallback>(
    step: &Step,
    registry: &Registry,
    ctx: &ApplyContext,
    state: &mut TrackedState,
    progress: &mut P,
) -> Result<flowkit::Result<ApplyResult>> {
    let outcome = match &step.action {
        Action::NoChange => Ok(ApplyResult::NoChange),
        Action::Create => create(step, registry, ctx, state).map(|()| ApplyResult::Created),
        Action::Update { .. } => update(step, registry, ctx, state).map(|()| ApplyResult::Modified),
        Action::Delete => remove(step, registry, ctx, state).map(|()| ApplyResult::Removed),
        Action::Replace { .. } => match remove(step, registry, ctx, state) {
            Ok(()) => {
                checkpoint(ctx, state, progress)?;
                create(step, registry, ctx, state).map(|()| ApplyResult::Replaced)
            }
            Err(err) => Err(err),
        },
    };
    Ok(outcome)
}

fn create(
    step: &Step,
    registry: &Registry,
    ctx: &ApplyContext,
    state: &mut TrackedState,
) -> flowkit::Result<()> {
    let record = registry.get(&step.kind)?.create(ctx, desired(step)?)?;
    state.insert(step.name.clone(), record);
    Ok(())
}

fn update(
    step: &Step,
    registry: &Registry,
    ctx: &ApplyContext,
    state: &mut TrackedState,
) -> flowkit::Result<()> {
    let record = registry
        .get(&step.kind)?
        .update(ctx, tracked(step)?, desired(step)?)?;
    state.insert(step.name.clone(), record);
    Ok(())
}

fn remove(
    step: &Step,
    registry: &Registry,
    ctx: &ApplyContext,
    state: &mut TrackedState,
) -> flowkit::Result<()> {
    let record = tracked(step)?;
    registry.get(&record.kind)?.delete(ctx, record)?;
    state.remove(&step.name);
    Ok(())
}

fn desired(step: &Step) -> flowkit::Result<&Value> {
    step.desired.as_ref().ok_or_else(|| {
        Error::validation(
            step.name.clone(),
            format!("{} has no declared inputs", step.name),
        )
    })
}

fn tracked(step: &Step) -> flowkit::Result<&StateRecord> {
    step.tracked
        .as_ref()
        .ok_or_else(|| Error::not_found(format!("tracked state for {}", step.name)))
}

fn checkpoint<P: ProgressCallback>(
    ctx: &ApplyContext,
    state: &TrackedState,
    progress: &mut P,
) -> Result<()> {
    if ctx.dry_run {
        return Ok(());
    }
    progress.on_checkpoint(state)
}

// ============================================================================
// Refresh
// ============================================================================

/// What a refresh found for one tracked resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Remote matches the tracked inputs
    Unchanged,
    /// Remote differs; the state now holds the observed values
    Drifted { fields: Vec<String> },
    /// Remote object no longer exists; dropped from state
    Gone,
    /// Read failed; the tracked record is kept as-is
    Failed { error: String },
}

/// Result of refreshing every tracked resource
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// Refreshed state
    pub state: TrackedState,
    /// Outcome per resource name, sorted by name
    pub outcomes: Vec<(String, RefreshOutcome)>,
}

impl RefreshReport {
    /// Number of resources whose read failed
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, RefreshOutcome::Failed { .. }))
    }

    /// Number of resources that drifted
    pub fn drifted(&self) -> usize {
        self.count(|outcome| matches!(outcome, RefreshOutcome::Drifted { .. }))
    }

    /// Number of resources that disappeared remotely
    pub fn gone(&self) -> usize {
        self.count(|outcome| matches!(outcome, RefreshOutcome::Gone))
    }

    /// Check if every read succeeded
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&RefreshOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| pred(outcome)).count()
    }
}

/// Read every tracked resource in parallel and build the refreshed state
///
/// Reads are independent, so they run on a dedicated pool of `jobs` threads.
pub fn refresh(
    state: &TrackedState,
    registry: &Registry,
    ctx: &ApplyContext,
    jobs: usize,
) -> Result<RefreshReport> {
    let entries: Vec<(&String, &StateRecord)> = state.iter().collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    let results: Vec<(String, flowkit::Result<Option<StateRecord>>)> = pool.install(|| {
        entries
            .par_iter()
            .map(|(name, record)| {
                let refreshed = registry
                    .get(&record.kind)
                    .and_then(|kind| kind.read(ctx, record));
                ((*name).clone(), refreshed)
            })
            .collect()
    });

    let mut report = RefreshReport::default();
    for (name, result) in results {
        let Some(old) = state.get(&name) else {
            continue;
        };
        let outcome = match result {
            Ok(Some(new)) => {
                let fields = drift(registry, old, &new);
                report.state.insert(name.clone(), new);
                if fields.is_empty() {
                    RefreshOutcome::Unchanged
                } else {
                    RefreshOutcome::Drifted { fields }
                }
            }
            Ok(None) => RefreshOutcome::Gone,
            Err(err) => {
                warn!("Failed to refresh {name}: {err}");
                report.state.insert(name.clone(), old.clone());
                RefreshOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        report.outcomes.push((name, outcome));
    }

    Ok(report)
}

fn drift(registry: &Registry, old: &StateRecord, new: &StateRecord) -> Vec<String> {
    registry
        .get(&old.kind)
        .and_then(|kind| kind.diff(old, &new.inputs))
        .map(|outcome| outcome.fields().to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::planner;
    use crate::testing::{Note, PARENT, context};
    use crate::types::DesiredResource;
    use flowkit::transport::MockTransport;
    use flowkit::{Method, RawResponse};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: Vec<(String, ApplyResult)>,
        checkpoints: Vec<TrackedState>,
    }

    impl ProgressCallback for Recorder {
        fn on_resource_start(&mut self, name: &str, _description: &str) {
            self.started.push(name.to_string());
        }

        fn on_resource_complete(&mut self, name: &str, result: &ApplyResult) {
            self.completed.push((name.to_string(), result.clone()));
        }

        fn on_checkpoint(&mut self, state: &TrackedState) -> Result<()> {
            self.checkpoints.push(state.clone());
            Ok(())
        }
    }

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

    fn record(id: &str, title: &str) -> StateRecord {
        StateRecord {
            kind: "note".into(),
            id: format!("{PARENT}/notes/{id}"),
            inputs: json!({"parentId": PARENT, "title": title, "body": "", "tags": []}),
            outputs: json!({"createdOn": "2024-01-01T00:00:00Z"}),
        }
    }

    fn script_writes(mock: &MockTransport) {
        mock.respond_json(
            Method::Post,
            format!("/v2/parents/{PARENT}/notes"),
            201,
            &json!({"id": "n-new", "createdOn": "2024-05-01T10:00:00Z"}),
        );
        mock.respond_json(Method::Patch, "/v2/notes/n-upd", 200, &json!({}));
        mock.respond(Method::Delete, "/v2/notes/n-old", RawResponse::new(204, ""));
    }

    fn starting_state() -> TrackedState {
        [
            ("same".to_string(), record("n-same", "s")),
            ("upd".to_string(), record("n-upd", "before")),
            ("old".to_string(), record("n-old", "o")),
        ]
        .into_iter()
        .collect()
    }

    fn manifest() -> Vec<DesiredResource> {
        vec![
            declared("fresh", "f"),
            declared("same", "s"),
            declared("upd", "after"),
        ]
    }

    #[test]
    fn test_execute_applies_every_action() {
        let mock = MockTransport::new();
        script_writes(&mock);
        let registry = registry();
        let mut state = starting_state();
        let plan = planner::plan(&manifest(), &state, &registry).unwrap();
        let mut recorder = Recorder::default();

        let summary = execute(
            &plan,
            &registry,
            &context(&mock, false),
            &mut state,
            &mut recorder,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.no_change, 1);
        assert!(summary.is_success());

        assert_eq!(state["fresh"].id, format!("{PARENT}/notes/n-new"));
        assert_eq!(state["upd"].inputs["title"], "after");
        assert!(!state.contains_key("old"));
        assert_eq!(recorder.checkpoints.len(), 3);
        assert_eq!(recorder.checkpoints.last(), Some(&state));
        assert_eq!(recorder.started, vec!["fresh", "upd", "old"]);
    }

    #[test]
    fn test_dry_run_is_pure() {
        let mock = MockTransport::new();
        let registry = registry();
        let mut state = starting_state();
        let before = state.clone();
        let plan = planner::plan(&manifest(), &state, &registry).unwrap();
        let mut recorder = Recorder::default();

        let summary = execute(
            &plan,
            &registry,
            &context(&mock, true),
            &mut state,
            &mut recorder,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.total_changes(), 3);
        assert_eq!(mock.request_count(), 0);
        assert_eq!(state, before);
        assert!(recorder.checkpoints.is_empty());
    }

    #[test]
    fn test_declined_confirmation_skips_changes() {
        let mock = MockTransport::new();
        let registry = registry();
        let mut state = starting_state();
        let plan = planner::plan(&manifest(), &state, &registry).unwrap();

        let summary = execute(
            &plan,
            &registry,
            &context(&mock, false),
            &mut state,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.total_changes(), 0);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_failure_only_affects_its_resource() {
        let mock = MockTransport::new();
        script_writes(&mock);
        mock.respond_json(
            Method::Patch,
            "/v2/notes/n-upd",
            500,
            &json!({"message": "internal"}),
        );
        let registry = registry();
        let mut state = starting_state();
        let plan = planner::plan(&manifest(), &state, &registry).unwrap();

        let summary = execute(
            &plan,
            &registry,
            &context(&mock, false),
            &mut state,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(state["upd"].inputs["title"], "before");
    }

    #[test]
    fn test_replace_checkpoints_after_delete() {
        let mock = MockTransport::new();
        mock.respond(Method::Delete, "/v2/notes/n-old", RawResponse::new(204, ""));
        mock.respond_json(
            Method::Post,
            format!("/v2/parents/{PARENT}/notes"),
            400,
            &json!({"message": "bad title"}),
        );
        let registry = registry();
        let mut state: TrackedState = [(
            "a".to_string(),
            StateRecord {
                kind: "other".into(),
                ..record("n-old", "t")
            },
        )]
        .into_iter()
        .collect();
        let plan = planner::plan(&[declared("a", "t")], &state, &registry).unwrap();
        let mut recorder = Recorder::default();

        // the tracked kind is unknown, so even the delete half fails
        let summary = execute(
            &plan,
            &registry,
            &context(&mock, false),
            &mut state,
            &mut recorder,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(summary.failed, 1);
        assert!(state.contains_key("a"));

        let mut state: TrackedState =
            [("a".to_string(), record("n-old", "t"))].into_iter().collect();
        let mut desired = declared("a", "t");
        desired.inputs["parentId"] = json!("aaaaaaaaaaaaaaaaaaaaaaaa");
        let plan = planner::plan(&[desired], &state, &registry).unwrap();

        let summary = execute(
            &plan,
            &registry,
            &context(&mock, false),
            &mut state,
            &mut recorder,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(state.is_empty());
        assert_eq!(recorder.checkpoints.len(), 1);
        assert!(recorder.checkpoints[0].is_empty());
    }

    #[test]
    fn test_cancelled_run_skips_remaining_steps() {
        let mock = MockTransport::new();
        let registry = registry();
        let mut state = starting_state();
        let plan = planner::plan(&manifest(), &state, &registry).unwrap();
        let ctx = context(&mock, false);
        ctx.cancel.cancel();

        let summary = execute(
            &plan,
            &registry,
            &ctx,
            &mut state,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_refresh_classifies_outcomes() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            "/v2/notes/n-same",
            200,
            &json!({"title": "s", "body": "", "createdOn": "2024-01-01T00:00:00Z"}),
        );
        mock.respond_json(
            Method::Get,
            "/v2/notes/n-upd",
            200,
            &json!({"title": "edited", "body": "", "createdOn": "2024-01-01T00:00:00Z"}),
        );
        mock.respond_json(Method::Get, "/v2/notes/n-bad", 500, &json!({"message": "x"}));
        // n-old is unscripted, so the mock answers 404

        let mut state = starting_state();
        state.insert("bad".to_string(), record("n-bad", "b"));

        let report = refresh(&state, &registry(), &context(&mock, false), 2).unwrap();
        let outcomes: std::collections::BTreeMap<_, _> = report.outcomes.iter().cloned().collect();

        assert_eq!(outcomes["same"], RefreshOutcome::Unchanged);
        assert_eq!(
            outcomes["upd"],
            RefreshOutcome::Drifted {
                fields: vec!["title".into()]
            }
        );
        assert_eq!(outcomes["old"], RefreshOutcome::Gone);
        assert!(matches!(outcomes["bad"], RefreshOutcome::Failed { .. }));

        assert_eq!(report.state["upd"].inputs["title"], "edited");
        assert_eq!(report.state["bad"], state["bad"]);
        assert!(!report.state.contains_key("old"));
        assert_eq!((report.drifted(), report.gone(), report.failed()), (1, 1, 1));
        assert!(!report.is_success());
    }
}
