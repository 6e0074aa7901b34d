//! Declarative commands
//!
//! - `plan` - Show what apply would change (local only, no API calls)
//! - `apply` - Make the remote site match the manifest
//! - `refresh` - Re-read tracked resources and record drift
//! - `destroy` - Delete every tracked resource

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{
    ApplyContext, DesiredResource, ExecuteSummary, Plan, RefreshReport, Registry, planner,
};
use flowkit::ApiClient;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, RefreshArgs, TargetArgs};
use crate::config::ProviderConfig;
use crate::engine::{
    PromptConfirm, TerminalProgress, TerminalRetry, display_plan, display_refresh, print_summary,
};
use crate::manifest::Manifest;
use crate::paths;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

// ============================================================================
// Project
// ============================================================================

/// Manifest location plus the state tracked for it
struct Project {
    manifest_path: PathBuf,
    state_path: PathBuf,
    state: StateFile,
}

impl Project {
    fn open(ctx: &Context) -> Result<Self> {
        let manifest_path = paths::expand(&ctx.manifest.to_string_lossy());
        let state_path = paths::state_file(&manifest_path, ctx.state.as_deref());
        let state = StateFile::load(&state_path)?;
        Ok(Self {
            manifest_path,
            state_path,
            state,
        })
    }

    fn desired(&self) -> Result<Vec<DesiredResource>> {
        Ok(Manifest::load(&self.manifest_path)?.resources)
    }

    fn plan(
        &self,
        desired: &[DesiredResource],
        registry: &Registry,
        target: &TargetArgs,
    ) -> Result<Plan> {
        let plan = planner::plan(desired, &self.state.resources, registry)
            .with_context(|| format!("Invalid manifest {}", self.manifest_path.display()))?;
        Ok(plan.filter_by_target(target.target.as_deref()))
    }
}

/// Build an API client from the provider config
fn connect(ctx: &Context) -> Result<ApiClient> {
    let provider = ProviderConfig::load(ctx.config.as_deref())?;
    let config = provider.to_client_config(env!("CARGO_PKG_VERSION"))?;
    log::debug!("Client config: {config:?}");
    let client = ApiClient::new(&config)?;
    Ok(client.with_retry_callback(Arc::new(TerminalRetry { quiet: ctx.quiet })))
}

// ============================================================================
// Plan Command
// ============================================================================

pub fn plan(ctx: &Context, args: &TargetArgs) -> Result<()> {
    ui::header("flowsync Plan");

    let project = Project::open(ctx)?;
    let registry = resource::registry();
    let plan = project.plan(&project.desired()?, &registry, args)?;

    display_plan(&plan, ctx.verbose > 0);

    if plan.has_changes() && !ctx.quiet {
        println!();
        ui::dim(
            "Plan is computed from tracked state; \
             run `flowsync refresh` first to pick up remote drift.",
        );
    }
    Ok(())
}

// ============================================================================
// Apply Command
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Manifest");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let mut project = Project::open(ctx)?;
    let registry = resource::registry();
    let plan = project.plan(&project.desired()?, &registry, &args.target)?;

    display_plan(&plan, ctx.verbose > 0);
    if !plan.has_changes() {
        return Ok(());
    }

    let client = connect(ctx)?;
    let summary = execute_plan(
        ctx,
        &mut project,
        &plan,
        &registry,
        client,
        args.dry_run,
        args.yes,
    )?;
    finish(&summary, args.dry_run)
}

/// Run a plan, checkpointing state after every change
fn execute_plan(
    ctx: &Context,
    project: &mut Project,
    plan: &Plan,
    registry: &Registry,
    client: ApiClient,
    dry_run: bool,
    yes: bool,
) -> Result<ExecuteSummary> {
    let apply_ctx = ApplyContext::new(client, dry_run).with_verbose(ctx.verbose > 0);
    let mut tracked = project.state.resources.clone();
    let total = plan.changes().count();

    let summary = {
        let mut progress =
            TerminalProgress::new(&mut project.state, &project.state_path, total, ctx.quiet);
        let mut confirm = PromptConfirm { yes };
        declarative::execute(
            plan,
            registry,
            &apply_ctx,
            &mut tracked,
            &mut progress,
            &mut confirm,
        )?
    };

    if !dry_run && summary.total_changes() > 0 {
        project.state.store(&project.state_path, &tracked)?;
    }
    Ok(summary)
}

fn finish(summary: &ExecuteSummary, dry_run: bool) -> Result<()> {
    if summary.total() == summary.no_change + summary.skipped && summary.skipped > 0 {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    print_summary(summary, dry_run);
    if !summary.is_success() {
        bail!("{} failed", ui::plural(summary.failed, "resource"));
    }
    Ok(())
}

// ============================================================================
// Refresh Command
// ============================================================================

pub fn refresh(ctx: &Context, args: &RefreshArgs) -> Result<()> {
    ui::header("Refreshing State");

    let mut project = Project::open(ctx)?;
    if project.state.resources.is_empty() {
        ui::info("Nothing tracked yet. Run `flowsync apply` first");
        return Ok(());
    }

    let client = connect(ctx)?;
    let report = refresh_project(ctx, &mut project, &resource::registry(), client, args.jobs)?;

    display_refresh(&report, ctx.verbose > 0);

    println!();
    let tracked = report.outcomes.len();
    if report.drifted() == 0 && report.gone() == 0 {
        ui::success(&format!(
            "{} checked, no drift",
            ui::plural(tracked, "resource")
        ));
    } else {
        ui::warn(&format!(
            "{} checked: {} drifted, {} gone. Run `flowsync plan` to see what apply would restore",
            ui::plural(tracked, "resource"),
            report.drifted(),
            report.gone()
        ));
    }

    if !report.is_success() {
        bail!(
            "{} could not be read; their tracked state was kept",
            ui::plural(report.failed(), "resource")
        );
    }
    Ok(())
}

fn refresh_project(
    ctx: &Context,
    project: &mut Project,
    registry: &Registry,
    client: ApiClient,
    jobs: u16,
) -> Result<RefreshReport> {
    let apply_ctx = ApplyContext::new(client, false).with_verbose(ctx.verbose > 0);
    let report = declarative::refresh(
        &project.state.resources,
        registry,
        &apply_ctx,
        usize::from(jobs),
    )?;
    project.state.store(&project.state_path, &report.state)?;
    Ok(report)
}

// ============================================================================
// Destroy Command
// ============================================================================

pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    ui::header("Destroying Tracked Resources");

    if args.dry_run {
        ui::warn("Dry run - nothing will be deleted");
    }

    let mut project = Project::open(ctx)?;
    let registry = resource::registry();
    let plan = project.plan(&[], &registry, &args.target)?;

    display_plan(&plan, false);
    if !plan.has_changes() {
        return Ok(());
    }

    let client = connect(ctx)?;
    let summary = execute_plan(
        ctx,
        &mut project,
        &plan,
        &registry,
        client,
        args.dry_run,
        args.yes,
    )?;
    finish(&summary, args.dry_run)
}

// ============================================================================
// Tests
// ============================================================================
