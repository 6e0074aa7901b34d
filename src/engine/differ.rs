//! Plan and refresh display

use colored::Colorize;
use declarative::{Action, Plan, RefreshOutcome, RefreshReport, Step};
use std::collections::BTreeMap;

use crate::ui;

/// Display a plan grouped by resource kind
///
/// Unchanged resources are listed only when `verbose` is set.
pub fn display_plan(plan: &Plan, verbose: bool) {
    if !plan.has_changes() {
        println!();
        println!(
            "  {} No changes. {} resource(s) match the manifest",
            "✓".green(),
            plan.steps.len()
        );
        return;
    }

    let mut by_kind: BTreeMap<&str, Vec<&Step>> = BTreeMap::new();
    for step in &plan.steps {
        if step.action.is_change() || verbose {
            by_kind.entry(step.kind.as_str()).or_default().push(step);
        }
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Plan".bold()
    );
    println!("│");

    for (kind, steps) in &by_kind {
        println!("│ {}", kind.bold());
        for step in steps {
            println!(
                "│   {} {:<30} {}",
                ui::action(&step.action),
                step.name,
                step_detail(step).dimmed()
            );
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", plan.summary());
    println!("└─────────────────────────────────────────────────────┘");
}

/// Plain-text detail for one step
pub fn step_detail(step: &Step) -> String {
    match &step.action {
        Action::Create => step.description.clone(),
        Action::Update { fields } => format!("{} ({})", step.description, fields.join(", ")),
        Action::Replace { fields } => format!(
            "{} (forces replacement: {})",
            step.description,
            fields.join(", ")
        ),
        Action::Delete => format!("{} (will delete)", step.description),
        Action::NoChange => step.description.clone(),
    }
}

/// Display what a refresh found
pub fn display_refresh(report: &RefreshReport, verbose: bool) {
    for (name, outcome) in &report.outcomes {
        let glyph = ui::refresh_glyph(outcome);
        match outcome {
            RefreshOutcome::Unchanged if verbose => println!("  {glyph} {name}"),
            RefreshOutcome::Unchanged => {}
            RefreshOutcome::Drifted { fields } => println!(
                "  {glyph} {name} {}",
                format!("drifted: {}", fields.join(", ")).dimmed()
            ),
            RefreshOutcome::Gone => println!(
                "  {glyph} {name} {}",
                "no longer exists, dropped from state".dimmed()
            ),
            RefreshOutcome::Failed { error } => println!("  {glyph} {name} {}", error.dimmed()),
        }
    }
}
