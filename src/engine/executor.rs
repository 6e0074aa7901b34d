//! Terminal implementations of the engine callbacks

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ExecuteSummary, ProgressCallback, TrackedState};
use flowkit::Error;
use flowkit::retry::RetryCallback;
use std::path::Path;
use std::time::Duration;

use crate::state::StateFile;
use crate::ui;

/// Prints each step and persists the state on every checkpoint
pub struct TerminalProgress<'a> {
    state: &'a mut StateFile,
    path: &'a Path,
    total: usize,
    current: usize,
    quiet: bool,
}

impl<'a> TerminalProgress<'a> {
    pub fn new(state: &'a mut StateFile, path: &'a Path, total: usize, quiet: bool) -> Self {
        Self {
            state,
            path,
            total,
            current: 0,
            quiet,
        }
    }
}

impl ProgressCallback for TerminalProgress<'_> {
    fn on_resource_start(&mut self, _name: &str, description: &str) {
        self.current += 1;
        if !self.quiet {
            ui::step(self.current, self.total, description);
        }
    }

    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult) {
        match result {
            ApplyResult::Failed { error } => {
                println!("    {} {} {}", "✗".red(), name, error.dimmed());
            }
            ApplyResult::Skipped { reason } => {
                println!("    {} {} {}", "⊘".yellow(), name, reason.dimmed());
            }
            _ if self.quiet => {}
            ApplyResult::NoChange => println!("    {} {}", "○".dimmed(), name),
            other => println!("    {} {} {}", "✓".green(), name, verb(other).dimmed()),
        }
    }

    fn on_checkpoint(&mut self, state: &TrackedState) -> Result<()> {
        self.state.store(self.path, state)
    }
}

fn verb(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::Created => "created",
        ApplyResult::Modified => "updated",
        ApplyResult::Replaced => "replaced",
        ApplyResult::Removed => "removed",
        ApplyResult::NoChange => "unchanged",
        ApplyResult::Failed { .. } => "failed",
        ApplyResult::Skipped { .. } => "skipped",
    }
}

/// Asks on the terminal unless `--yes` was given
pub struct PromptConfirm {
    pub yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        println!();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

/// Surfaces retry waits so a rate-limited run doesn't look stuck
pub struct TerminalRetry {
    pub quiet: bool,
}

impl RetryCallback for TerminalRetry {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        if self.quiet {
            return;
        }
        println!(
            "    {} {} retrying in {:.1}s {}",
            "⚠".yellow(),
            ui::category_badge(error.category()),
            delay.as_secs_f64(),
            format!("(attempt {attempt}/{max_attempts})").dimmed()
        );
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.modified, "updated"),
        (summary.replaced, "replaced"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
    ];
    for (count, what) in lines {
        if count > 0 {
            println!("    • {} {}", ui::plural(count, "resource"), what);
        }
    }
    if summary.failed > 0 {
        println!(
            "    • {} {}",
            ui::plural(summary.failed, "resource"),
            "failed".red()
        );
    }
}
