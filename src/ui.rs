//! Terminal output: status lines, plan glyphs and API failure reports

use colored::{ColoredString, Colorize};
use declarative::{Action, RefreshOutcome};
use flowkit::ErrorCategory;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a muted hint, indented under the previous line
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Progress prefix for one plan step, e.g. `[2/5]`
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// `plural(1, "resource")` is "1 resource"
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// Plan and refresh glyphs
// ============================================================================

/// Colored plan symbol: `+` create, `~` update, `-/+` replace, `-` delete
pub fn action(action: &Action) -> ColoredString {
    let symbol = action.symbol();
    match action {
        Action::Create => symbol.green(),
        Action::Update { .. } => symbol.yellow(),
        Action::Replace { .. } => symbol.magenta(),
        Action::Delete => symbol.red(),
        Action::NoChange => symbol.dimmed(),
    }
}

/// Glyph for what a refresh found on one tracked resource
pub fn refresh_glyph(outcome: &RefreshOutcome) -> ColoredString {
    match outcome {
        RefreshOutcome::Unchanged => "○".dimmed(),
        RefreshOutcome::Drifted { .. } => "~".yellow(),
        RefreshOutcome::Gone => "-".red(),
        RefreshOutcome::Failed { .. } => "✗".red(),
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Short tag for an error category.
///
/// Local failures (bad config or input) are yellow, retryable ones cyan and
/// the rest red, so a glance tells whether running again could help.
pub fn category_badge(category: ErrorCategory) -> ColoredString {
    let tag = format!("[{}]", category.description().to_lowercase());
    if category.is_local() {
        tag.yellow()
    } else if category.is_retryable() {
        tag.cyan()
    } else {
        tag.red()
    }
}

/// Print a command failure with its cause chain and, for API errors, advice
pub fn failure(err: &anyhow::Error) {
    for line in failure_lines(err) {
        eprintln!("{line}");
    }
}

fn failure_lines(err: &anyhow::Error) -> Vec<String> {
    let api_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<flowkit::Error>());

    let mut lines = vec![match api_err {
        Some(api_err) => format!(
            "{} {} {err:#}",
            "✗".red(),
            category_badge(api_err.category())
        ),
        None => format!("{} {err:#}", "✗".red()),
    }];
    if let Some(api_err) = api_err {
        lines.push(format!("  {} {}", "→".dimmed(), api_err.category().advice()));
    }
    lines
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_plural() {
        assert_eq!(plural(0, "change"), "0 changes");
        assert_eq!(plural(1, "change"), "1 change");
        assert_eq!(plural(12, "resource"), "12 resources");
    }

    #[test]
    fn test_action_symbols() {
        colored::control::set_override(false);
        assert_eq!(action(&Action::Create).to_string(), "+");
        assert_eq!(action(&Action::Delete).to_string(), "-");
        assert_eq!(refresh_glyph(&RefreshOutcome::Gone).to_string(), "-");
    }

    #[test]
    fn test_failure_carries_category_and_advice() {
        colored::control::set_override(false);
        let err = Err::<(), _>(flowkit::Error::validation("sourcePath", "must start with '/'"))
            .context("Failed to plan redirect old-blog")
            .unwrap_err();

        let lines = failure_lines(&err);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[invalid input]"));
        assert!(lines[0].contains("Failed to plan redirect old-blog"));
        assert!(lines[0].contains("sourcePath"));
        assert!(lines[1].contains(ErrorCategory::Validation.advice()));
    }

    #[test]
    fn test_plain_failure_has_no_advice() {
        colored::control::set_override(false);
        let err = anyhow::anyhow!("manifest not found");
        let lines = failure_lines(&err);
        assert_eq!(lines, vec!["✗ manifest not found".to_string()]);
    }
}
