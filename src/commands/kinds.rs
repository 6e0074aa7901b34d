use anyhow::Result;
use colored::Colorize;
use declarative::{DeletePolicy, DynReconciler};

use crate::Context;
use crate::resource;
use crate::ui;

/// List every resource kind with its identity format
pub fn run(ctx: &Context) -> Result<()> {
    let registry = resource::registry();

    if !ctx.quiet {
        ui::header("Resource Kinds");
        println!();
    }

    for name in registry.names() {
        let kind = registry.get(name)?;
        println!("{}", line(kind));
    }

    if !ctx.quiet {
        println!();
        ui::dim("Kinds marked untrack leave the remote object in place on delete.");
    }
    Ok(())
}

fn line(kind: &dyn DynReconciler) -> String {
    let policy = match kind.delete_policy() {
        DeletePolicy::Remote => String::new(),
        DeletePolicy::Untrack => format!(" {}", "[untrack]".yellow()),
    };
    format!(
        "  {:<20} {}{}",
        kind.type_name().bold(),
        kind.shape().to_string().dimmed(),
        policy
    )
}
