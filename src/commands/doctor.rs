use anyhow::Result;
use colored::Colorize;
use flowkit::{ApiClient, CancelToken, ClientConfig, ErrorCategory};
use serde::Deserialize;
use std::sync::Arc;

use crate::Context;
use crate::config::{self, ProviderConfig};
use crate::engine::TerminalRetry;
use crate::manifest::Manifest;
use crate::paths;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

struct Issue {
    category: &'static str,
    summary: String,
    detail: Option<String>,
    fix: Option<String>,
    fix_cmd: Option<String>,
}

// ============================================================================
// Token endpoints
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedTo {
    #[serde(default)]
    pub site_ids: Vec<String>,
    #[serde(default)]
    pub workspace_ids: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: String,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_used: String,
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub rate_limit: u32,
    /// Comma-separated scopes, e.g. "sites:read,pages:write"
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub authorized_to: AuthorizedTo,
}

impl Authorization {
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Introspection {
    pub authorization: Authorization,
    #[serde(default)]
    pub application: Option<Application>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedBy {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl AuthorizedBy {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            format!("{name} <{}>", self.email)
        }
    }
}

pub fn introspect(client: &ApiClient, cancel: &CancelToken) -> flowkit::Result<Introspection> {
    client.get("/v2/token/introspect", cancel)
}

pub fn authorized_by(client: &ApiClient, cancel: &CancelToken) -> flowkit::Result<AuthorizedBy> {
    client.get("/v2/token/authorized_by", cancel)
}

// ============================================================================
// Doctor
// ============================================================================

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("flowsync Health Check");

    let mut issues: Vec<Issue> = Vec::new();

    // Check 1: Provider config and credentials
    let client_config = check_config(ctx, &mut issues);

    // Check 2: API access
    if let Some(client_config) = client_config {
        check_api(ctx, &client_config, &mut issues);
    }

    // Check 3: Manifest and state
    check_project(ctx, &mut issues);

    println!();
    if issues.is_empty() {
        ui::success("All checks passed!");
    } else {
        print_issue_summary(&issues);
    }

    Ok(())
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        let num = i + 1;
        println!(
            "  {}  {} {}",
            format!("{num}.").bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(detail) = &issue.detail {
            for line in detail.lines() {
                println!("      {}", line.dimmed());
            }
        }
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
        if let Some(cmd) = &issue.fix_cmd {
            println!("      {} {}", "$".dimmed(), cmd.bold());
        }
        println!();
    }
}

fn check_config(ctx: &Context, issues: &mut Vec<Issue>) -> Option<ClientConfig> {
    ui::section("Configuration");

    match config::location(ctx.config.as_deref()) {
        Ok(path) if path.exists() => {
            println!("  {} config file {}", "✓".green(), path.display());
        }
        Ok(path) => {
            println!(
                "  {} config file {} {}",
                "○".dimmed(),
                path.display(),
                "(not present, using defaults)".dimmed()
            );
        }
        Err(e) => {
            println!("  {} config file {}", "✗".red(), "(unknown location)".red());
            issues.push(Issue {
                category: "Configuration",
                summary: "Could not determine config directory".into(),
                detail: Some(format!("{e}")),
                fix: Some(format!(
                    "Ensure $HOME is set or set {}",
                    paths::ENV_CONFIG_DIR
                )),
                fix_cmd: None,
            });
        }
    }

    let provider = match ProviderConfig::load(ctx.config.as_deref()) {
        Ok(provider) => provider,
        Err(e) => {
            println!("  {} config file is invalid", "✗".red());
            issues.push(Issue {
                category: "Configuration",
                summary: "Config file could not be loaded".into(),
                detail: Some(format!("{e:#}")),
                fix: Some("Fix the TOML syntax or remove unknown keys".into()),
                fix_cmd: None,
            });
            return None;
        }
    };

    match provider.to_client_config(env!("CARGO_PKG_VERSION")) {
        Ok(client_config) => {
            let source = if provider.api_token.is_some() {
                "config file"
            } else {
                flowkit::auth::TOKEN_ENV
            };
            println!(
                "  {} API token {} {}",
                "✓".green(),
                flowkit::auth::redact(&client_config.token),
                format!("(from {source})").dimmed()
            );
            println!("  {} API origin {}", "✓".green(), client_config.base_url);
            Some(client_config)
        }
        Err(e) => {
            println!("  {} API token {}", "✗".red(), "(unusable)".red());
            issues.push(Issue {
                category: "Configuration",
                summary: "No usable API token".into(),
                detail: Some(format!("{e:#}")),
                fix: Some(format!(
                    "Set api_token in the config file or export {}",
                    flowkit::auth::TOKEN_ENV
                )),
                fix_cmd: Some(format!("export {}=<token>", flowkit::auth::TOKEN_ENV)),
            });
            None
        }
    }
}

fn check_api(ctx: &Context, client_config: &ClientConfig, issues: &mut Vec<Issue>) {
    ui::section("API Access");

    let client = match ApiClient::new(client_config) {
        Ok(client) => client.with_retry_callback(Arc::new(TerminalRetry { quiet: ctx.quiet })),
        Err(e) => {
            println!("  {} client {}", "✗".red(), e);
            issues.push(Issue {
                category: "API Access",
                summary: "Could not build the API client".into(),
                detail: Some(e.to_string()),
                fix: Some(e.category().advice().into()),
                fix_cmd: None,
            });
            return;
        }
    };
    let cancel = CancelToken::new();

    match introspect(&client, &cancel) {
        Ok(info) => {
            let auth = &info.authorization;
            println!("  {} token is valid", "✓".green());
            if let Some(app) = &info.application
                && !app.display_name.is_empty()
            {
                ui::kv("application", &app.display_name);
            }
            if !auth.grant_type.is_empty() {
                ui::kv("grant", &auth.grant_type);
            }
            if auth.rate_limit > 0 {
                ui::kv("rate limit", &format!("{} requests/min", auth.rate_limit));
            }
            ui::kv("sites", &auth.authorized_to.site_ids.len().to_string());
            if ctx.verbose > 0 {
                for site in &auth.authorized_to.site_ids {
                    ui::dim(&format!("  {site}"));
                }
                ui::kv("scopes", &auth.scopes().join(", "));
            }
            if auth.authorized_to.site_ids.is_empty() {
                issues.push(Issue {
                    category: "API Access",
                    summary: "Token is not authorized for any site".into(),
                    detail: None,
                    fix: Some(
                        "Create a site token under Site Settings > Apps & Integrations".into(),
                    ),
                    fix_cmd: None,
                });
            }
        }
        Err(e) => {
            println!("  {} token introspection failed", "✗".red());
            let fix = match e.category() {
                ErrorCategory::ServerError | ErrorCategory::NotFound => {
                    "Check that the token is active and has not been revoked".to_string()
                }
                other => other.advice().to_string(),
            };
            issues.push(Issue {
                category: "API Access",
                summary: "Token introspection failed".into(),
                detail: Some(e.to_string()),
                fix: Some(fix),
                fix_cmd: None,
            });
            return;
        }
    }

    match authorized_by(&client, &cancel) {
        Ok(user) => ui::kv("authorized by", &user.display_name()),
        // Site tokens are not tied to a user
        Err(e) if e.is_not_found() => ui::kv("authorized by", "(site token)"),
        Err(e) => {
            println!("  {} authorized_by lookup failed", "⚠".yellow());
            log::debug!("authorized_by: {e}");
        }
    }
}

fn check_project(ctx: &Context, issues: &mut Vec<Issue>) {
    ui::section("Project");

    let manifest = match Manifest::load(&ctx.manifest) {
        Ok(manifest) => {
            println!(
                "  {} manifest {} {}",
                "✓".green(),
                ctx.manifest.display(),
                format!("({})", ui::plural(manifest.resources.len(), "resource")).dimmed()
            );
            Some(manifest)
        }
        Err(e) => {
            println!("  {} manifest {}", "✗".red(), ctx.manifest.display());
            issues.push(Issue {
                category: "Project",
                summary: "Manifest could not be loaded".into(),
                detail: Some(e.to_string()),
                fix: Some("Create flowsync.toml or pass --manifest".into()),
                fix_cmd: None,
            });
            None
        }
    };

    if let Some(manifest) = &manifest {
        let registry = resource::registry();
        for desired in &manifest.resources {
            if registry.get(&desired.kind).is_err() {
                issues.push(Issue {
                    category: "Project",
                    summary: format!("{}: unknown kind '{}'", desired.name, desired.kind),
                    detail: Some(format!("Known kinds: {}", registry.names().join(", "))),
                    fix: None,
                    fix_cmd: Some("flowsync kinds".into()),
                });
            }
        }
    }

    let state_path = paths::state_file(&ctx.manifest, ctx.state.as_deref());
    match StateFile::load(&state_path) {
        Ok(state) => println!(
            "  {} state {} {}",
            "✓".green(),
            state_path.display(),
            format!("({} tracked)", state.resources.len()).dimmed()
        ),
        Err(e) => {
            println!("  {} state {}", "✗".red(), state_path.display());
            issues.push(Issue {
                category: "Project",
                summary: "State file could not be loaded".into(),
                detail: Some(format!("{e:#}")),
                fix: Some("Restore the file from version control or a backup".into()),
                fix_cmd: None,
            });
        }
    }
}
