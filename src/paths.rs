//! Path resolution for flowsync
//!
//! # Environment Variables
//!
//! - `FLOWSYNC_CONFIG_DIR` - Override the config directory (e.g., `~/dotfiles/flowsync`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `FLOWSYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/flowsync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\flowsync`
//!    - macOS/Linux: `~/.config/flowsync`
//!
//! The tracked state lives next to the manifest it belongs to, so every
//! project directory carries its own state file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "FLOWSYNC_CONFIG_DIR";

/// Provider config file name
pub const CONFIG_FILE: &str = "config.toml";

/// State file name, created next to the manifest
pub const STATE_FILE: &str = "flowsync.state.json";

/// Get the flowsync config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("flowsync");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("flowsync");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("flowsync");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default provider config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// State file for a manifest: an explicit path wins, else next to the manifest
pub fn state_file(manifest: &Path, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return expand(&path.to_string_lossy());
    }
    let manifest = expand(&manifest.to_string_lossy());
    match manifest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(STATE_FILE),
        _ => PathBuf::from(STATE_FILE),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// # Examples
///
/// ```ignore
/// let home_path = paths::expand("~/sites/flowsync.toml");
/// let var_path = paths::expand("$HOME/sites/flowsync.toml");
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
