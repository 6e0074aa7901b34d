use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::TrackedState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current state file format
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State File
// ============================================================================

/// Tracked resources for one manifest, persisted as JSON
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateFile {
    /// Format version
    pub version: u32,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    /// Tracked resources keyed by declared name
    #[serde(default)]
    pub resources: TrackedState,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: TrackedState::new(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!(
                "State file {} does not exist, starting empty",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, but this flowsync understands up to {}. \
                 Upgrade flowsync",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} tracked resource(s) from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Replace the tracked resources and write the file
    pub fn store(&mut self, path: &Path, resources: &TrackedState) -> Result<()> {
        self.resources = resources.clone();
        self.save(path)
    }

    /// Write state atomically: a sibling temp file renamed into place
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.version = STATE_VERSION;
        self.last_updated = Utc::now();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        let tmp = temp_path(path);
        fs::write(&tmp, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================
