//! Resource manifest (`flowsync.toml`)
//!
//! ```toml
//! [[resource]]
//! name = "old-blog"
//! kind = "redirect"
//!
//! [resource.inputs]
//! siteId = "5f0c8c9e1c9d440000e8d8c3"
//! sourcePath = "/blog/old"
//! destinationPath = "/blog"
//! statusCode = 301
//! ```
//!
//! Inputs are passed to the resource kind as JSON, keyed exactly as written.

use declarative::DesiredResource;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found: {}. Create it or pass --manifest", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("resource #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("resource name '{name}' must not contain whitespace")]
    InvalidName { name: String },

    #[error("resource '{name}' has an empty kind")]
    EmptyKind { name: String },

    #[error("resource name '{name}' is declared more than once")]
    DuplicateName { name: String },

    #[error("resource '{name}': inputs must be a table")]
    InputsNotTable { name: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default, rename = "resource")]
    resources: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Entry {
    name: String,
    kind: String,
    #[serde(default)]
    inputs: Option<Value>,
}

/// Declared resources, in manifest order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub resources: Vec<DesiredResource>,
}

impl Manifest {
    /// Load and check a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse(&content).map_err(|err| match err {
            ManifestError::Parse { source, .. } => ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::debug!(
            "Loaded {} resource(s) from {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse manifest text
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: PathBuf::new(),
            source: Box::new(source),
        })?;

        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(file.resources.len());
        for (index, entry) in file.resources.into_iter().enumerate() {
            let name = entry.name.trim().to_string();
            if name.is_empty() {
                return Err(ManifestError::EmptyName { index });
            }
            if name.contains(char::is_whitespace) {
                return Err(ManifestError::InvalidName { name });
            }
            if entry.kind.trim().is_empty() {
                return Err(ManifestError::EmptyKind { name });
            }
            if !seen.insert(name.clone()) {
                return Err(ManifestError::DuplicateName { name });
            }

            let inputs = match entry.inputs {
                None => Value::Object(Map::new()),
                Some(value @ Value::Object(_)) => value,
                Some(_) => return Err(ManifestError::InputsNotTable { name }),
            };

            resources.push(DesiredResource {
                name,
                kind: entry.kind.trim().to_string(),
                inputs,
            });
        }

        Ok(Self { resources })
    }

    /// Names of the declared resources
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.name.as_str())
    }
}
