//! JSON state file holding the resolved state of every managed resource.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Attributes;

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

/// Errors that can occur while loading or saving a state file.
#[derive(Error, Debug)]
pub enum StateFileError {
    #[error("Failed to read state file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unsupported state version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Result type for state file operations.
pub type Result<T> = std::result::Result<T, StateFileError>;

/// Resolved state of one managed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    /// Resource type name, e.g. `stripe_webhook_endpoint`.
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// The whole state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    /// Incremented on every save.
    pub serial: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Resources keyed by manifest name.
    #[serde(default)]
    pub resources: BTreeMap<String, StoredResource>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            updated_at: None,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Loads a state file. A missing file is an empty state.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No state file at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(StateFileError::ReadFile {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let state: StateFile =
            serde_json::from_str(&content).map_err(|e| StateFileError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        if state.version != STATE_VERSION {
            return Err(StateFileError::UnsupportedVersion {
                found: state.version,
                expected: STATE_VERSION,
            });
        }

        Ok(state)
    }

    /// Writes the state through a temporary sibling file and a rename, so a
    /// crash never leaves a truncated file behind.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.serial += 1;
        self.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, content).map_err(|e| StateFileError::WriteFile {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, path).map_err(|e| StateFileError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StoredResource> {
        self.resources.get(name)
    }

    pub fn upsert(&mut self, name: impl Into<String>, resource: StoredResource) {
        self.resources.insert(name.into(), resource);
    }

    pub fn remove(&mut self, name: &str) -> Option<StoredResource> {
        self.resources.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tempfile::TempDir;

    fn sample_resource() -> StoredResource {
        let mut attributes = Attributes::new();
        attributes.insert("url".to_string(), Value::from("https://a.example/hook"));
        StoredResource {
            type_name: "stripe_webhook_endpoint".to_string(),
            id: "we_1".to_string(),
            attributes,
        }
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::load(dir.path().join("state.json")).unwrap();
        assert_eq!(state.serial, 0);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_save_bumps_serial_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = StateFile::default();
        state.upsert("billing", sample_resource());
        state.save(&path).unwrap();
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.serial, 2);
        assert_eq!(loaded.get("billing"), Some(&sample_resource()));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"version": 7, "serial": 1, "resources": {}}"#).unwrap();
        assert!(matches!(
            StateFile::load(&path),
            Err(StateFileError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            StateFile::load(&path),
            Err(StateFileError::Parse { .. })
        ));
    }
}
