//! K8s-style manifests declaring the desired resources.
//!
//! ```yaml
//! apiVersion: hookstate.io/v1
//! kind: WebhookEndpoint
//! metadata:
//!   name: billing
//! spec:
//!   url: https://example.com/hooks/billing
//!   enabled_events: ["invoice.paid"]
//! ```
//!
//! A file may hold several documents separated by `---`.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::{self, Resource};
use crate::state::{validate_declared, Attributes};

/// The API version for all hookstate manifests.
pub const API_VERSION: &str = "hookstate.io/v1";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read manifest directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Invalid API version '{version}' in '{path}', expected '{expected}'")]
    InvalidApiVersion {
        path: PathBuf,
        version: String,
        expected: String,
    },

    #[error("Unknown resource kind '{kind}' in '{path}'")]
    UnknownKind { path: PathBuf, kind: String },

    #[error("Manifest validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// The kind of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    WebhookEndpoint,
}

impl ResourceKind {
    pub fn all() -> &'static [ResourceKind] {
        &[ResourceKind::WebhookEndpoint]
    }

    /// The lifecycle handlers for this kind.
    pub fn resource(&self) -> Box<dyn Resource> {
        match self {
            ResourceKind::WebhookEndpoint => Box::new(resource::WebhookEndpointResource),
        }
    }

    /// The schema type name recorded in state, e.g. `stripe_webhook_endpoint`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::WebhookEndpoint => resource::webhook_endpoint::TYPE_NAME,
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.type_name() == type_name)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.resource().kind())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.resource().kind().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

/// Metadata for a manifest, following K8s conventions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Unique name of the resource; also its key in the state file.
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub api_version: String,
    pub kind: ResourceKind,
    pub metadata: ObjectMeta,
    /// Declared attributes, keyed by schema field name.
    #[serde(default)]
    pub spec: Attributes,
}

impl Manifest {
    pub fn new(kind: ResourceKind, name: impl Into<String>, spec: Attributes) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind,
            metadata: ObjectMeta::new(name),
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Parsed before the full document so version and kind errors are precise.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestHeader {
    api_version: String,
    kind: String,
}

/// Loads manifests from a file, or from every `.yaml`/`.yml` file in a
/// directory, and validates them.
pub fn load_manifests<P: AsRef<Path>>(path: P) -> Result<Vec<Manifest>> {
    let path = path.as_ref();
    let files = if path.is_dir() {
        manifest_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut manifests = Vec::new();
    for file in files {
        let content = fs::read_to_string(&file).map_err(|e| ManifestError::ReadFile {
            path: file.clone(),
            source: e,
        })?;
        manifests.extend(parse_manifests(&content, &file)?);
    }

    validate_manifests(&manifests)?;
    log::debug!("Loaded {} manifest(s) from {}", manifests.len(), path.display());
    Ok(manifests)
}

fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ManifestError::ReadDirectory {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ManifestError::ReadDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parses every YAML document in `content`. Empty documents are skipped.
pub fn parse_manifests(content: &str, path: &Path) -> Result<Vec<Manifest>> {
    let parse_error = |e: serde_yaml::Error| ManifestError::ParseYaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut manifests = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document).map_err(parse_error)?;
        if value.is_null() {
            continue;
        }

        let header: ManifestHeader = serde_yaml::from_value(value.clone()).map_err(parse_error)?;
        if header.api_version != API_VERSION {
            return Err(ManifestError::InvalidApiVersion {
                path: path.to_path_buf(),
                version: header.api_version,
                expected: API_VERSION.to_string(),
            });
        }
        if header.kind.parse::<ResourceKind>().is_err() {
            return Err(ManifestError::UnknownKind {
                path: path.to_path_buf(),
                kind: header.kind,
            });
        }

        manifests.push(serde_yaml::from_value(value).map_err(parse_error)?);
    }

    Ok(manifests)
}

/// Collects every problem across `manifests` and fails if there was any.
pub fn validate_manifests(manifests: &[Manifest]) -> Result<()> {
    let mut validator = ManifestValidator::new();
    validator.validate(manifests);
    match validator.errors() {
        [] => Ok(()),
        errors => Err(ManifestError::Validation(errors.join("; "))),
    }
}

/// Validator for a set of manifests.
pub struct ManifestValidator {
    errors: Vec<String>,
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn validate(&mut self, manifests: &[Manifest]) {
        self.errors.clear();

        for manifest in manifests {
            self.validate_manifest(manifest);
        }
        self.validate_unique_names(manifests);
    }

    fn validate_manifest(&mut self, manifest: &Manifest) {
        if manifest.name().trim().is_empty() {
            self.errors
                .push(format!("{}: metadata.name is required", manifest.kind));
            return;
        }

        let schema = manifest.kind.resource().schema();
        for error in validate_declared(&schema, &manifest.spec) {
            self.errors
                .push(format!("{}/{}: {}", manifest.kind, manifest.name(), error));
        }
    }

    // Names are unique across kinds since they key the state file.
    fn validate_unique_names(&mut self, manifests: &[Manifest]) {
        let mut seen = HashSet::new();
        for manifest in manifests {
            if !seen.insert(manifest.name()) {
                self.errors
                    .push(format!("Duplicate resource name '{}'", manifest.name()));
            }
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}
