use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;
use crate::diagnostics::Diagnostics;
use crate::manifest::ManifestError;
use crate::secrets::SecretError;
use crate::state::StateFileError;

#[derive(Error, Debug)]
pub enum HookstateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("State file error: {0}")]
    StateFile(#[from] StateFileError),

    #[error("API client error: {0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Diagnostics(#[from] Diagnostics),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to resolve API key: {0}")]
    Secret(#[from] SecretError),
}

pub type Result<T> = std::result::Result<T, HookstateError>;
