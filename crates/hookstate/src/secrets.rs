//! Resolution of the API key from a direct value, a file, or an
//! environment variable.
//!
//! Sources are tried in that order:
//!
//! 1. **Direct value** - `apiKey: "sk_test_..."`, for quick local use
//! 2. **File** - `apiKeyFile: /run/secrets/stripe`, for mounted secrets
//! 3. **Environment variable** - `apiKeyEnvVar: STRIPE_API_KEY`

use secrecy::SecretString;
use std::fs;

/// Environment variable consulted when no source is configured.
pub const DEFAULT_API_KEY_ENV_VAR: &str = "STRIPE_API_KEY";

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No API key source provided (set apiKey, apiKeyFile, apiKeyEnvVar, or {0})")]
    NoSourceProvided(&'static str),

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret file '{0}' is empty")]
    EmptyFile(String),

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// The configured places a secret may come from.
#[derive(Debug, Clone, Default)]
pub struct SecretSource {
    pub value: Option<String>,
    pub file: Option<String>,
    pub env_var: Option<String>,
}

impl SecretSource {
    pub fn has_source(&self) -> bool {
        non_empty(&self.value).is_some()
            || non_empty(&self.file).is_some()
            || non_empty(&self.env_var).is_some()
    }

    /// Resolves the secret. With no configured source, `fallback_env_var`
    /// is read if it is set; otherwise `NoSourceProvided`.
    pub fn resolve(&self, fallback_env_var: &'static str) -> Result<SecretString> {
        if let Some(value) = non_empty(&self.value) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = non_empty(&self.file) {
            let expanded = expand_home(path);
            let content =
                fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                    path: expanded.clone(),
                    source: e,
                })?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(SecretError::EmptyFile(expanded));
            }
            return Ok(SecretString::from(trimmed.to_string()));
        }

        if let Some(name) = non_empty(&self.env_var) {
            return read_env(name);
        }

        match read_env(fallback_env_var) {
            Ok(secret) => Ok(secret),
            Err(SecretError::EnvVarNotSet { .. }) => {
                Err(SecretError::NoSourceProvided(fallback_env_var))
            }
            Err(e) => Err(e),
        }
    }
}

fn non_empty(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().filter(|s| !s.is_empty())
}

fn read_env(name: &str) -> Result<SecretString> {
    match std::env::var(name) {
        // Env vars set from files often carry a trailing newline
        Ok(value) => Ok(SecretString::from(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
            name: name.to_string(),
        }),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

/// Expands a leading `~` to the user's home directory.
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
