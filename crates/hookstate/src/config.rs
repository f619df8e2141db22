//! Provider configuration: API credentials and transport settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::secrets::{SecretSource, DEFAULT_API_KEY_ENV_VAR};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolved provider configuration.
#[derive(Debug)]
pub struct ProviderConfig {
    pub api_key: SecretString,
    pub api_base: String,
    /// Pins the `Stripe-Version` header when set.
    pub stripe_version: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    /// Configuration with default transport settings.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            stripe_version: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Defaults plus the API key from `STRIPE_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = SecretSource::default().resolve(DEFAULT_API_KEY_ENV_VAR)?;
        Ok(Self::new(api_key))
    }
}

/// On-disk shape of the provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProviderConfigFile {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_key_file: Option<String>,
    #[serde(default)]
    api_key_env_var: Option<String>,
    #[serde(default = "default_api_base")]
    api_base: String,
    #[serde(default)]
    stripe_version: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// `<config dir>/hookstate/provider.json`, when the platform has a
/// config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hookstate").join("provider.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProviderConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ProviderConfig, ConfigError> {
    let file: ProviderConfigFile = serde_json::from_str(content)?;

    validate_config(&file)?;

    let api_key = SecretSource {
        value: file.api_key,
        file: file.api_key_file,
        env_var: file.api_key_env_var,
    }
    .resolve(DEFAULT_API_KEY_ENV_VAR)?;

    Ok(ProviderConfig {
        api_key,
        api_base: file.api_base.trim_end_matches('/').to_string(),
        stripe_version: file.stripe_version.filter(|v| !v.is_empty()),
        connect_timeout: Duration::from_secs(file.connect_timeout_secs),
        request_timeout: Duration::from_secs(file.request_timeout_secs),
    })
}

/// Loads the file at `path` if given, else the default location if it
/// exists, else falls back to the environment.
pub fn load_config_or_env(path: Option<&Path>) -> Result<ProviderConfig, ConfigError> {
    if let Some(path) = path {
        return load_config(path);
    }
    match default_config_path() {
        Some(default) if default.exists() => {
            log::debug!("Using provider config at {}", default.display());
            load_config(default)
        }
        _ => ProviderConfig::from_env(),
    }
}

fn validate_config(file: &ProviderConfigFile) -> Result<(), ConfigError> {
    if file.api_base.is_empty() {
        return Err(ConfigError::Validation {
            message: "apiBase must not be empty".to_string(),
        });
    }

    if !file.api_base.starts_with("https://") && !file.api_base.starts_with("http://") {
        return Err(ConfigError::Validation {
            message: format!("apiBase must be an http(s) URL, got '{}'", file.api_base),
        });
    }

    if file.connect_timeout_secs == 0 || file.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "timeouts must be greater than 0".to_string(),
        });
    }

    Ok(())
}
