pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod plan;
pub mod resource;
pub mod schema;
pub mod secrets;
pub mod state;
pub mod value;

pub use api::{
    ApiError, Client, StripeClient, WebhookEndpoint, WebhookEndpointApi, WebhookEndpointParams,
};
pub use config::{load_config, load_config_or_env, ProviderConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{ConfigError, HookstateError, Result};
pub use manifest::{load_manifests, Manifest, ManifestError, ResourceKind};
pub use plan::{apply, destroy, plan, refresh, Action, ApplySummary, Plan};
pub use resource::Resource;
pub use schema::{FieldSchema, FieldType, ResourceSchema};
pub use secrets::{SecretError, SecretSource};
pub use state::{ResourceData, ResourceState, StateError, StateFile};
pub use value::Value;
