//! Remote API client for webhook endpoints.
//!
//! [`WebhookEndpointApi`] is what the reconciler consumes. [`StripeClient`]
//! implements it over HTTP; tests substitute an in-memory fake. The
//! [`Client`] value bundles the per-resource APIs and is handed to every
//! lifecycle operation.

pub mod error;
pub mod http;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;

pub use error::{ApiError, Result};
pub use http::StripeClient;

/// Remote status value of an active endpoint.
pub const STATUS_ENABLED: &str = "enabled";

/// A webhook endpoint as returned by the remote API.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub enabled_events: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `enabled` or `disabled`; other values may appear.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Only present in the response to the create call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created: Option<DateTime<Utc>>,
    /// Set on the response to a delete call.
    #[serde(default)]
    pub deleted: bool,
}

impl WebhookEndpoint {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}

impl std::fmt::Debug for WebhookEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookEndpoint")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("enabled_events", &self.enabled_events)
            .field("description", &self.description)
            .field("status", &self.status)
            .field("metadata", &self.metadata)
            .field("secret", &self.secret.as_ref().map(|_| "(sensitive value)"))
            .field("livemode", &self.livemode)
            .field("deleted", &self.deleted)
            .finish()
    }
}

/// Parameters for create and update calls. `None` fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookEndpointParams {
    pub url: Option<String>,
    pub enabled_events: Option<Vec<String>>,
    pub description: Option<String>,
    /// Update only; the API refuses it on create.
    pub disabled: Option<bool>,
    /// An empty value removes the key remotely.
    pub metadata: Option<BTreeMap<String, String>>,
    /// Sent as the `Idempotency-Key` header.
    pub idempotency_key: Option<String>,
}

impl WebhookEndpointParams {
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
    }

    /// Names of the body fields this request will send.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.url.is_some() {
            names.push("url");
        }
        if self.enabled_events.is_some() {
            names.push("enabled_events");
        }
        if self.description.is_some() {
            names.push("description");
        }
        if self.disabled.is_some() {
            names.push("disabled");
        }
        if self.metadata.is_some() {
            names.push("metadata");
        }
        names
    }
}

/// Calls against the webhook endpoint collection.
pub trait WebhookEndpointApi {
    fn get(&self, id: &str) -> Result<WebhookEndpoint>;

    fn create(&self, params: &WebhookEndpointParams) -> Result<WebhookEndpoint>;

    fn update(&self, id: &str, params: &WebhookEndpointParams) -> Result<WebhookEndpoint>;

    fn delete(&self, id: &str) -> Result<WebhookEndpoint>;
}

/// The API capabilities handed to lifecycle operations.
pub struct Client {
    pub webhook_endpoints: Box<dyn WebhookEndpointApi>,
}

impl Client {
    /// Builds an HTTP-backed client from provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let stripe = StripeClient::new(config)?;
        Ok(Self::with_webhook_endpoints(stripe))
    }

    pub fn with_webhook_endpoints(api: impl WebhookEndpointApi + 'static) -> Self {
        Self {
            webhook_endpoints: Box::new(api),
        }
    }
}
