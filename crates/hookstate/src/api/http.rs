//! Blocking HTTP implementation of [`WebhookEndpointApi`].
//!
//! Request bodies use the API's form encoding with bracket notation for
//! nested values (`enabled_events[0]=...`, `metadata[key]=...`).

use log::debug;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::{ApiError, Result};
use super::{WebhookEndpoint, WebhookEndpointApi, WebhookEndpointParams};
use crate::config::ProviderConfig;

const WEBHOOK_ENDPOINTS_PATH: &str = "/v1/webhook_endpoints";

/// Error bodies longer than this are truncated before they reach logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Webhook endpoint client for the Stripe REST API.
pub struct StripeClient {
    http: HttpClient,
    api_base: String,
    api_key: SecretString,
    stripe_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

impl StripeClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("hookstate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            api_key: SecretString::from(config.api_key.expose_secret().to_string()),
            stripe_version: config.stripe_version.clone(),
        })
    }

    fn url(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}{}/{}", self.api_base, WEBHOOK_ENDPOINTS_PATH, id),
            None => format!("{}{}", self.api_base, WEBHOOK_ENDPOINTS_PATH),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.bearer_auth(self.api_key.expose_secret());
        match &self.stripe_version {
            Some(version) => request.header("Stripe-Version", version),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<WebhookEndpoint> {
        let response = self.authorize(request).send()?;
        let status = response.status();
        let body = response.text()?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            Err(parse_error(status.as_u16(), &body))
        }
    }
}

impl WebhookEndpointApi for StripeClient {
    fn get(&self, id: &str) -> Result<WebhookEndpoint> {
        debug!("GET webhook endpoint {}", id);
        self.send(self.http.get(self.url(Some(id))))
    }

    fn create(&self, params: &WebhookEndpointParams) -> Result<WebhookEndpoint> {
        debug!("POST webhook endpoint with {:?}", params.field_names());
        let mut request = self.http.post(self.url(None)).form(&encode_params(params));
        if let Some(key) = &params.idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        self.send(request)
    }

    fn update(&self, id: &str, params: &WebhookEndpointParams) -> Result<WebhookEndpoint> {
        debug!("POST webhook endpoint {} with {:?}", id, params.field_names());
        let mut request = self
            .http
            .post(self.url(Some(id)))
            .form(&encode_params(params));
        if let Some(key) = &params.idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        self.send(request)
    }

    fn delete(&self, id: &str) -> Result<WebhookEndpoint> {
        debug!("DELETE webhook endpoint {}", id);
        self.send(self.http.delete(self.url(Some(id))))
    }
}

/// Flattens parameters into form pairs. Unset fields produce no pairs.
pub fn encode_params(params: &WebhookEndpointParams) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if let Some(url) = &params.url {
        pairs.push(("url".to_string(), url.clone()));
    }
    if let Some(events) = &params.enabled_events {
        for (i, event) in events.iter().enumerate() {
            pairs.push((format!("enabled_events[{}]", i), event.clone()));
        }
    }
    if let Some(description) = &params.description {
        pairs.push(("description".to_string(), description.clone()));
    }
    if let Some(disabled) = params.disabled {
        pairs.push(("disabled".to_string(), disabled.to_string()));
    }
    if let Some(metadata) = &params.metadata {
        if metadata.is_empty() {
            // An empty string clears every key
            pairs.push(("metadata".to_string(), String::new()));
        }
        for (key, value) in metadata {
            pairs.push((format!("metadata[{}]", key), value.clone()));
        }
    }

    pairs
}

fn parse_error(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Stripe {
            status,
            kind: envelope.error.kind,
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "no message".to_string()),
            param: envelope.error.param,
        },
        Err(_) => ApiError::Stripe {
            status,
            kind: "unknown".to_string(),
            code: None,
            message: truncate_body(body),
            param: None,
        },
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}
