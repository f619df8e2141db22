//! In-memory stand-in for the webhook endpoint API.
//!
//! Behaves like the remote service where the reconciler can observe it:
//! ids are assigned sequentially, the secret is only returned on create,
//! `disabled` maps to the status, an empty metadata value removes the key,
//! and unknown ids are 404s.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use hookstate::api::{Result, STATUS_ENABLED};
use hookstate::{ApiError, WebhookEndpoint, WebhookEndpointApi, WebhookEndpointParams};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    Create(WebhookEndpointParams),
    Update(String, WebhookEndpointParams),
    Delete(String),
}

/// Operation selector for injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct Inner {
    endpoints: BTreeMap<String, WebhookEndpoint>,
    calls: Vec<Call>,
    next_id: u32,
    next_secret: Option<String>,
    failures: Vec<(Op, u16)>,
}

/// Cloning shares the same fake, so a test can keep a handle after moving
/// one into a `Client`.
#[derive(Clone, Default)]
pub struct FakeStripe {
    inner: Rc<RefCell<Inner>>,
}

impl FakeStripe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secret to hand out on the next create.
    pub fn with_next_secret(self, secret: &str) -> Self {
        self.inner.borrow_mut().next_secret = Some(secret.to_string());
        self
    }

    /// Makes the next call of `op` fail with `status`.
    pub fn fail_next(&self, op: Op, status: u16) {
        self.inner.borrow_mut().failures.push((op, status));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Calls other than reads.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Get(_)))
            .collect()
    }

    pub fn endpoint(&self, id: &str) -> Option<WebhookEndpoint> {
        self.inner.borrow().endpoints.get(id).cloned()
    }

    pub fn endpoint_count(&self) -> usize {
        self.inner.borrow().endpoints.len()
    }

    /// Changes an endpoint behind the reconciler's back.
    pub fn set_status(&self, id: &str, status: &str) {
        if let Some(endpoint) = self.inner.borrow_mut().endpoints.get_mut(id) {
            endpoint.status = status.to_string();
        }
    }

    pub fn remove(&self, id: &str) {
        self.inner.borrow_mut().endpoints.remove(id);
    }

    fn record(&self, call: Call, op: Op) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(call);
        if let Some(pos) = inner.failures.iter().position(|(o, _)| *o == op) {
            let (_, status) = inner.failures.remove(pos);
            return Err(ApiError::Stripe {
                status,
                kind: "api_error".to_string(),
                code: None,
                message: format!("injected {:?} failure", op),
                param: None,
            });
        }
        Ok(())
    }
}

fn status_for(disabled: bool) -> String {
    if disabled {
        "disabled".to_string()
    } else {
        STATUS_ENABLED.to_string()
    }
}

fn apply_metadata(target: &mut BTreeMap<String, String>, changes: &BTreeMap<String, String>) {
    if changes.is_empty() {
        target.clear();
    }
    for (key, value) in changes {
        if value.is_empty() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

impl WebhookEndpointApi for FakeStripe {
    fn get(&self, id: &str) -> Result<WebhookEndpoint> {
        self.record(Call::Get(id.to_string()), Op::Get)?;
        self.endpoint(id)
            .ok_or_else(|| ApiError::not_found("webhook_endpoint", id))
    }

    fn create(&self, params: &WebhookEndpointParams) -> Result<WebhookEndpoint> {
        self.record(Call::Create(params.clone()), Op::Create)?;

        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let n = inner.next_id;
        let id = format!("we_{}", n);
        let secret = inner
            .next_secret
            .take()
            .unwrap_or_else(|| format!("whsec_test_{}", n));

        let mut metadata = BTreeMap::new();
        if let Some(changes) = &params.metadata {
            apply_metadata(&mut metadata, changes);
        }

        let endpoint = WebhookEndpoint {
            id: id.clone(),
            url: params.url.clone().unwrap_or_default(),
            enabled_events: params.enabled_events.clone().unwrap_or_default(),
            description: params.description.clone().filter(|d| !d.is_empty()),
            status: status_for(params.disabled.unwrap_or(false)),
            metadata,
            secret: None,
            ..Default::default()
        };
        inner.endpoints.insert(id, endpoint.clone());

        Ok(WebhookEndpoint {
            secret: Some(secret),
            ..endpoint
        })
    }

    fn update(&self, id: &str, params: &WebhookEndpointParams) -> Result<WebhookEndpoint> {
        self.record(Call::Update(id.to_string(), params.clone()), Op::Update)?;

        let mut inner = self.inner.borrow_mut();
        let endpoint = inner
            .endpoints
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found("webhook_endpoint", id))?;

        if let Some(url) = &params.url {
            endpoint.url = url.clone();
        }
        if let Some(events) = &params.enabled_events {
            endpoint.enabled_events = events.clone();
        }
        if let Some(description) = &params.description {
            endpoint.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(disabled) = params.disabled {
            endpoint.status = status_for(disabled);
        }
        if let Some(changes) = &params.metadata {
            apply_metadata(&mut endpoint.metadata, changes);
        }

        Ok(endpoint.clone())
    }

    fn delete(&self, id: &str) -> Result<WebhookEndpoint> {
        self.record(Call::Delete(id.to_string()), Op::Delete)?;

        let mut inner = self.inner.borrow_mut();
        inner
            .endpoints
            .remove(id)
            .map(|endpoint| WebhookEndpoint {
                deleted: true,
                ..endpoint
            })
            .ok_or_else(|| ApiError::not_found("webhook_endpoint", id))
    }
}
