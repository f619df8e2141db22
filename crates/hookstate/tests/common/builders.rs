//! Builders for declarations and manifests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use hookstate::resource::webhook_endpoint::{
    DESCRIPTION, DISABLED, ENABLED_EVENTS, METADATA, URL,
};
use hookstate::state::Attributes;
use hookstate::{Manifest, ResourceKind, Value};

/// Builder for a webhook endpoint declaration.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    url: String,
    events: Vec<String>,
    description: Option<String>,
    disabled: Option<bool>,
    metadata: Option<BTreeMap<String, String>>,
}

impl EndpointBuilder {
    /// A declaration for `url` subscribed to `charge.succeeded`.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            events: vec!["charge.succeeded".to_string()],
            description: None,
            disabled: None,
            metadata: None,
        }
    }

    pub fn events(mut self, events: &[&str]) -> Self {
        self.events = events.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Declares metadata as an empty map.
    pub fn empty_metadata(mut self) -> Self {
        self.metadata = Some(BTreeMap::new());
        self
    }

    pub fn build(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(URL.to_string(), Value::from(self.url.clone()));
        attrs.insert(ENABLED_EVENTS.to_string(), Value::from(self.events.clone()));
        if let Some(description) = &self.description {
            attrs.insert(DESCRIPTION.to_string(), Value::from(description.clone()));
        }
        if let Some(disabled) = self.disabled {
            attrs.insert(DISABLED.to_string(), Value::from(disabled));
        }
        if let Some(metadata) = &self.metadata {
            attrs.insert(METADATA.to_string(), Value::from(metadata.clone()));
        }
        attrs
    }

    pub fn manifest(&self, name: &str) -> Manifest {
        Manifest::new(ResourceKind::WebhookEndpoint, name, self.build())
    }
}

/// Renders manifests as a multi-document YAML file.
pub fn manifests_yaml(manifests: &[Manifest]) -> String {
    manifests
        .iter()
        .map(|m| serde_yaml::to_string(m).expect("manifest serializes"))
        .collect::<Vec<_>>()
        .join("---\n")
}
