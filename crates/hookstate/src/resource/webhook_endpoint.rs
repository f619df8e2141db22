//! `stripe_webhook_endpoint`: schema and lifecycle handlers.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use super::Resource;
use crate::api::{Client, WebhookEndpointApi, WebhookEndpointParams};
use crate::diagnostics::{collect_writes, Diagnostic, DiagnosticKind, Diagnostics};
use crate::schema::{FieldSchema, FieldType, ResourceSchema};
use crate::state::ResourceState;
use crate::value;

pub const TYPE_NAME: &str = "stripe_webhook_endpoint";
pub const KIND: &str = "WebhookEndpoint";

pub const ID: &str = "id";
pub const URL: &str = "url";
pub const ENABLED_EVENTS: &str = "enabled_events";
pub const DESCRIPTION: &str = "description";
pub const SECRET: &str = "secret";
pub const DISABLED: &str = "disabled";
pub const METADATA: &str = "metadata";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .describe("A webhook endpoint that receives event notifications.")
        .field(
            FieldSchema::computed(ID, FieldType::String)
                .describe("Unique identifier for the object."),
        )
        .field(
            FieldSchema::required(ENABLED_EVENTS, FieldType::StringList).describe(
                "The list of events to enable for this endpoint. \
                 ['*'] enables all events except those that require explicit selection.",
            ),
        )
        .field(
            FieldSchema::required(URL, FieldType::String)
                .describe("The URL of the webhook endpoint."),
        )
        .field(
            FieldSchema::optional(DESCRIPTION, FieldType::String)
                .describe("An optional description of what the webhook is used for."),
        )
        .field(
            FieldSchema::computed(SECRET, FieldType::String)
                .sensitive()
                .describe("The endpoint's signing secret. Only returned at creation."),
        )
        .field(
            FieldSchema::optional(DISABLED, FieldType::Bool)
                .with_default(false)
                .describe("Disable the webhook endpoint if set to true."),
        )
        .field(
            FieldSchema::optional(METADATA, FieldType::StringMap)
                .describe("Key-value pairs attached to the object."),
        )
}

/// Handlers for `stripe_webhook_endpoint`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookEndpointResource;

impl Resource for WebhookEndpointResource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn read(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
        read(client.webhook_endpoints.as_ref(), d)
    }

    fn create(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
        create(client.webhook_endpoints.as_ref(), d)
    }

    fn update(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
        update(client.webhook_endpoints.as_ref(), d)
    }

    fn delete(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
        delete(client.webhook_endpoints.as_ref(), d)
    }
}

/// Refreshes `url`, `enabled_events`, `description`, `disabled` and
/// `metadata` from the remote endpoint. `secret` is left untouched.
pub fn read(api: &dyn WebhookEndpointApi, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
    if d.id().is_empty() {
        return Err(Diagnostic::usage("cannot read a webhook endpoint that has no id").into());
    }

    let endpoint = api.get(d.id())?;
    debug!("Read webhook endpoint {} (status {})", endpoint.id, endpoint.status);

    let disabled = !endpoint.is_enabled();
    collect_writes([
        d.set(ENABLED_EVENTS, endpoint.enabled_events.into()),
        d.set(URL, endpoint.url.into()),
        d.set(DESCRIPTION, endpoint.description.into()),
        d.set(DISABLED, disabled.into()),
        d.set(METADATA, endpoint.metadata.into()),
    ])
}

pub fn create(api: &dyn WebhookEndpointApi, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
    if d.get_ok(DISABLED).is_some_and(|v| value::to_bool(&v)) {
        return Err(Diagnostic::usage(
            "disabled can only be set when updating an existing webhook endpoint",
        )
        .with_attribute(DISABLED)
        .into());
    }

    let mut params = WebhookEndpointParams {
        url: Some(d.string(URL)),
        enabled_events: Some(d.string_list(ENABLED_EVENTS)),
        idempotency_key: Some(uuid::Uuid::new_v4().to_string()),
        ..Default::default()
    };
    if let Some(description) = d.get_ok(DESCRIPTION) {
        params.description = Some(value::to_string(&description));
    }
    if let Some(metadata) = d.get_ok(METADATA) {
        for (key, val) in value::to_string_map(&metadata) {
            params.add_metadata(key, val);
        }
    }

    info!("Creating webhook endpoint for {}", d.string(URL));
    let endpoint = api.create(&params)?;

    if let Err(e) = d.commit_created(&endpoint.id, vec![(SECRET, endpoint.secret.clone().into())])
    {
        warn!(
            "Webhook endpoint {} was created but could not be recorded: {}",
            endpoint.id, e
        );
        let mut diags = Diagnostics::from(e);
        diags.push(Diagnostic::warning(
            DiagnosticKind::State,
            format!(
                "webhook endpoint {} exists remotely but is not tracked; delete it manually",
                endpoint.id
            ),
        ));
        return Err(diags);
    }

    info!("Created webhook endpoint {}", endpoint.id);
    read(api, d)
}

pub fn update(api: &dyn WebhookEndpointApi, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
    if d.id().is_empty() {
        return Err(Diagnostic::usage("cannot update a webhook endpoint that has no id").into());
    }

    let mut params = WebhookEndpointParams::default();

    if d.has_change(ENABLED_EVENTS) {
        params.enabled_events = Some(d.string_list(ENABLED_EVENTS));
    }
    if d.has_change(URL) {
        params.url = Some(d.string(URL));
    }
    if d.has_change(DESCRIPTION) {
        params.description = Some(d.string(DESCRIPTION));
    }
    if d.has_change(DISABLED) {
        params.disabled = Some(d.bool(DISABLED));
    }
    if d.has_change(METADATA) {
        params.metadata = Some(replacement_metadata(
            &value::to_string_map(&d.prior(METADATA)),
            d.string_map(METADATA),
        ));
    }

    let fields = params.field_names();
    if fields.is_empty() {
        debug!("Webhook endpoint {} has no changes to send", d.id());
        return read(api, d);
    }

    info!("Updating webhook endpoint {} ({})", d.id(), fields.join(", "));
    let id = d.id().to_string();
    api.update(&id, &params)?;

    read(api, d)
}

pub fn delete(api: &dyn WebhookEndpointApi, d: &mut dyn ResourceState) -> Result<(), Diagnostics> {
    if d.id().is_empty() {
        return Err(Diagnostic::usage("cannot delete a webhook endpoint that has no id").into());
    }

    let id = d.id().to_string();
    info!("Deleting webhook endpoint {}", id);
    api.delete(&id)?;

    d.set_id("");
    Ok(())
}

/// The metadata to send when it changed: every declared key, plus an
/// empty value for each previously resolved key that is gone, which the
/// API treats as removal.
fn replacement_metadata(
    prior: &BTreeMap<String, String>,
    declared: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut metadata = declared;
    for key in prior.keys() {
        metadata.entry(key.clone()).or_default();
    }
    metadata
}
