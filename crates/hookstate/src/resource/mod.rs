//! Lifecycle handlers for managed resource types.
//!
//! Every resource type contributes a schema and the four lifecycle
//! operations. Operations receive the API [`Client`] and the resource's
//! state; they never hold either.

pub mod webhook_endpoint;

use crate::api::Client;
use crate::diagnostics::Diagnostics;
use crate::schema::ResourceSchema;
use crate::state::ResourceState;

pub use webhook_endpoint::WebhookEndpointResource;

/// One managed resource type.
pub trait Resource {
    /// Manifest kind, e.g. `WebhookEndpoint`.
    fn kind(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Refreshes resolved state from the remote object.
    fn read(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics>;

    /// Creates the remote object and records its identity.
    fn create(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics>;

    /// Sends the changed fields to the remote object.
    fn update(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics>;

    /// Deletes the remote object and clears the identity.
    fn delete(&self, client: &Client, d: &mut dyn ResourceState) -> Result<(), Diagnostics>;
}

/// Every resource type this crate manages.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![Box::new(WebhookEndpointResource)]
}
