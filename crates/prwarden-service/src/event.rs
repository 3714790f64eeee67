use serde_json::Value;

use crate::caching::ScopeId;

/// One webhook delivery, as received from GitHub.
#[derive(Clone, Debug)]
pub struct WebhookEvent {
    /// The event name from the `X-GitHub-Event` header, e.g. `pull_request`.
    pub name: String,
    /// The delivery id from `X-GitHub-Delivery`, used as the cache scope for
    /// everything fetched while handling this delivery.
    pub delivery: ScopeId,
    /// The raw JSON payload.
    pub payload: Value,
}

impl WebhookEvent {
    pub fn new(name: impl Into<String>, delivery: ScopeId, payload: Value) -> Self {
        Self {
            name: name.into(),
            delivery,
            payload,
        }
    }

    /// The `action` field of the payload, if any.
    pub fn action(&self) -> Option<&str> {
        self.payload["action"].as_str()
    }

    /// A string field of the named payload object, e.g. `("comment", "url")`.
    ///
    /// Hooks only pull *URLs* out of the payload; the resources themselves
    /// are always re-fetched from the API rather than trusted as delivered.
    pub fn url(&self, object: &'static str, field: &'static str) -> crate::error::Result<&str> {
        self.payload[object][field]
            .as_str()
            .ok_or(crate::error::Error::Payload(field))
    }
}
