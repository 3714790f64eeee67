//! Webhook behaviors.
//!
//! Each hook declares which deliveries it cares about via
//! [`Hook::matches`] and is then run against the delivery by the
//! [`Service`](crate::service::Service). Hooks re-fetch everything they act
//! on through the item cache instead of trusting the delivered payload;
//! that guards against stale deliveries and against payloads from anyone
//! who managed to hit the endpoint.

use async_trait::async_trait;

use crate::error::Result;
use crate::event::WebhookEvent;
use crate::service::Service;

mod commands;
mod merge_conflict;
mod news;

pub use commands::{CommandHook, RequestReviewCommand};
pub use merge_conflict::{ConflictStatus, MergeConflictHook};
pub use news::NewsFileHook;

pub(crate) use merge_conflict::reconcile_conflict_state;

/// A webhook behavior.
#[async_trait]
pub trait Hook: Send + Sync {
    /// A short name used in logs and endpoint responses.
    fn name(&self) -> &'static str;

    /// Whether this hook wants to handle the delivery.
    fn matches(&self, event: &WebhookEvent) -> bool;

    /// Handles the delivery.
    async fn run(&self, service: &Service, event: &WebhookEvent) -> Result<()>;
}

/// Strips a RFC 6570 template suffix like `{/name}` off a resource URL.
///
/// GitHub hands out templated URLs (`.../labels{/name}`); for plain listing
/// the template part just gets dropped.
pub(crate) fn strip_uri_template(url: &str) -> &str {
    url.split('{').next().unwrap_or(url)
}
