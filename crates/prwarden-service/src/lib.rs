//! prwarden-service
//!
//! The behavior behind the prwarden bot: a deduplicating, retrying cache in
//! front of the GitHub API, the webhook hooks that use it (news-fragment
//! check, merge-conflict labeling, comment commands), and the periodic
//! conflict sweep.

pub mod caching;
pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod gh;
pub mod hooks;
pub mod retry;
pub mod service;
pub mod sweep;

pub use caching::{ItemCache, ScopeId};
pub use error::{Error, Result};
pub use event::WebhookEvent;
pub use retry::{Attempt, RetryPolicy};
pub use service::Service;
