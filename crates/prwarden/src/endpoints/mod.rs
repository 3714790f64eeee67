use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use prwarden_service::Service;

mod error;
mod webhook;

pub use error::ResponseError;

pub async fn healthcheck() -> &'static str {
    "ok"
}

pub fn create_app(service: Arc<Service>) -> Router {
    Router::new()
        .route("/hooks/github", post(webhook::handle_webhook))
        .with_state(service)
        .route("/healthcheck", get(healthcheck))
}
