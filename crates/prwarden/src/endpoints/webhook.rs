use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use prwarden_service::{ScopeId, Service, WebhookEvent};

use super::ResponseError;
use crate::signature;

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// `POST /hooks/github`: one webhook delivery.
pub async fn handle_webhook(
    State(service): State<Arc<Service>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ResponseError> {
    // Verify the payload against the signature before looking at it.
    if let Some(secret) = &service.github_config().webhook_secret {
        signature::verify(
            secret,
            header(&headers, "X-Hub-Signature-256"),
            header(&headers, "X-Hub-Signature"),
            &body,
        )?;
    }

    let name = header(&headers, "X-GitHub-Event")
        .ok_or((StatusCode::BAD_REQUEST, "missing X-GitHub-Event header"))?
        .to_owned();

    // The delivery id partitions the item cache; GitHub always sends one,
    // but a hand-crafted replay without it still gets a fresh scope.
    let delivery = header(&headers, "X-GitHub-Delivery")
        .map(ScopeId::new)
        .unwrap_or_else(ScopeId::random);

    let payload: Value = serde_json::from_slice(&body)?;
    let event = WebhookEvent::new(name, delivery, payload);

    tracing::info!(
        event = %event.name,
        action = event.action().unwrap_or_default(),
        delivery = %event.delivery,
        "received delivery"
    );

    let ran = service.handle(&event).await?;
    let message = if ran.is_empty() {
        "skipped".to_owned()
    } else {
        format!("ran: {}", ran.join(", "))
    };

    Ok(Json(json!({ "message": message })))
}
