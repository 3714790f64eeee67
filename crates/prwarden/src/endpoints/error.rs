use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// An error for the webhook endpoint, carrying the status code to report.
#[derive(Debug)]
pub struct ResponseError {
    status: StatusCode,
    err: anyhow::Error,
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            err: err.into(),
        }
    }
}

impl From<prwarden_service::Error> for ResponseError {
    fn from(err: prwarden_service::Error) -> Self {
        // A hook failing against the upstream API is GitHub's 5xx or our
        // exhausted retry budget, not a bad request.
        Self {
            status: StatusCode::BAD_GATEWAY,
            err: err.into(),
        }
    }
}

impl From<crate::signature::SignatureError> for ResponseError {
    fn from(err: crate::signature::SignatureError) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            err: err.into(),
        }
    }
}

impl From<(StatusCode, &'static str)> for ResponseError {
    fn from((status, msg): (StatusCode, &'static str)) -> Self {
        Self {
            status,
            err: anyhow::anyhow!(msg),
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            message: String,
        }

        tracing::warn!(status = %self.status, "error handling delivery: {:#}", self.err);

        let body = Body {
            message: self.err.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}
