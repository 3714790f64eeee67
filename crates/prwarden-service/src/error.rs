use reqwest::StatusCode;

/// Errors that can happen when talking to the GitHub API.
///
/// All of these are considered retryable within the configured attempt
/// budget. That notably includes [`Error::NotFound`]: a resource referenced
/// by a webhook delivery may not be visible through the REST API yet, and a
/// handful of delayed retries usually resolves that.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The upstream resource responded with a `404`.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The upstream resource responded with an unexpected status code.
    #[error("GitHub API request failed with status {status}")]
    Api {
        /// The response status code.
        status: StatusCode,
    },

    /// The request failed on the transport level (connect, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// The fetch succeeded transport-wise, but the value does not (yet)
    /// satisfy the caller's success condition.
    ///
    /// For retry purposes this is indistinguishable from a transport error.
    #[error("fetched value does not satisfy the success condition yet")]
    NotReady,

    /// Waiting for the per-key fetch lock exceeded the configured timeout.
    #[error("timed out waiting for the in-flight fetch of the same resource")]
    LockWaitTimeout,

    /// The webhook payload is missing a field the hook relies on.
    #[error("malformed payload: missing {0}")]
    Payload(&'static str),
}

impl Error {
    /// Creates an error from a response status code.
    pub fn from_status(status: StatusCode, url: &str) -> Self {
        if status == StatusCode::NOT_FOUND {
            Error::NotFound(url.to_owned())
        } else {
            Error::Api { status }
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
