//! Helpers for testing the web server and hooks.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all
//!    console output is captured by the test runner.
//!
//!  - When using [`MockGitHub`], keep the instance alive until all requests
//!    against it have been made; dropping it aborts the server task.

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{OriginalUri, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from prwarden crates
///    and mutes everything else.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("prwarden_service=trace,prwarden=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// A test server that binds to a random port and serves a web app.
///
/// This server requires a `tokio` runtime and is supposed to be run in a
/// `tokio::test`. It automatically stops serving when dropped.
#[derive(Debug)]
pub struct Server {
    pub handle: tokio::task::JoinHandle<()>,
    pub socket: SocketAddr,
}

impl Server {
    /// Spawns the server for the given router on an ephemeral port.
    pub async fn with_router(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let socket = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns the port that this server listens on.
    pub fn port(&self) -> u16 {
        self.socket.port()
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://127.0.0.1:{}/{}", self.port(), path)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One canned response of the [`MockGitHub`] server.
#[derive(Clone, Debug)]
struct CannedResponse {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    /// An optional `Link` header, for pagination tests.
    link: Option<String>,
}

/// One request the [`MockGitHub`] server received.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    /// Canned responses keyed by `METHOD path`. The last response of a queue
    /// repeats once the earlier ones have been served.
    responses: Mutex<BTreeMap<String, VecDeque<CannedResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A scriptable stand-in for the GitHub API.
///
/// Tests register canned responses per method and path, point the client's
/// `api_url` at [`MockGitHub::url`], and afterwards assert on the requests
/// the code under test made.
#[derive(Debug)]
pub struct MockGitHub {
    state: Arc<MockState>,
    server: Server,
}

async fn respond(
    State(state): State<Arc<MockState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    request: Request,
) -> Response {
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|_| Bytes::new());
    let body = serde_json::from_slice(&bytes).ok();

    let path = uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| uri.path().to_string());

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        body,
    });

    let key = format!("{method} {path}");
    let canned = {
        let mut responses = state.responses.lock().unwrap();
        responses.get_mut(&key).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    match canned {
        Some(canned) => {
            let mut response = Response::builder()
                .status(canned.status)
                .header(header::CONTENT_TYPE, canned.content_type);
            if let Some(link) = &canned.link {
                response = response.header(header::LINK, link);
            }
            response.body(canned.body.into()).unwrap()
        }
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"message":"Not Found"}"#,
        )
            .into_response(),
    }
}

impl MockGitHub {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = Router::new().fallback(respond).with_state(state.clone());
        let server = Server::with_router(router).await;

        Self { state, server }
    }

    /// The base URL tests plug into the client's `api_url`.
    pub fn url(&self, path: &str) -> String {
        self.server.url(path)
    }

    fn push(&self, method: &str, path: &str, canned: CannedResponse) {
        self.state
            .responses
            .lock()
            .unwrap()
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(canned);
    }

    /// Registers a JSON response. Registering several responses for the same
    /// method and path serves them in order, repeating the last one.
    pub fn respond(&self, method: &str, path: &str, body: Value) -> &Self {
        self.respond_with_status(method, path, 200, body)
    }

    pub fn respond_with_status(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        self.push(
            method,
            path,
            CannedResponse {
                status: StatusCode::from_u16(status).unwrap(),
                content_type: "application/json",
                body: body.to_string(),
                link: None,
            },
        );
        self
    }

    /// Registers a plain-text response, e.g. a diff body.
    pub fn respond_text(&self, method: &str, path: &str, body: &str) -> &Self {
        self.push(
            method,
            path,
            CannedResponse {
                status: StatusCode::OK,
                content_type: "text/plain",
                body: body.to_owned(),
                link: None,
            },
        );
        self
    }

    /// Registers a JSON response carrying a `Link: <...>; rel="next"` header
    /// pointing at `next_path` on this server.
    pub fn respond_page(&self, method: &str, path: &str, body: Value, next_path: &str) -> &Self {
        self.push(
            method,
            path,
            CannedResponse {
                status: StatusCode::OK,
                content_type: "application/json",
                body: body.to_string(),
                link: Some(format!("<{}>; rel=\"next\"", self.url(next_path))),
            },
        );
        self
    }

    /// All recorded requests, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// How often the given method/path was requested.
    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }
}
