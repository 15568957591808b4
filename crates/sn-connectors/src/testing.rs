//! Testing harness for the HTTP connector.
//!
//! [`TestServer`] is an axum router on a local port serving canned responses
//! per path, so connector tests run without the real API.

use crate::config::ConnectorConfig;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Creates a test connector config with sensible defaults.
pub fn test_connector_config(name: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        timeout_secs: 5,
        verify_tls: true,
        headers: HashMap::new(),
    }
}

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl CannedResponse {
    /// Response with the given status and JSON body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// 200 response with a JSON body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::json(200, body)
    }

    /// Delays the response.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request received by the test server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

struct ServerState {
    routes: HashMap<String, CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ServerState {
    fn recorded(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Local HTTP responder. Paths without a canned response get a 404.
pub struct TestServer {
    base_url: String,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Binds to an ephemeral port and starts serving.
    pub async fn start(routes: Vec<(&str, CannedResponse)>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let state = Arc::new(ServerState {
            routes: routes
                .into_iter()
                .map(|(path, response)| (path.to_string(), response))
                .collect(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            state,
            handle,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.recorded().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Records the request, then answers with the canned response for its path.
async fn respond(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    body: String,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    state.recorded().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        body,
    });

    let canned = state
        .routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| CannedResponse::json(404, r#"{"detail":"Not Found"}"#));
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_connector_config() {
        let config = test_connector_config("test", "http://127.0.0.1:8000");
        assert_eq!(config.name, "test");
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert!(config.headers.is_empty());
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = TestServer::start(vec![("/", CannedResponse::ok("{}"))])
            .await
            .unwrap();
        assert!(server.base_url().starts_with("http://127.0.0.1:"));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_server_records_unrouted_requests_as_404() {
        let server = TestServer::start(vec![]).await.unwrap();
        let client =
            crate::http::HttpClient::new(test_connector_config("test", server.base_url())).unwrap();

        let err = client.get("/api/unknown?page=2").await.unwrap_err();
        assert_eq!(err, crate::error::ConnectorError::HttpStatus { status: 404 });

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/unknown");
        assert!(requests[0].body.is_empty());
    }
}
