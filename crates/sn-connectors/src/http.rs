//! HTTP client for the telemetry API.
//!
//! Requests are sent exactly once: the pollers retry on their next tick, and
//! analysis failures are reported to the operator instead of being retried.

use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Characters of an undecodable body kept in the error message.
const BODY_EXCERPT_CHARS: usize = 300;

/// Returns whether TLS verification may be disabled in this build.
pub fn can_disable_tls_verification() -> bool {
    cfg!(debug_assertions)
}

/// Whether certificates will actually be verified for `config`.
fn verifies_tls(config: &ConnectorConfig) -> bool {
    if config.verify_tls {
        return true;
    }
    if can_disable_tls_verification() {
        warn!(
            api = %config.base_url,
            "TLS certificate verification DISABLED, development builds only"
        );
        false
    } else {
        warn!(
            api = %config.base_url,
            "api.verify_tls is false but this is a release build; verifying certificates anyway"
        );
        true
    }
}

/// Header map sent with every request. Entries that are not valid HTTP
/// headers are dropped with a warning.
fn default_headers(config: &ConnectorConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let parsed = HeaderName::try_from(name.as_str())
            .ok()
            .zip(HeaderValue::try_from(value.as_str()).ok());
        match parsed {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => warn!(header = %name, "Ignoring invalid header from configuration"),
        }
    }
    headers
}

/// HTTP client bound to one telemetry API.
pub struct HttpClient {
    client: Client,
    config: ConnectorConfig,
}

impl HttpClient {
    pub fn new(config: ConnectorConfig) -> ConnectorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!verifies_tls(&config))
            .default_headers(default_headers(&config))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Joins `path` onto the base URL with exactly one slash between them.
    pub fn build_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// GET whose body is ignored.
    pub async fn get(&self, path: &str) -> ConnectorResult<Response> {
        self.send(self.client.get(self.build_url(path))).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectorResult<T> {
        let response = self.get(path).await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ConnectorResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.build_url(path)).json(body);
        decode(self.send(request).await?).await
    }

    /// Sends `request` once. Transport failures are classified; any non-2xx
    /// status is an error.
    async fn send(&self, request: RequestBuilder) -> ConnectorResult<Response> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Timeout(e.to_string())
            } else if e.is_connect() {
                ConnectorError::ConnectionFailed(e.to_string())
            } else {
                ConnectorError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        trace!(
            url = %response.url(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );
        if !status.is_success() {
            debug!(
                connector = %self.config.name,
                url = %response.url(),
                status = status.as_u16(),
                "API answered with an error status"
            );
            return Err(ConnectorError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

/// Reads the body and decodes it as JSON.
async fn decode<T: DeserializeOwned>(response: Response) -> ConnectorResult<T> {
    let text = response
        .text()
        .await
        .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| {
        let excerpt: String = text.chars().take(BODY_EXCERPT_CHARS).collect();
        ConnectorError::InvalidResponse(format!("{} (body: {})", e, excerpt))
    })
}
