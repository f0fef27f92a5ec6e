//! The transport contract the retry layer decorates. The core consumes a
//! `fetch(url, init)`-shaped async function (§1, §6) so it can be mocked or
//! cassette-replayed; this crate never constructs a real HTTP client.

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use std::collections::HashMap;

/// A transport-agnostic HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: HashMap::new(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A transport-agnostic HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A transport-level failure: connection refused, DNS failure, reset, a
/// cancellation signal firing mid-flight, etc. Distinct from an HTTP error
/// response, which is represented as a successfully-received `HttpResponse`
/// carrying a non-2xx status.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
    /// `false` when this transport error is the caller's own cancellation —
    /// those must not be retried (§4.D).
    pub is_retryable_network_error: bool,
}

impl TransportError {
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable_network_error: true,
        }
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            message: "cancelled".to_string(),
            is_retryable_network_error: false,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// The injected transport capability. Implementations wrap a real HTTP
/// client, a recording/replay cassette, or an in-test fake.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<F> Fetch for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}
