//! Transport trait and implementations for executing API requests.
//!
//! A [`Transport`] performs exactly one HTTP exchange. Retrying, status
//! classification and JSON decoding live in [`crate::client::ApiClient`], so
//! the same logic runs over the real [`http::HttpTransport`] and the scripted
//! [`MockTransport`].
//!
//! # Testing
//!
//! ```
//! use flowkit::transport::{MockTransport, Transport};
//! use flowkit::{ApiRequest, CancelToken, Method, RawResponse};
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "/v2/sites/abc/robots_txt", RawResponse::new(200, "{}"));
//!
//! let request = ApiRequest::new(Method::Get, "/v2/sites/abc/robots_txt");
//! let response = mock.execute(&request, &CancelToken::new()).unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.request_count(), 1);
//! ```

pub mod http;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::types::{API_VERSION, ApiRequest, Method, RawResponse};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// Executes a single HTTP exchange.
///
/// Implementations return `Ok` for every HTTP status (including 4xx/5xx),
/// `Err(Network)` for connection-level failures, and `Err(Cancelled)` once
/// the token fires.
pub trait Transport: Send + Sync {
    /// Execute one request.
    fn execute(&self, request: &ApiRequest, cancel: &CancelToken) -> Result<RawResponse>;
}

/// Return a copy of `request` carrying the authentication headers.
///
/// Headers the caller set with the same names are replaced. The input is
/// left untouched.
#[must_use]
pub fn authorize(request: &ApiRequest, token: &str, user_agent: &str) -> ApiRequest {
    const MANAGED: [&str; 3] = ["authorization", "accept-version", "user-agent"];

    let mut prepared = request.clone();
    prepared
        .headers
        .retain(|(name, _)| !MANAGED.iter().any(|m| name.eq_ignore_ascii_case(m)));
    prepared
        .headers
        .push(("Authorization".to_string(), format!("Bearer {token}")));
    prepared
        .headers
        .push(("Accept-Version".to_string(), API_VERSION.to_string()));
    prepared
        .headers
        .push(("User-Agent".to_string(), user_agent.to_string()));
    prepared
}

// ============================================================================
// Mock transport
// ============================================================================

#[derive(Debug, Clone)]
enum Scripted {
    Respond(RawResponse),
    NetworkError(String),
}

/// Scripted in-memory transport for tests.
///
/// Responses are queued per `(method, path)`. The last queued entry for a
/// route repeats once the queue drains, so a single `429` scripts a server
/// that is rate limited forever. Unscripted routes answer `404`. Every
/// request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    /// Create a new mock with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route.
    pub fn respond(&self, method: Method, path: impl Into<String>, response: RawResponse) {
        self.push(method, path.into(), Scripted::Respond(response));
    }

    /// Queue a JSON response for a route.
    pub fn respond_json(
        &self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        body: &serde_json::Value,
    ) {
        self.respond(method, path, RawResponse::new(status, body.to_string()));
    }

    /// Queue a connection failure for a route.
    pub fn fail(&self, method: Method, path: impl Into<String>, message: impl Into<String>) {
        self.push(method, path.into(), Scripted::NetworkError(message.into()));
    }

    /// All requests executed so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests executed so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, method: Method, path: String, entry: Scripted) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, path))
            .or_default()
            .push_back(entry);
    }

    fn next(&self, method: Method, path: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &ApiRequest, cancel: &CancelToken) -> Result<RawResponse> {
        cancel.check()?;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.next(request.method, &request.path) {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::NetworkError(message)) => Err(Error::Network {
                attempts: 1,
                message,
            }),
            None => Ok(RawResponse::new(404, r#"{"message":"Resource not found"}"#)),
        }
    }
}
