//! High-level API client: retries, status classification and JSON decoding.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::retry::{self, Attempt, RetryCallback};
use crate::transport::Transport;
use crate::transport::http::HttpTransport;
use crate::types::{ApiRequest, ClientConfig, Method, RawResponse, RetryConfig};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Client for the Webflow Data API.
///
/// Every verb helper runs through [`retry::with_retry`], so rate limiting and
/// transient network failures are absorbed here and never by resource code.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    callback: Option<Arc<dyn RetryCallback + Send + Sync>>,
}

impl ApiClient {
    /// Create a client over the HTTPS transport.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), config.retry.clone()))
    }

    /// Create a client with a custom transport (useful for testing).
    pub fn with_transport(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            retry,
            callback: None,
        }
    }

    /// Receive a notification before every retry wait.
    #[must_use]
    pub fn with_retry_callback(mut self, callback: Arc<dyn RetryCallback + Send + Sync>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Get the retry policy.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Send a request with retry, returning the first non-429 response.
    ///
    /// Non-success statuses are returned as-is for the caller to classify.
    pub fn send(&self, request: &ApiRequest, cancel: &CancelToken) -> Result<RawResponse> {
        let callback = self
            .callback
            .as_deref()
            .map(|cb| cb as &dyn RetryCallback);

        retry::with_retry(&self.retry, cancel, callback, |attempt| {
            let response = self.transport.execute(request, cancel)?;
            debug!(
                "{} -> {} (attempt {attempt})",
                request.describe(),
                response.status
            );
            if response.status == 429 {
                return Ok(Attempt::RateLimited {
                    retry_after: retry::parse_retry_after(response.header("retry-after")),
                });
            }
            Ok(Attempt::Done(response))
        })
    }

    /// Send a request and require a 2xx status.
    pub fn send_ok(&self, request: &ApiRequest, cancel: &CancelToken) -> Result<RawResponse> {
        let response = self.send(request, cancel)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::from_status(
                response.status,
                &response.body,
                &request.describe(),
            ))
        }
    }

    // =========================================================================
    // JSON verb helpers
    // =========================================================================

    /// GET and decode.
    pub fn get<T: DeserializeOwned>(&self, path: &str, cancel: &CancelToken) -> Result<T> {
        self.json(ApiRequest::new(Method::Get, path), cancel)
    }

    /// POST a JSON body and decode.
    pub fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        cancel: &CancelToken,
    ) -> Result<T> {
        self.json(ApiRequest::new(Method::Post, path).with_body(body), cancel)
    }

    /// PUT a JSON body and decode.
    pub fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        cancel: &CancelToken,
    ) -> Result<T> {
        self.json(ApiRequest::new(Method::Put, path).with_body(body), cancel)
    }

    /// PATCH a JSON body and decode.
    pub fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        cancel: &CancelToken,
    ) -> Result<T> {
        self.json(ApiRequest::new(Method::Patch, path).with_body(body), cancel)
    }

    /// DELETE a resource. A 404 counts as success.
    pub fn delete(&self, path: &str, cancel: &CancelToken) -> Result<()> {
        let request = ApiRequest::new(Method::Delete, path);
        let response = self.send(&request, cancel)?;
        match response.status {
            status if (200..300).contains(&status) => Ok(()),
            404 => {
                debug!("{} -> 404, already gone", request.describe());
                Ok(())
            }
            status => Err(Error::from_status(
                status,
                &response.body,
                &request.describe(),
            )),
        }
    }

    fn json<T: DeserializeOwned>(&self, request: ApiRequest, cancel: &CancelToken) -> Result<T> {
        let response = self.send_ok(&request, cancel)?;
        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(body).map_err(|err| Error::Decode {
            message: format!("{}: {err}", request.describe()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::time::Duration;

    fn client(mock: &MockTransport) -> ApiClient {
        ApiClient::with_transport(
            Arc::new(mock.clone()),
            RetryConfig::new(3, Duration::from_millis(1), Duration::from_millis(5)),
        )
    }

    #[test]
    fn test_get_decodes_json() {
        let mock = MockTransport::new();
        mock.respond_json(Method::Get, "/v2/x", 200, &json!({"id": "abc"}));

        let value: Value = client(&mock).get("/v2/x", &CancelToken::new()).unwrap();
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn test_rate_limited_then_success() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "/v2/x", RawResponse::new(429, ""));
        mock.respond_json(Method::Get, "/v2/x", 200, &json!({}));

        let _: Value = client(&mock).get("/v2/x", &CancelToken::new()).unwrap();
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_rate_limited_forever_uses_full_budget() {
        let mock = MockTransport::new();
        mock.respond(Method::Post, "/v2/x", RawResponse::new(429, ""));

        let err = client(&mock)
            .post::<Value>("/v2/x", json!({}), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { attempts: 4, .. }));
        assert_eq!(mock.request_count(), 4);
    }

    #[test]
    fn test_server_error_not_retried() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "/v2/x", RawResponse::new(500, "boom"));

        let err = client(&mock)
            .get::<Value>("/v2/x", &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let mock = MockTransport::new();
        let err = client(&mock)
            .get::<Value>("/v2/missing", &CancelToken::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mock = MockTransport::new();
        mock.respond(Method::Delete, "/v2/x", RawResponse::new(204, ""));
        mock.respond(Method::Delete, "/v2/x", RawResponse::new(404, ""));

        let api = client(&mock);
        api.delete("/v2/x", &CancelToken::new()).unwrap();
        api.delete("/v2/x", &CancelToken::new()).unwrap();
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_delete_forbidden_is_error() {
        let mock = MockTransport::new();
        mock.respond(Method::Delete, "/v2/x", RawResponse::new(403, ""));
        assert!(client(&mock).delete("/v2/x", &CancelToken::new()).is_err());
    }

    #[test]
    fn test_network_failure_retried() {
        let mock = MockTransport::new();
        mock.fail(Method::Get, "/v2/x", "connection reset");
        mock.respond_json(Method::Get, "/v2/x", 200, &json!({"ok": true}));

        let value: Value = client(&mock).get("/v2/x", &CancelToken::new()).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_undecodable_body() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "/v2/x", RawResponse::new(200, "<html>"));

        let err = client(&mock)
            .get::<Value>("/v2/x", &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let mock = MockTransport::new();
        mock.respond(Method::Put, "/v2/x", RawResponse::new(200, ""));

        let value: Value = client(&mock)
            .put("/v2/x", json!({}), &CancelToken::new())
            .unwrap();
        assert!(value.is_null());
    }
}
