//! HTTPS transport backed by ureq.
//!
//! # Transport security
//!
//! ureq's rustls backend only negotiates TLS 1.2 and 1.3, so the TLS 1.2
//! floor holds for every connection. Plain `http://` is accepted solely for
//! loopback hosts, which lets integration tests run a local mock server.

use super::{Transport, authorize};
use crate::auth::{redact, validate_token};
use crate::cancel::CancelToken;
use crate::error::{CONFIG_INSECURE_URL, Error, Result, truncate_for_log};
use crate::types::{ApiRequest, ClientConfig, Method, RawResponse};
use log::{debug, trace};
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

/// Authenticated HTTPS transport.
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    token: String,
    user_agent: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is empty or malformed, or
    /// if the base URL is not HTTPS.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        validate_token(&config.token)?;
        check_base_url(&config.base_url)?;

        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .into();

        debug!(
            "HTTP transport ready: base_url={}, timeout={}s, token={}",
            config.base_url,
            config.timeout.as_secs(),
            redact(&config.token)
        );

        Ok(Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.trim().to_string(),
            user_agent: config.user_agent(),
            timeout: config.timeout,
        })
    }

    /// Get the API origin this transport talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, err: &ureq::Error, timeout: Duration, cancel: &CancelToken) -> Error {
        if cancel.is_cancelled() {
            return cancel.cancelled_error();
        }
        let message = match err {
            ureq::Error::Timeout(_) => format!(
                "request to {} timed out after {}s. The API may be slow or unreachable; \
                 check your connection and retry",
                self.base_url,
                timeout.as_secs_f64()
            ),
            ureq::Error::ConnectionFailed => format!(
                "connection to {} was refused. Check that the host is reachable and \
                 that no firewall or proxy is blocking it",
                self.base_url
            ),
            ureq::Error::HostNotFound => format!(
                "could not resolve {}. Check your DNS settings and internet connection",
                self.base_url
            ),
            ureq::Error::Io(io) => format!("I/O error talking to {}: {io}", self.base_url),
            other => format!("request to {} failed: {other}", self.base_url),
        };
        Error::Network {
            attempts: 1,
            message,
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest, cancel: &CancelToken) -> Result<RawResponse> {
        cancel.check()?;
        let prepared = authorize(request, &self.token, &self.user_agent);
        let timeout = cancel.bound(self.timeout);
        if timeout.is_zero() {
            return Err(cancel.cancelled_error());
        }

        // The blocking call runs on a worker so an explicit cancel can abandon it.
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, prepared.path);
        let response = cancel
            .run(move || exchange(&agent, &url, &prepared, timeout))?
            .map_err(|err| self.classify(&err, timeout, cancel))?;

        trace!(
            "{} -> {}: {}",
            request.describe(),
            response.status,
            truncate_for_log(&response.body, 256)
        );
        Ok(response)
    }
}

/// Send one request and read the whole response.
fn exchange(
    agent: &Agent,
    url: &str,
    request: &ApiRequest,
    timeout: Duration,
) -> std::result::Result<RawResponse, ureq::Error> {
    let mut response = match request.method {
        Method::Get => with_headers(agent.get(url), request)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()?,
        Method::Delete => with_headers(agent.delete(url), request)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()?,
        Method::Post => send_body(agent.post(url), request, timeout)?,
        Method::Put => send_body(agent.put(url), request, timeout)?,
        Method::Patch => send_body(agent.patch(url), request, timeout)?,
    };

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = response.body_mut().read_to_string()?;

    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

fn with_headers<B>(mut builder: RequestBuilder<B>, request: &ApiRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<ureq::typestate::WithBody>,
    request: &ApiRequest,
    timeout: Duration,
) -> std::result::Result<Response<Body>, ureq::Error> {
    let builder = with_headers(builder, request)
        .config()
        .timeout_global(Some(timeout))
        .build();
    match &request.body {
        Some(body) => builder.send_json(body),
        None => builder.send_empty(),
    }
}

/// Reject non-HTTPS origins other than loopback.
pub fn check_base_url(base_url: &str) -> Result<()> {
    if base_url.starts_with("https://") {
        return Ok(());
    }
    if let Some(rest) = base_url.strip_prefix("http://") {
        let authority = rest.split('/').next().unwrap_or_default();
        let host = if authority.starts_with('[') {
            authority
                .find(']')
                .map_or(authority, |end| &authority[..=end])
        } else {
            authority.split(':').next().unwrap_or_default()
        };
        if matches!(host, "127.0.0.1" | "localhost" | "[::1]") {
            return Ok(());
        }
    }
    Err(Error::configuration(
        CONFIG_INSECURE_URL,
        format!(
            "API base URL '{base_url}' must use https:// \
             (plain http is only allowed for 127.0.0.1, localhost or [::1])"
        ),
    ))
}
