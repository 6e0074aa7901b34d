//! Error types for Webflow API operations.
//!
//! Errors are categorized so callers decide retry and idempotence behavior by
//! inspecting an [`ErrorCategory`] instead of matching on message text. Each
//! variant carries enough context to tell the user what failed, why, and what
//! to do next.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for flowkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error code: no API token configured anywhere.
pub const AUTH_NOT_CONFIGURED: &str = "FLOWSYNC_AUTH_001";
/// Error code: an API token was supplied but is empty.
pub const AUTH_EMPTY: &str = "FLOWSYNC_AUTH_002";
/// Error code: the API token is malformed (too short).
pub const AUTH_INVALID: &str = "FLOWSYNC_AUTH_003";
/// Error code: the API base URL is not HTTPS (and not a loopback test server).
pub const CONFIG_INSECURE_URL: &str = "FLOWSYNC_CONFIG_001";

/// Categories of failures.
///
/// The category decides whether the retry combinator tries again, whether a
/// delete may treat the failure as success, and whether a read reports the
/// resource as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client or credential configuration is unusable.
    Configuration,
    /// User input failed a pre-flight check.
    Validation,
    /// An opaque resource identity could not be decoded.
    InvalidIdentity,
    /// The remote resource does not exist.
    NotFound,
    /// The API kept answering 429.
    RateLimited,
    /// 5xx, unexpected status, or an unreadable response.
    ServerError,
    /// Connection-level failure (refused, DNS, timeout).
    Network,
    /// The caller's cancellation signal fired.
    Cancelled,
}

impl ErrorCategory {
    /// Whether the retry combinator should attempt the call again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }

    /// Whether the failure happened before any network call was attempted.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration | Self::Validation | Self::InvalidIdentity
        )
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration problem",
            Self::Validation => "Invalid input",
            Self::InvalidIdentity => "Malformed resource identity",
            Self::NotFound => "Resource not found",
            Self::RateLimited => "Rate limited by the Webflow API",
            Self::ServerError => "Unexpected API response",
            Self::Network => "Network connectivity issue",
            Self::Cancelled => "Operation cancelled",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "Set an API token with `api_token` in the config file \
                 or the WEBFLOW_API_TOKEN environment variable"
            }
            Self::Validation => "Fix the highlighted field and run again",
            Self::InvalidIdentity => {
                "Check the tracked state file; the identity may belong to another resource kind"
            }
            Self::NotFound => "Verify the referenced IDs exist in the Webflow dashboard",
            Self::RateLimited => "Wait a few minutes before trying again",
            Self::ServerError => "Check the Webflow status page and retry later",
            Self::Network => "Check your internet connection, DNS and proxy settings, then retry",
            Self::Cancelled => "Run the command again when ready",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the Webflow API.
#[derive(Debug, Error)]
pub enum Error {
    /// Client construction or credential resolution failed.
    #[error("[{code}] {message}")]
    Configuration {
        /// Stable error code for automation.
        code: &'static str,
        /// What is wrong and how to fix it.
        message: String,
    },

    /// A user-supplied field failed validation.
    #[error("validation failed for {field}: {message}")]
    Validation {
        /// Field name, with a list position when relevant (`nodes[3].nodeId`).
        field: String,
        /// What was wrong, an example valid value, and where to find one.
        message: String,
    },

    /// A resource identity string does not match the expected shape.
    #[error("invalid resource identity '{id}': expected {expected}")]
    InvalidIdentity {
        /// The identity that failed to decode.
        id: String,
        /// The expected shape, e.g. `{siteId}/redirects/{redirectId}`.
        expected: String,
    },

    /// The remote resource does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Retry budget exhausted while rate limited.
    #[error(
        "rate limited: Webflow API answered HTTP 429 on all {attempts} attempts \
         (last computed wait {}s); wait a few minutes before trying again",
        last_wait.as_secs()
    )]
    RateLimited {
        /// Total attempts made.
        attempts: u32,
        /// The delay computed after the final 429.
        last_wait: Duration,
    },

    /// Connection-level failure, after the retry budget was exhausted.
    #[error("network error after {attempts} attempt(s): {message}")]
    Network {
        /// Total attempts made.
        attempts: u32,
        /// Details and remediation.
        message: String,
    },

    /// Non-success HTTP status that is neither 404 nor 429.
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Status-specific guidance plus the response details.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to parse API response: {message}")]
    Decode {
        /// Parser message.
        message: String,
    },

    /// The caller cancelled the call (or its deadline passed).
    #[error("operation cancelled: {reason}")]
    Cancelled {
        /// Why the call stopped.
        reason: String,
    },
}

impl Error {
    /// Create a validation error for a field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error with a stable code.
    pub fn configuration(code: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a cancellation error.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Build an error from a non-success HTTP status and its body.
    ///
    /// 404 maps to [`Error::NotFound`]; everything else becomes [`Error::Api`]
    /// with guidance that depends on the status.
    pub fn from_status(status: u16, body: &str, what: &str) -> Self {
        let details = truncate_for_log(body.trim(), 512);
        match status {
            404 => Self::not_found(format!(
                "{what} does not exist; verify the IDs are correct (24-character lowercase hex) \
                 and that the resource still exists in the Webflow dashboard"
            )),
            400 => Self::Api {
                status,
                message: format!(
                    "bad request for {what}. Details: {details}. \
                     Check that all required fields are provided with valid values"
                ),
            },
            401 => Self::Api {
                status,
                message: "unauthorized: the Webflow API token is invalid or has expired. \
                          Generate a new token under Site Settings > Apps & Integrations \
                          and update `api_token` or WEBFLOW_API_TOKEN"
                    .to_string(),
            },
            403 => Self::Api {
                status,
                message: format!(
                    "forbidden: the API token lacks the scopes needed for {what}. \
                     Grant the required read/write scopes and make sure the site \
                     belongs to the token's workspace"
                ),
            },
            409 => Self::Api {
                status,
                message: format!(
                    "conflict while writing {what}: {details}. \
                     Another resource may already use this name or slug"
                ),
            },
            500..=599 => Self::Api {
                status,
                message: format!(
                    "server error from Webflow API. Details: {details}. \
                     This is usually temporary; wait a few minutes and retry"
                ),
            },
            _ => Self::Api {
                status,
                message: format!(
                    "unexpected response for {what}: {details}. \
                     Check the Webflow status page if this persists"
                ),
            },
        }
    }

    /// Get the error category for retry and idempotence decisions.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration { .. } => ErrorCategory::Configuration,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::InvalidIdentity { .. } => ErrorCategory::InvalidIdentity,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::RateLimited { .. } => ErrorCategory::RateLimited,
            Error::Network { .. } => ErrorCategory::Network,
            Error::Api { .. } | Error::Decode { .. } => ErrorCategory::ServerError,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Check if this error is worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Check if this error means the resource is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Check if this error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// Shorten a value for inclusion in logs and error messages.
pub fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    let head: String = value.chars().take(max_len).collect();
    format!("{head}... (truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::RateLimited.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::ServerError.is_retryable());
        assert!(!ErrorCategory::Cancelled.is_retryable());
    }

    #[test]
    fn test_local_categories() {
        assert!(ErrorCategory::Validation.is_local());
        assert!(ErrorCategory::InvalidIdentity.is_local());
        assert!(ErrorCategory::Configuration.is_local());
        assert!(!ErrorCategory::Network.is_local());
    }

    #[test]
    fn test_from_status_404_is_not_found() {
        let err = Error::from_status(404, "", "redirect");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("redirect"));
    }

    #[test]
    fn test_from_status_classifies_server_errors() {
        for status in [400, 401, 403, 409, 500, 503, 418] {
            let err = Error::from_status(status, "{\"msg\":\"nope\"}", "webhook");
            assert_eq!(err.category(), ErrorCategory::ServerError, "status {status}");
        }
    }

    #[test]
    fn test_unauthorized_message_has_next_step() {
        let msg = Error::from_status(401, "", "site").to_string();
        assert!(msg.contains("WEBFLOW_API_TOKEN"));
    }

    #[test]
    fn test_rate_limited_message_states_attempts() {
        let err = Error::RateLimited {
            attempts: 4,
            last_wait: Duration::from_secs(8),
        };
        let msg = err.to_string();
        assert!(msg.contains("4 attempts"));
        assert!(msg.contains("8s"));
    }

    #[test]
    fn test_configuration_error_carries_code() {
        let err = Error::configuration(AUTH_EMPTY, "token is empty");
        assert!(err.to_string().starts_with("[FLOWSYNC_AUTH_002]"));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        let long = "x".repeat(20);
        assert_eq!(truncate_for_log(&long, 5), "xxxxx... (truncated)");
    }

    #[test]
    fn test_decode_from_serde() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), ErrorCategory::ServerError);
    }
}
