//! Credential resolution and redaction.

use crate::error::{AUTH_EMPTY, AUTH_INVALID, AUTH_NOT_CONFIGURED, Error, Result};

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV: &str = "WEBFLOW_API_TOKEN";

/// Shortest token length accepted.
pub const MIN_TOKEN_LEN: usize = 10;

/// Resolve the API token, preferring the configured value over the environment.
///
/// An explicitly configured but empty token is an error rather than a reason
/// to fall back, so a typo in the config file is never silently ignored.
pub fn resolve_token(configured: Option<&str>) -> Result<String> {
    resolve_token_from(configured, std::env::var(TOKEN_ENV).ok().as_deref())
}

/// [`resolve_token`] with the environment value supplied by the caller.
pub fn resolve_token_from(configured: Option<&str>, env_value: Option<&str>) -> Result<String> {
    let token = match (configured, env_value) {
        (Some(token), _) | (None, Some(token)) => token,
        (None, None) => {
            return Err(Error::configuration(
                AUTH_NOT_CONFIGURED,
                format!(
                    "Webflow API token is not configured. Set `api_token` in the flowsync \
                     config file or export {TOKEN_ENV}. Tokens are created under \
                     Site Settings > Apps & Integrations > API Access"
                ),
            ));
        }
    };
    validate_token(token)?;
    Ok(token.trim().to_string())
}

/// Check that a token is usable.
pub fn validate_token(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::configuration(
            AUTH_EMPTY,
            format!(
                "Webflow API token is empty. Provide a non-empty token via `api_token` \
                 or {TOKEN_ENV}"
            ),
        ));
    }
    if token.len() < MIN_TOKEN_LEN {
        return Err(Error::configuration(
            AUTH_INVALID,
            format!(
                "Webflow API token is too short ({} characters, expected at least \
                 {MIN_TOKEN_LEN}). Copy the full token from the Webflow dashboard",
                token.len()
            ),
        ));
    }
    Ok(())
}

/// Render a credential for logs.
#[must_use]
pub fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else {
        "[REDACTED]"
    }
}
