//! Pre-flight input checks.
//!
//! Every function is pure and returns [`Error::Validation`] on failure, with a
//! message that says what was wrong, shows a valid example, and (for IDs)
//! where to find the right value. Resource kinds compose these helpers and
//! stop at the first failure.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Prefix of placeholder identities minted during dry-run previews.
pub const PREVIEW_PREFIX: &str = "preview-";

/// Hex characters following [`PREVIEW_PREFIX`] in a placeholder identity.
pub const PREVIEW_DIGEST_LEN: usize = 16;

/// Example ID shown in messages.
pub const EXAMPLE_ID: &str = "5f0c8c9e1c9d440000e8d8c3";

static HEX_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{24}$").ok());

static PREVIEW_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^preview-[a-f0-9]{16}$").ok());

static PATH_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^/[a-zA-Z0-9\-_/.]*$").ok());

fn is_match(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Whether `value` is a placeholder identity minted by a dry-run preview.
#[must_use]
pub fn is_preview_id(value: &str) -> bool {
    is_match(&PREVIEW_ID_PATTERN, value)
}

/// Field name for an element of a list, e.g. `nodes[3]`.
#[must_use]
pub fn indexed(field: &str, index: usize) -> String {
    format!("{field}[{index}]")
}

/// Require a non-blank string.
pub fn required(field: &str, value: &str, example: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(
            field,
            format!("{field} is required but was not provided. Example: {example}"),
        ));
    }
    Ok(())
}

/// Require a 24-character lowercase hex ID.
///
/// Dry-run placeholders (`preview-` plus 16 hex characters) pass so previews
/// can chain through dependent resources.
pub fn hex_id(field: &str, value: &str, where_to_find: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(
            field,
            format!(
                "{field} is required but was not provided. Provide a 24-character lowercase \
                 hexadecimal ID (e.g., '{EXAMPLE_ID}'). {where_to_find}"
            ),
        ));
    }
    if is_preview_id(value) {
        return Ok(());
    }
    if !is_match(&HEX_ID_PATTERN, value) {
        return Err(Error::validation(
            field,
            format!(
                "{field} has invalid format: got '{value}'. Expected a 24-character lowercase \
                 hexadecimal string (e.g., '{EXAMPLE_ID}') containing only a-f and 0-9. \
                 {where_to_find}"
            ),
        ));
    }
    Ok(())
}

/// Require a URL path: leading `/`, then letters, digits, `-`, `_`, `/`, `.`.
pub fn url_path(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(
            field,
            format!(
                "{field} is required but was not provided. Provide a URL path starting \
                 with '/' (e.g., '/old-page', '/blog/2023')"
            ),
        ));
    }
    if !value.starts_with('/') {
        return Err(Error::validation(
            field,
            format!(
                "{field} must start with '/': got '{value}'. Example valid paths: \
                 '/old-page', '/blog/2023', '/products/item-1'"
            ),
        ));
    }
    if !is_match(&PATH_PATTERN, value) {
        return Err(Error::validation(
            field,
            format!(
                "{field} contains invalid characters: got '{value}'. Allowed characters: \
                 A-Z, a-z, 0-9, hyphens (-), underscores (_), forward slashes (/) and dots (.). \
                 Example: '/products/item-1'"
            ),
        ));
    }
    Ok(())
}

/// Require an `https://` URL with a domain separator after the scheme.
pub fn https_url(field: &str, value: &str, example: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(
            field,
            format!("{field} is required but was not provided. Example: '{example}'"),
        ));
    }
    let Some(rest) = value.strip_prefix("https://") else {
        return Err(Error::validation(
            field,
            format!(
                "{field} must use HTTPS: got '{value}'. Webflow only calls secure endpoints. \
                 Example: '{example}'"
            ),
        ));
    };
    if !rest.contains('.') {
        return Err(Error::validation(
            field,
            format!(
                "{field} appears to be invalid: got '{value}'. Expected https://domain.com/path, \
                 e.g. '{example}'"
            ),
        ));
    }
    Ok(())
}

/// Require one of an enumerated set. The error lists every legal value.
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    let legal = allowed.join(", ");
    let message = if value.is_empty() {
        format!("{field} is required but was not provided. Valid values: {legal}")
    } else {
        format!("{field} '{value}' is not valid. Valid values: {legal}")
    };
    Err(Error::validation(field, message))
}

/// Bound a string's length in characters.
pub fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::validation(
            field,
            format!("{field} is too long: {len} characters (maximum {max}). Use a shorter value"),
        ));
    }
    Ok(())
}

/// Require a non-empty collection.
pub fn non_empty(field: &str, len: usize, example: &str) -> Result<()> {
    if len == 0 {
        return Err(Error::validation(
            field,
            format!("{field} must contain at least one entry. Example: {example}"),
        ));
    }
    Ok(())
}

/// Require every key in a keyed list to be distinct.
///
/// `keys` yields the natural key of each element in list order; the error
/// names both positions, e.g. `scripts[2].id` and `scripts[0]`.
pub fn unique_keys<'a>(
    field: &str,
    key: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (index, value) in keys.into_iter().enumerate() {
        if let Some(first) = seen.insert(value, index) {
            let at = format!("{}.{key}", indexed(field, index));
            return Err(Error::validation(
                at.clone(),
                format!(
                    "{at} '{value}' duplicates {}. Each entry in {field} needs a distinct {key}",
                    indexed(field, first)
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<()>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_url_path_empty_mentions_required() {
        assert!(message(url_path("sourcePath", "")).contains("required"));
    }

    #[test]
    fn test_url_path_missing_slash() {
        let msg = message(url_path("sourcePath", "no-leading-slash"));
        assert!(msg.contains("must start with '/'"));
    }

    #[test]
    fn test_url_path_valid() {
        assert!(url_path("sourcePath", "/old-page").is_ok());
        assert!(url_path("sourcePath", "/").is_ok());
        assert!(url_path("sourcePath", "/blog/2023/post_1.html").is_ok());
    }

    #[test]
    fn test_url_path_invalid_characters() {
        let msg = message(url_path("destinationPath", "/foo?bar=1"));
        assert!(msg.contains("invalid characters"));
    }

    #[test]
    fn test_hex_id() {
        assert!(hex_id("siteId", EXAMPLE_ID, "").is_ok());
        assert!(hex_id("siteId", "preview-0123456789abcdef", "").is_ok());
        assert!(message(hex_id("siteId", "", "")).contains("required"));
        assert!(hex_id("siteId", "5F0C8C9E1C9D440000E8D8C3", "").is_err());
        assert!(hex_id("siteId", "5f0c8c9e", "").is_err());

        let msg = message(hex_id("siteId", "xyz", "Find it under Site Settings."));
        assert!(msg.contains("Site Settings"));
        assert!(msg.contains(EXAMPLE_ID));
    }

    #[test]
    fn test_hex_id_rejects_loose_placeholders() {
        assert!(hex_id("siteId", "preview-x/..", "").is_err());
        assert!(hex_id("siteId", "preview-../../token/introspect?x=", "").is_err());
        assert!(hex_id("siteId", "preview-0123456789ABCDEF", "").is_err());
        assert!(hex_id("siteId", "preview-0123456789abcdef0", "").is_err());
    }

    #[test]
    fn test_unique_keys() {
        assert!(unique_keys("scripts", "id", ["a", "b"]).is_ok());

        let msg = message(unique_keys("scripts", "id", ["a", "b", "a"]));
        assert!(msg.contains("scripts[2].id 'a' duplicates scripts[0]"));
    }

    #[test]
    fn test_https_url() {
        let example = "https://example.com/webhooks";
        assert!(https_url("url", "https://example.com/hook", example).is_ok());
        assert!(message(https_url("url", "", example)).contains("required"));
        assert!(message(https_url("url", "http://example.com", example)).contains("HTTPS"));
        assert!(https_url("url", "https://localhost/hook", example).is_err());
    }

    #[test]
    fn test_one_of_lists_legal_values() {
        let allowed = ["header", "footer"];
        assert!(one_of("location", "footer", &allowed).is_ok());
        let msg = message(one_of("location", "body", &allowed));
        assert!(msg.contains("header, footer"));
    }

    #[test]
    fn test_max_len() {
        assert!(max_len("displayName", &"a".repeat(255), 255).is_ok());
        assert!(message(max_len("displayName", &"a".repeat(256), 255)).contains("256"));
    }

    #[test]
    fn test_indexed_field_names() {
        let err = required(&format!("{}.nodeId", indexed("nodes", 3)), "", "'node-1'").unwrap_err();
        assert!(err.to_string().contains("nodes[3].nodeId"));
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty("fieldData", 1, "{ name = \"x\" }").is_ok());
        assert!(non_empty("fieldData", 0, "{ name = \"x\" }").is_err());
    }
}
