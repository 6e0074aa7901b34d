//! Composite resource identities encoded as opaque strings.
//!
//! Two shapes cover every resource kind:
//!
//! - [`IdShape::Child`]: `{parent}/{discriminator}/{child}`, e.g.
//!   `5f0c8c9e1c9d440000e8d8c3/redirects/65a1...`
//! - [`IdShape::Singleton`]: `{parent}/{suffix}` for resources that exist at
//!   most once per parent, e.g. `5f0c.../robots.txt`
//!
//! The discriminator literal is checked on decode, so an identity minted for
//! one kind never decodes as another.

use crate::error::{Error, Result};
use std::fmt;

/// Identity layout for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdShape {
    /// `{parent}/{discriminator}/{child}`.
    Child {
        /// Name of the parent segment, used in error messages (`siteId`).
        parent: &'static str,
        /// Literal between parent and child (`redirects`).
        discriminator: &'static str,
        /// Name of the child segment (`redirectId`).
        child: &'static str,
    },
    /// `{parent}/{suffix}`.
    Singleton {
        /// Name of the parent segment (`siteId`).
        parent: &'static str,
        /// Literal suffix (`robots.txt`).
        suffix: &'static str,
    },
}

/// Decoded identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Parent segment (site, collection or page ID).
    pub parent: String,
    /// Child segment, absent for singletons.
    pub child: Option<String>,
}

impl ResourceId {
    /// Identity with a parent and child.
    pub fn child(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: Some(child.into()),
        }
    }

    /// Identity for a per-parent singleton.
    pub fn singleton(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: None,
        }
    }

    /// The child segment, or an error naming the identity.
    pub fn child_id(&self) -> Result<&str> {
        self.child.as_deref().ok_or_else(|| Error::InvalidIdentity {
            id: self.parent.clone(),
            expected: "an identity with a child segment".to_string(),
        })
    }
}

impl IdShape {
    /// Human-readable template, e.g. `{siteId}/redirects/{redirectId}`.
    #[must_use]
    pub fn expected(&self) -> String {
        match self {
            Self::Child {
                parent,
                discriminator,
                child,
            } => format!("{{{parent}}}/{discriminator}/{{{child}}}"),
            Self::Singleton { parent, suffix } => format!("{{{parent}}}/{suffix}"),
        }
    }

    /// Encode an identity.
    ///
    /// # Errors
    ///
    /// Fails if a required segment is empty or the child presence does not
    /// match the shape.
    pub fn encode(&self, id: &ResourceId) -> Result<String> {
        let invalid = || Error::InvalidIdentity {
            id: format!("{}/{}", id.parent, id.child.as_deref().unwrap_or_default()),
            expected: self.expected(),
        };
        if id.parent.is_empty() || id.parent.contains('/') {
            return Err(invalid());
        }
        match (self, id.child.as_deref()) {
            (Self::Child { discriminator, .. }, Some(child)) if !child.is_empty() => {
                Ok(format!("{}/{discriminator}/{child}", id.parent))
            }
            (Self::Singleton { suffix, .. }, None) => Ok(format!("{}/{suffix}", id.parent)),
            _ => Err(invalid()),
        }
    }

    /// Decode an identity string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] naming the expected shape when the
    /// string is empty, has the wrong number of segments, an empty segment,
    /// or the wrong discriminator.
    pub fn decode(&self, id: &str) -> Result<ResourceId> {
        let invalid = || Error::InvalidIdentity {
            id: id.to_string(),
            expected: self.expected(),
        };

        match self {
            Self::Child { discriminator, .. } => {
                let parts: Vec<&str> = id.split('/').collect();
                if parts.len() < 3 || parts[0].is_empty() || parts[1] != *discriminator {
                    return Err(invalid());
                }
                let child = parts[2..].join("/");
                if child.is_empty() {
                    return Err(invalid());
                }
                Ok(ResourceId::child(parts[0], child))
            }
            Self::Singleton { suffix, .. } => match id.split_once('/') {
                Some((parent, rest)) if !parent.is_empty() && rest == *suffix => {
                    Ok(ResourceId::singleton(parent))
                }
                _ => Err(invalid()),
            },
        }
    }
}

impl fmt::Display for IdShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIRECT: IdShape = IdShape::Child {
        parent: "siteId",
        discriminator: "redirects",
        child: "redirectId",
    };
    const WEBHOOK: IdShape = IdShape::Child {
        parent: "siteId",
        discriminator: "webhooks",
        child: "webhookId",
    };
    const ROBOTS: IdShape = IdShape::Singleton {
        parent: "siteId",
        suffix: "robots.txt",
    };
    const PAGE_CODE: IdShape = IdShape::Singleton {
        parent: "pageId",
        suffix: "custom-code",
    };

    const SITE: &str = "5f0c8c9e1c9d440000e8d8c3";

    #[test]
    fn test_child_round_trip() {
        let id = ResourceId::child(SITE, "65a1b2c3d4e5f60718293a4b");
        let encoded = REDIRECT.encode(&id).unwrap();
        assert_eq!(encoded, format!("{SITE}/redirects/65a1b2c3d4e5f60718293a4b"));
        assert_eq!(REDIRECT.decode(&encoded).unwrap(), id);
    }

    #[test]
    fn test_singleton_round_trip() {
        let id = ResourceId::singleton(SITE);
        let encoded = ROBOTS.encode(&id).unwrap();
        assert_eq!(encoded, format!("{SITE}/robots.txt"));
        assert_eq!(ROBOTS.decode(&encoded).unwrap(), id);
    }

    #[test]
    fn test_child_with_slashes_round_trips() {
        let id = ResourceId::child(SITE, "a/b");
        let encoded = REDIRECT.encode(&id).unwrap();
        assert_eq!(REDIRECT.decode(&encoded).unwrap(), id);
    }

    #[test]
    fn test_malformed_identities_rejected() {
        let bad_ids = vec![
            String::new(),
            SITE.to_string(),
            "/redirects/abc".to_string(),
            format!("{SITE}/redirects"),
            format!("{SITE}/redirects/"),
            format!("{SITE}-redirects-abc"),
        ];
        for bad in &bad_ids {
            let err = REDIRECT.decode(bad).unwrap_err();
            assert!(
                err.to_string().contains("{siteId}/redirects/{redirectId}"),
                "{bad:?} -> {err}"
            );
        }
    }

    #[test]
    fn test_cross_kind_decoding_fails() {
        let redirect = format!("{SITE}/redirects/abc");
        assert!(WEBHOOK.decode(&redirect).is_err());
        assert!(ROBOTS.decode(&redirect).is_err());

        let robots = format!("{SITE}/robots.txt");
        assert!(PAGE_CODE.decode(&robots).is_err());
        assert!(REDIRECT.decode(&robots).is_err());
    }

    #[test]
    fn test_singleton_rejects_extra_segments() {
        assert!(ROBOTS.decode(&format!("{SITE}/robots.txt/x")).is_err());
        assert!(ROBOTS.decode("/robots.txt").is_err());
    }

    #[test]
    fn test_encode_rejects_empty_segments() {
        assert!(REDIRECT.encode(&ResourceId::child("", "abc")).is_err());
        assert!(REDIRECT.encode(&ResourceId::child(SITE, "")).is_err());
        assert!(REDIRECT.encode(&ResourceId::singleton(SITE)).is_err());
        assert!(ROBOTS.encode(&ResourceId::child(SITE, "x")).is_err());
    }

    #[test]
    fn test_child_id_accessor() {
        assert_eq!(ResourceId::child(SITE, "x").child_id().unwrap(), "x");
        assert!(ResourceId::singleton(SITE).child_id().is_err());
    }
}
