//! # flowkit
//!
//! Resilient client plumbing for the Webflow Data API.
//!
//! This crate provides functionality for:
//! - Authenticated HTTPS requests with a fixed per-call timeout
//! - Retrying rate-limited (429) and transient network failures, honoring
//!   `Retry-After`
//! - Cooperative cancellation of in-flight calls and retry waits
//! - Encoding and decoding composite resource identities
//! - Pre-flight validation helpers with actionable messages
//!
//! ## Example
//!
//! ```no_run
//! use flowkit::{ApiClient, CancelToken, ClientConfig};
//! use serde_json::Value;
//!
//! let token = flowkit::auth::resolve_token(None).expect("token not configured");
//! let client = ApiClient::new(&ClientConfig::new(token, "0.1.0")).expect("bad config");
//!
//! let sites: Value = client
//!     .get("/v2/sites", &CancelToken::new())
//!     .expect("request failed");
//! println!("{sites}");
//! ```
//!
//! ## Identities
//!
//! ```
//! use flowkit::{IdShape, ResourceId};
//!
//! let shape = IdShape::Child {
//!     parent: "siteId",
//!     discriminator: "redirects",
//!     child: "redirectId",
//! };
//! let id = shape.encode(&ResourceId::child("5f0c8c9e1c9d440000e8d8c3", "abc")).unwrap();
//! assert_eq!(id, "5f0c8c9e1c9d440000e8d8c3/redirects/abc");
//! assert!(shape.decode("5f0c8c9e1c9d440000e8d8c3/webhooks/abc").is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod cancel;
pub mod client;
pub mod error;
pub mod identity;
pub mod retry;
pub mod transport;
pub mod types;
pub mod validate;

pub use cancel::CancelToken;
pub use client::ApiClient;
pub use error::{Error, ErrorCategory, Result};
pub use identity::{IdShape, ResourceId};
pub use types::{ApiRequest, ClientConfig, Method, RawResponse, RetryConfig};
