//! Webflow resource kinds
//!
//! Every kind is a thin [`declarative::ResourceKind`] adapter: it validates
//! inputs, encodes requests and decodes responses. Lifecycle semantics
//! (dry-run, identities, not-found handling) live in the reconciler.

use chrono::{SecondsFormat, Utc};
use declarative::Registry;
use flowkit::{Error, Result};

pub mod asset;
pub mod asset_folder;
pub mod collection;
pub mod collection_field;
pub mod collection_item;
pub mod custom_code;
pub mod ecommerce_settings;
pub mod inline_script;
pub mod page;
pub mod page_content;
pub mod redirect;
pub mod registered_script;
pub mod robots_txt;
pub mod site;
pub mod user;
pub mod webhook;

pub use asset::Asset;
pub use asset_folder::AssetFolder;
pub use collection::Collection;
pub use collection_field::CollectionField;
pub use collection_item::CollectionItem;
pub use custom_code::{PageCustomCode, SiteCustomCode};
pub use ecommerce_settings::EcommerceSettings;
pub use inline_script::InlineScript;
pub use page::Page;
pub use page_content::PageContent;
pub use redirect::Redirect;
pub use registered_script::RegisteredScript;
pub use robots_txt::RobotsTxt;
pub use site::Site;
pub use user::User;
pub use webhook::Webhook;

pub(crate) const SITE_ID_HINT: &str =
    "Find your site ID in the Webflow dashboard under Site Settings > General.";

pub(crate) const COLLECTION_ID_HINT: &str =
    "Find the collection ID in the CMS panel, or use the id of a managed collection.";

pub(crate) const PAGE_ID_HINT: &str =
    "Find the page ID in the Designer under Page Settings, or via GET /v2/sites/{siteId}/pages.";

/// Registry with every kind this provider manages
pub fn registry() -> Registry {
    Registry::new()
        .with(Asset)
        .with(AssetFolder)
        .with(Collection)
        .with(CollectionField)
        .with(CollectionItem)
        .with(EcommerceSettings)
        .with(InlineScript)
        .with(Page)
        .with(PageContent)
        .with(PageCustomCode)
        .with(Redirect)
        .with(RegisteredScript)
        .with(RobotsTxt)
        .with(Site)
        .with(SiteCustomCode)
        .with(User)
        .with(Webhook)
}

/// Current time in RFC 3339, for timestamps the API does not report
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Server timestamp, falling back to the last known value when the API omits it
pub(crate) fn or_prior(observed: String, prior: &str) -> String {
    if observed.is_empty() {
        prior.to_string()
    } else {
        observed
    }
}

/// Server-assigned ID from a create response
pub(crate) fn assigned_id(id: &str, kind: &str) -> Result<String> {
    if id.is_empty() {
        return Err(Error::Decode {
            message: format!("{kind} create response did not include an id"),
        });
    }
    Ok(id.to_string())
}
