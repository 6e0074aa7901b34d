//! Ecommerce settings - `{siteId}/ecommerce/settings`
//!
//! Read-only view of a site's store configuration. Webflow answers 409
//! when ecommerce is not enabled on the site, which reads as absent.

use declarative::{ApplyContext, DeletePolicy, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};

use super::{SITE_ID_HINT, now, or_prior};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcommerceSettingsInputs {
    pub site_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcommerceSettingsOutputs {
    /// ISO 4217 code, e.g. "USD"
    #[serde(default)]
    pub default_currency: String,
    #[serde(default)]
    pub created_on: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsBody {
    #[serde(default)]
    default_currency: String,
    #[serde(default)]
    created_on: String,
}

fn fetch(ctx: &ApplyContext, site_id: &str) -> Result<SettingsBody> {
    match ctx.get(&format!("/v2/sites/{site_id}/ecommerce/settings")) {
        Err(Error::Api { status: 409, .. }) => Err(Error::not_found(format!(
            "ecommerce settings for site {site_id}: ecommerce is not enabled. \
             Enable it in the Designer under Ecommerce before tracking these settings"
        ))),
        other => other,
    }
}

/// Store settings of an ecommerce-enabled site
pub struct EcommerceSettings;

impl ResourceKind for EcommerceSettings {
    type Inputs = EcommerceSettingsInputs;
    type Outputs = EcommerceSettingsOutputs;

    fn type_name(&self) -> &'static str {
        "ecommerce_settings"
    }

    fn shape(&self) -> IdShape {
        IdShape::Singleton {
            parent: "siteId",
            suffix: "ecommerce/settings",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &EcommerceSettingsInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)
    }

    fn parent(&self, inputs: &EcommerceSettingsInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &EcommerceSettingsInputs) -> String {
        format!("ecommerce settings of {}", inputs.site_id)
    }

    fn preview(
        &self,
        _inputs: &EcommerceSettingsInputs,
        created_on: &str,
    ) -> EcommerceSettingsOutputs {
        EcommerceSettingsOutputs {
            default_currency: "USD".to_string(),
            created_on: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &EcommerceSettingsInputs,
    ) -> Result<(ResourceId, EcommerceSettingsOutputs)> {
        let settings = fetch(ctx, &inputs.site_id)?;
        Ok((
            ResourceId::singleton(&inputs.site_id),
            EcommerceSettingsOutputs {
                default_currency: settings.default_currency,
                created_on: or_prior(settings.created_on, &now()),
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<EcommerceSettingsInputs, EcommerceSettingsOutputs>,
    ) -> Result<(EcommerceSettingsInputs, EcommerceSettingsOutputs)> {
        let settings = fetch(ctx, &id.parent)?;
        Ok((
            EcommerceSettingsInputs {
                site_id: id.parent.clone(),
            },
            EcommerceSettingsOutputs {
                default_currency: settings.default_currency,
                created_on: or_prior(settings.created_on, &prior.outputs.created_on),
            },
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        _id: &ResourceId,
        _inputs: &EcommerceSettingsInputs,
        prior: &EcommerceSettingsOutputs,
    ) -> Result<EcommerceSettingsOutputs> {
        Ok(prior.clone())
    }

    fn delete(&self, _ctx: &ApplyContext, _id: &ResourceId) -> Result<()> {
        Ok(())
    }

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::Untrack
    }
}
