//! Redirect resource - `{siteId}/redirects/{redirectId}`

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{SITE_ID_HINT, assigned_id, now};

const STATUS_CODES: &[&str] = &["301", "302"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInputs {
    pub site_id: String,
    /// Path to redirect from (e.g. "/old-page")
    pub source_path: String,
    /// Path to redirect to
    pub destination_path: String,
    /// 301 (permanent) or 302 (temporary)
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectOutputs {
    /// Set locally; the API does not report it
    #[serde(default)]
    pub created_on: String,
}

/// Wire format of a redirect rule
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedirectRule {
    #[serde(default)]
    id: String,
    from_url: String,
    to_url: String,
    status_code: u16,
}

#[derive(Debug, Deserialize)]
struct RedirectList {
    #[serde(default)]
    redirects: Vec<RedirectRule>,
}

/// Site redirect rule
pub struct Redirect;

impl ResourceKind for Redirect {
    type Inputs = RedirectInputs;
    type Outputs = RedirectOutputs;

    fn type_name(&self) -> &'static str {
        "redirect"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "redirects",
            child: "redirectId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["siteId", "sourcePath"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &RedirectInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate::url_path("sourcePath", &inputs.source_path)?;
        validate::url_path("destinationPath", &inputs.destination_path)?;
        validate::one_of("statusCode", &inputs.status_code.to_string(), STATUS_CODES)
    }

    fn parent(&self, inputs: &RedirectInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &RedirectInputs) -> String {
        format!(
            "{} -> {} ({})",
            inputs.source_path, inputs.destination_path, inputs.status_code
        )
    }

    fn preview(&self, _inputs: &RedirectInputs, created_on: &str) -> RedirectOutputs {
        RedirectOutputs {
            created_on: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &RedirectInputs,
    ) -> Result<(ResourceId, RedirectOutputs)> {
        let rule: RedirectRule = ctx.post(
            &format!("/v2/sites/{}/redirects", inputs.site_id),
            json!({
                "fromUrl": inputs.source_path,
                "toUrl": inputs.destination_path,
                "statusCode": inputs.status_code,
            }),
        )?;
        let id = assigned_id(&rule.id, self.type_name())?;
        Ok((
            ResourceId::child(&inputs.site_id, id),
            RedirectOutputs { created_on: now() },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<RedirectInputs, RedirectOutputs>,
    ) -> Result<(RedirectInputs, RedirectOutputs)> {
        let redirect_id = id.child_id()?;
        let list: RedirectList = ctx.get(&format!("/v2/sites/{}/redirects", id.parent))?;
        let rule = list
            .redirects
            .into_iter()
            .find(|rule| rule.id == redirect_id)
            .ok_or_else(|| Error::not_found(format!("redirect {redirect_id}")))?;

        Ok((
            RedirectInputs {
                site_id: id.parent.clone(),
                source_path: rule.from_url,
                destination_path: rule.to_url,
                status_code: rule.status_code,
            },
            prior.outputs.clone(),
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &RedirectInputs,
        prior: &RedirectOutputs,
    ) -> Result<RedirectOutputs> {
        let _: RedirectRule = ctx.patch(
            &format!("/v2/sites/{}/redirects/{}", id.parent, id.child_id()?),
            json!({
                "fromUrl": inputs.source_path,
                "toUrl": inputs.destination_path,
                "statusCode": inputs.status_code,
            }),
        )?;
        Ok(prior.clone())
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!(
            "/v2/sites/{}/redirects/{}",
            id.parent,
            id.child_id()?
        ))
    }
}
