//! Custom code blocks applying registered scripts to a site or a page
//!
//! - `site_custom_code`: `{siteId}/custom_code`
//! - `page_custom_code`: `{pageId}/custom-code`
//!
//! Both replace the whole script list on every write and compare scripts by id.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{PAGE_ID_HINT, SITE_ID_HINT, now, or_prior};

const LOCATIONS: &[&str] = &["header", "footer"];

const RULES: DiffRules = DiffRules {
    replace: &["siteId", "pageId"],
    keyed: &[("scripts", "id")],
    ordered: &[],
    ignore: &[],
};

/// A registered script applied at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRef {
    /// Registered script id
    pub id: String,
    pub version: String,
    /// "header" or "footer"
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCustomCodeInputs {
    pub site_id: String,
    #[serde(default)]
    pub scripts: Vec<ScriptRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCustomCodeInputs {
    pub page_id: String,
    #[serde(default)]
    pub scripts: Vec<ScriptRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCodeOutputs {
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomCodeBody {
    #[serde(default)]
    scripts: Vec<ScriptRef>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

// ============================================================================
// Shared operations
// ============================================================================

fn validate_scripts(scripts: &[ScriptRef]) -> Result<()> {
    for (i, script) in scripts.iter().enumerate() {
        let at = validate::indexed("scripts", i);
        validate::required(&format!("{at}.id"), &script.id, "'cms_slider'")?;
        validate::required(&format!("{at}.version"), &script.version, "'1.0.0'")?;
        validate::one_of(&format!("{at}.location"), &script.location, LOCATIONS)?;
    }
    validate::unique_keys("scripts", "id", scripts.iter().map(|s| s.id.as_str()))
}

fn write(
    ctx: &ApplyContext,
    path: &str,
    scripts: &[ScriptRef],
    prior: Option<&CustomCodeOutputs>,
) -> Result<CustomCodeOutputs> {
    let body: Option<CustomCodeBody> = ctx.put(path, json!({ "scripts": scripts }))?;
    let body = body.unwrap_or_default();
    let stamp = now();
    let created_on = prior.map_or(stamp.as_str(), |p| p.created_on.as_str());
    Ok(CustomCodeOutputs {
        created_on: or_prior(body.created_on, created_on),
        last_updated: or_prior(body.last_updated, &stamp),
    })
}

fn fetch(
    ctx: &ApplyContext,
    path: &str,
    prior: &CustomCodeOutputs,
) -> Result<(Vec<ScriptRef>, CustomCodeOutputs)> {
    let body: Option<CustomCodeBody> = ctx.get(path)?;
    let body = body.unwrap_or_default();
    Ok((
        body.scripts,
        CustomCodeOutputs {
            created_on: or_prior(body.created_on, &prior.created_on),
            last_updated: or_prior(body.last_updated, &prior.last_updated),
        },
    ))
}

fn preview(created_on: &str) -> CustomCodeOutputs {
    CustomCodeOutputs {
        created_on: created_on.to_string(),
        last_updated: created_on.to_string(),
    }
}

fn describe(scripts: &[ScriptRef], target: &str) -> String {
    format!("{} script(s) on {target}", scripts.len())
}

// ============================================================================
// Site
// ============================================================================

/// Scripts applied to every page of a site
pub struct SiteCustomCode;

impl ResourceKind for SiteCustomCode {
    type Inputs = SiteCustomCodeInputs;
    type Outputs = CustomCodeOutputs;

    fn type_name(&self) -> &'static str {
        "site_custom_code"
    }

    fn shape(&self) -> IdShape {
        IdShape::Singleton {
            parent: "siteId",
            suffix: "custom_code",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        RULES
    }

    fn validate(&self, inputs: &SiteCustomCodeInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate_scripts(&inputs.scripts)
    }

    fn parent(&self, inputs: &SiteCustomCodeInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &SiteCustomCodeInputs) -> String {
        describe(&inputs.scripts, &format!("site {}", inputs.site_id))
    }

    fn preview(&self, _inputs: &SiteCustomCodeInputs, created_on: &str) -> CustomCodeOutputs {
        preview(created_on)
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &SiteCustomCodeInputs,
    ) -> Result<(ResourceId, CustomCodeOutputs)> {
        let path = format!("/v2/sites/{}/custom_code", inputs.site_id);
        let outputs = write(ctx, &path, &inputs.scripts, None)?;
        Ok((ResourceId::singleton(&inputs.site_id), outputs))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<SiteCustomCodeInputs, CustomCodeOutputs>,
    ) -> Result<(SiteCustomCodeInputs, CustomCodeOutputs)> {
        let path = format!("/v2/sites/{}/custom_code", id.parent);
        let (scripts, outputs) = fetch(ctx, &path, &prior.outputs)?;
        Ok((
            SiteCustomCodeInputs {
                site_id: id.parent.clone(),
                scripts,
            },
            outputs,
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &SiteCustomCodeInputs,
        prior: &CustomCodeOutputs,
    ) -> Result<CustomCodeOutputs> {
        let path = format!("/v2/sites/{}/custom_code", id.parent);
        write(ctx, &path, &inputs.scripts, Some(prior))
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/sites/{}/custom_code", id.parent))
    }
}

// ============================================================================
// Page
// ============================================================================

/// Scripts applied to a single page
pub struct PageCustomCode;

impl ResourceKind for PageCustomCode {
    type Inputs = PageCustomCodeInputs;
    type Outputs = CustomCodeOutputs;

    fn type_name(&self) -> &'static str {
        "page_custom_code"
    }

    fn shape(&self) -> IdShape {
        IdShape::Singleton {
            parent: "pageId",
            suffix: "custom-code",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        RULES
    }

    fn validate(&self, inputs: &PageCustomCodeInputs) -> Result<()> {
        validate::hex_id("pageId", &inputs.page_id, PAGE_ID_HINT)?;
        validate_scripts(&inputs.scripts)
    }

    fn parent(&self, inputs: &PageCustomCodeInputs) -> String {
        inputs.page_id.clone()
    }

    fn describe(&self, inputs: &PageCustomCodeInputs) -> String {
        describe(&inputs.scripts, &format!("page {}", inputs.page_id))
    }

    fn preview(&self, _inputs: &PageCustomCodeInputs, created_on: &str) -> CustomCodeOutputs {
        preview(created_on)
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &PageCustomCodeInputs,
    ) -> Result<(ResourceId, CustomCodeOutputs)> {
        let path = format!("/v2/pages/{}/custom_code", inputs.page_id);
        let outputs = write(ctx, &path, &inputs.scripts, None)?;
        Ok((ResourceId::singleton(&inputs.page_id), outputs))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<PageCustomCodeInputs, CustomCodeOutputs>,
    ) -> Result<(PageCustomCodeInputs, CustomCodeOutputs)> {
        let path = format!("/v2/pages/{}/custom_code", id.parent);
        let (scripts, outputs) = fetch(ctx, &path, &prior.outputs)?;
        Ok((
            PageCustomCodeInputs {
                page_id: id.parent.clone(),
                scripts,
            },
            outputs,
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &PageCustomCodeInputs,
        prior: &CustomCodeOutputs,
    ) -> Result<CustomCodeOutputs> {
        let path = format!("/v2/pages/{}/custom_code", id.parent);
        write(ctx, &path, &inputs.scripts, Some(prior))
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/pages/{}/custom_code", id.parent))
    }
}
