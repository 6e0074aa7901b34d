//! Site resource - `{workspaceId}/sites/{siteId}`
//!
//! Creating sites through the API needs an Enterprise workspace. The
//! template is only read at creation, so changing it replaces the site.
//! With `publish` set, every create or update is followed by a publish.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{assigned_id, now, or_prior};

const WORKSPACE_ID_HINT: &str =
    "Find the workspace ID in the Webflow dashboard under Workspace Settings > General.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInputs {
    pub workspace_id: String,
    pub display_name: String,
    /// Dashboard folder holding the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    /// Template to clone at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// Publish to every domain after each change
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteOutputs {
    /// Slug Webflow derived from the name
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default)]
    pub preview_url: String,
    #[serde(default)]
    pub custom_domains: Vec<String>,
    #[serde(default)]
    pub data_collection_enabled: bool,
    #[serde(default)]
    pub data_collection_type: String,
    #[serde(default)]
    pub last_published: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    workspace_id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    time_zone: String,
    #[serde(default)]
    preview_url: String,
    #[serde(default)]
    parent_folder_id: Option<String>,
    #[serde(default)]
    custom_domains: Vec<DomainBody>,
    #[serde(default)]
    data_collection_enabled: bool,
    #[serde(default)]
    data_collection_type: String,
    #[serde(default)]
    last_published: Option<String>,
    #[serde(default)]
    last_updated: String,
}

#[derive(Debug, Deserialize)]
struct DomainBody {
    #[serde(default)]
    url: String,
}

impl SiteBody {
    fn outputs(self, prior: Option<&SiteOutputs>) -> SiteOutputs {
        let last_updated = prior.map_or_else(now, |p| p.last_updated.clone());
        SiteOutputs {
            short_name: self.short_name,
            time_zone: self.time_zone,
            preview_url: self.preview_url,
            custom_domains: self.custom_domains.into_iter().map(|d| d.url).collect(),
            data_collection_enabled: self.data_collection_enabled,
            data_collection_type: self.data_collection_type,
            last_published: self.last_published.unwrap_or_default(),
            last_updated: or_prior(self.last_updated, &last_updated),
        }
    }
}

fn publish(ctx: &ApplyContext, site_id: &str, outputs: &mut SiteOutputs) -> Result<()> {
    // No domain list publishes to every domain the site has.
    let _: Value = ctx.post(&format!("/v2/sites/{site_id}/publish"), json!({}))?;
    info!("Published site {site_id}");
    outputs.last_published = now();
    Ok(())
}

/// Webflow site inside a workspace
pub struct Site;

impl ResourceKind for Site {
    type Inputs = SiteInputs;
    type Outputs = SiteOutputs;

    fn type_name(&self) -> &'static str {
        "site"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "workspaceId",
            discriminator: "sites",
            child: "siteId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["workspaceId", "templateName"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &SiteInputs) -> Result<()> {
        validate::hex_id("workspaceId", &inputs.workspace_id, WORKSPACE_ID_HINT)?;
        validate::required("displayName", &inputs.display_name, "'Company Blog'")?;
        validate::max_len("displayName", &inputs.display_name, 255)?;
        if let Some(folder) = &inputs.parent_folder_id {
            validate::required(
                "parentFolderId",
                folder,
                "a dashboard folder id, or omit it to keep the site at the top level",
            )?;
        }
        Ok(())
    }

    fn parent(&self, inputs: &SiteInputs) -> String {
        inputs.workspace_id.clone()
    }

    fn describe(&self, inputs: &SiteInputs) -> String {
        format!("site '{}'", inputs.display_name)
    }

    fn preview(&self, _inputs: &SiteInputs, created_on: &str) -> SiteOutputs {
        SiteOutputs {
            short_name: String::new(),
            time_zone: String::new(),
            preview_url: String::new(),
            custom_domains: Vec::new(),
            data_collection_enabled: false,
            data_collection_type: String::new(),
            last_published: String::new(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(&self, ctx: &ApplyContext, inputs: &SiteInputs) -> Result<(ResourceId, SiteOutputs)> {
        let mut body = json!({ "name": inputs.display_name });
        if let Some(template) = &inputs.template_name {
            body["templateName"] = json!(template);
        }
        if let Some(folder) = &inputs.parent_folder_id {
            body["parentFolderId"] = json!(folder);
        }

        let created: SiteBody = ctx.post(
            &format!("/v2/workspaces/{}/sites", inputs.workspace_id),
            body,
        )?;
        let id = assigned_id(&created.id, self.type_name())?;
        let mut outputs = created.outputs(None);
        if inputs.publish {
            publish(ctx, &id, &mut outputs)?;
        }
        Ok((ResourceId::child(&inputs.workspace_id, id), outputs))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<SiteInputs, SiteOutputs>,
    ) -> Result<(SiteInputs, SiteOutputs)> {
        let site: SiteBody = ctx.get(&format!("/v2/sites/{}", id.child_id()?))?;
        let inputs = SiteInputs {
            workspace_id: or_prior(site.workspace_id.clone(), &id.parent),
            display_name: site.display_name.clone(),
            parent_folder_id: site.parent_folder_id.clone().filter(|f| !f.is_empty()),
            template_name: prior.inputs.template_name.clone(),
            publish: prior.inputs.publish,
        };
        Ok((inputs, site.outputs(Some(&prior.outputs))))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &SiteInputs,
        _prior: &SiteOutputs,
    ) -> Result<SiteOutputs> {
        let site_id = id.child_id()?;
        let updated: SiteBody = ctx.patch(
            &format!("/v2/sites/{site_id}"),
            json!({
                "name": inputs.display_name,
                "parentFolderId": inputs.parent_folder_id,
            }),
        )?;
        let mut outputs = updated.outputs(None);
        if inputs.publish {
            publish(ctx, site_id, &mut outputs)?;
        }
        Ok(outputs)
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/sites/{}", id.child_id()?))
    }
}
