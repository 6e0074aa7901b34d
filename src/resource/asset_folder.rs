//! Asset folder resource - `{siteId}/asset-folders/{folderId}`
//!
//! The API can create and read folders but not rename or delete them.
//! Every field is replace-class and Delete only stops tracking the folder.

use declarative::{ApplyContext, DeletePolicy, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{SITE_ID_HINT, assigned_id, or_prior};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFolderInputs {
    pub site_id: String,
    pub display_name: String,
    /// Parent folder id; top level when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFolderOutputs {
    /// Asset ids in the folder
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderBody {
    #[serde(default)]
    id: String,
    display_name: String,
    #[serde(default)]
    parent_folder: Option<String>,
    #[serde(default)]
    assets: Vec<String>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

/// Folder in a site's asset library
pub struct AssetFolder;

impl ResourceKind for AssetFolder {
    type Inputs = AssetFolderInputs;
    type Outputs = AssetFolderOutputs;

    fn type_name(&self) -> &'static str {
        "asset_folder"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "asset-folders",
            child: "folderId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &AssetFolderInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate::required("displayName", &inputs.display_name, "'Hero Images'")?;
        validate::max_len("displayName", &inputs.display_name, 255)?;
        if let Some(parent) = &inputs.parent_folder {
            validate::hex_id(
                "parentFolder",
                parent,
                "Use the id of an existing asset folder, or omit it for a top-level folder.",
            )?;
        }
        Ok(())
    }

    fn parent(&self, inputs: &AssetFolderInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &AssetFolderInputs) -> String {
        format!("asset folder '{}'", inputs.display_name)
    }

    fn preview(&self, _inputs: &AssetFolderInputs, created_on: &str) -> AssetFolderOutputs {
        AssetFolderOutputs {
            assets: Vec::new(),
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &AssetFolderInputs,
    ) -> Result<(ResourceId, AssetFolderOutputs)> {
        let mut body = json!({ "displayName": inputs.display_name });
        if let Some(parent) = &inputs.parent_folder {
            body["parentFolder"] = json!(parent);
        }

        let created: FolderBody =
            ctx.post(&format!("/v2/sites/{}/asset_folders", inputs.site_id), body)?;
        let id = assigned_id(&created.id, self.type_name())?;
        Ok((
            ResourceId::child(&inputs.site_id, id),
            AssetFolderOutputs {
                assets: created.assets,
                created_on: created.created_on,
                last_updated: created.last_updated,
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<AssetFolderInputs, AssetFolderOutputs>,
    ) -> Result<(AssetFolderInputs, AssetFolderOutputs)> {
        let folder: FolderBody = ctx.get(&format!("/v2/asset_folders/{}", id.child_id()?))?;
        Ok((
            AssetFolderInputs {
                site_id: id.parent.clone(),
                display_name: folder.display_name,
                parent_folder: folder.parent_folder.filter(|p| !p.is_empty()),
            },
            AssetFolderOutputs {
                assets: folder.assets,
                created_on: or_prior(folder.created_on, &prior.outputs.created_on),
                last_updated: or_prior(folder.last_updated, &prior.outputs.last_updated),
            },
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        _id: &ResourceId,
        _inputs: &AssetFolderInputs,
        prior: &AssetFolderOutputs,
    ) -> Result<AssetFolderOutputs> {
        Ok(prior.clone())
    }

    fn delete(&self, _ctx: &ApplyContext, _id: &ResourceId) -> Result<()> {
        Ok(())
    }

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::Untrack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{SITE, context};
    use declarative::Reconciler;
    use flowkit::Method;
    use flowkit::transport::MockTransport;

    fn inputs() -> AssetFolderInputs {
        AssetFolderInputs {
            site_id: SITE.into(),
            display_name: "Hero Images".into(),
            parent_folder: None,
        }
    }

    #[test]
    fn test_validation() {
        assert!(AssetFolder.validate(&inputs()).is_ok());

        let mut bad = inputs();
        bad.parent_folder = Some("root".into());
        assert!(AssetFolder.validate(&bad).unwrap_err().to_string().contains("parentFolder"));
    }

    #[test]
    fn test_create_and_read() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Post,
            format!("/v2/sites/{SITE}/asset_folders"),
            200,
            &json!({
                "id": "6390c49774a71f0e3c1a08ee",
                "displayName": "Hero Images",
                "assets": [],
                "createdOn": "2024-01-05T00:00:00Z",
                "lastUpdated": "2024-01-05T00:00:00Z"
            }),
        );
        mock.respond_json(
            Method::Get,
            "/v2/asset_folders/6390c49774a71f0e3c1a08ee",
            200,
            &json!({
                "id": "6390c49774a71f0e3c1a08ee",
                "displayName": "Hero Images",
                "parentFolder": "",
                "assets": ["a1", "a2"],
                "lastUpdated": "2024-02-05T00:00:00Z"
            }),
        );

        let ctx = context(&mock, false);
        let reconciler = Reconciler::new(AssetFolder);
        let created = reconciler.create(&ctx, &inputs()).unwrap();
        assert_eq!(
            created.id,
            format!("{SITE}/asset-folders/6390c49774a71f0e3c1a08ee")
        );

        let observed = reconciler.read(&ctx, &created).unwrap().unwrap();
        assert_eq!(observed.inputs, inputs());
        assert_eq!(observed.outputs.assets.len(), 2);
        assert_eq!(observed.outputs.created_on, "2024-01-05T00:00:00Z");
    }

    #[test]
    fn test_delete_only_untracks() {
        let mock = MockTransport::new();
        Reconciler::new(AssetFolder)
            .delete(&context(&mock, false), &format!("{SITE}/asset-folders/f1"))
            .unwrap();
        assert_eq!(mock.request_count(), 0);
    }
}
