//! Asset resource - `{siteId}/assets/{assetId}`
//!
//! Creating an asset registers its metadata and returns a presigned upload
//! target. The file bytes are sent separately using `uploadUrl` and
//! `uploadDetails` from the outputs. Assets are immutable: any change
//! replaces them.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::{SITE_ID_HINT, assigned_id, now, or_prior};

const FORBIDDEN_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

static MD5_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]{32}$").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInputs {
    pub site_id: String,
    /// File name with extension, e.g. "logo.png"
    pub file_name: String,
    /// MD5 of the file content, hex encoded
    pub file_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder: Option<String>,
    /// Where the content comes from; recorded only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetOutputs {
    #[serde(default)]
    pub upload_url: String,
    /// Form fields for the presigned upload
    #[serde(default)]
    pub upload_details: BTreeMap<String, String>,
    #[serde(default)]
    pub asset_url: String,
    #[serde(default)]
    pub hosted_url: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    upload_url: String,
    #[serde(default)]
    upload_details: BTreeMap<String, String>,
    #[serde(default)]
    asset_url: String,
    #[serde(default)]
    hosted_url: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetBody {
    #[serde(default)]
    original_file_name: String,
    #[serde(default)]
    hosted_url: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

/// File in a site's asset library
pub struct Asset;

impl ResourceKind for Asset {
    type Inputs = AssetInputs;
    type Outputs = AssetOutputs;

    fn type_name(&self) -> &'static str {
        "asset"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "assets",
            child: "assetId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &AssetInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;

        validate::required("fileName", &inputs.file_name, "'logo.png'")?;
        validate::max_len("fileName", &inputs.file_name, 255)?;
        let forbidden = inputs
            .file_name
            .chars()
            .find(|c| FORBIDDEN_FILE_NAME_CHARS.contains(c));
        if let Some(bad) = forbidden {
            return Err(Error::validation(
                "fileName",
                format!(
                    "fileName '{}' contains '{bad}'. Use letters, digits, hyphens, \
                     underscores, dots and spaces",
                    inputs.file_name
                ),
            ));
        }

        let is_md5 = MD5_PATTERN
            .as_ref()
            .is_some_and(|re| re.is_match(&inputs.file_hash));
        if !is_md5 {
            return Err(Error::validation(
                "fileHash",
                format!(
                    "fileHash must be the 32-character hex MD5 of the file: got '{}'. \
                     Compute it with `md5sum <file>` (Linux) or `md5 <file>` (macOS)",
                    inputs.file_hash
                ),
            ));
        }

        if let Some(folder) = &inputs.parent_folder {
            validate::hex_id(
                "parentFolder",
                folder,
                "Use the id of an asset_folder, or omit it to upload to the top level.",
            )?;
        }
        Ok(())
    }

    fn parent(&self, inputs: &AssetInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &AssetInputs) -> String {
        format!("asset {}", inputs.file_name)
    }

    fn preview(&self, inputs: &AssetInputs, created_on: &str) -> AssetOutputs {
        AssetOutputs {
            upload_url: String::new(),
            upload_details: BTreeMap::new(),
            asset_url: String::new(),
            hosted_url: format!("https://assets.website-files.com/preview/{}", inputs.file_name),
            content_type: String::new(),
            size: 0,
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &AssetInputs,
    ) -> Result<(ResourceId, AssetOutputs)> {
        let mut body = json!({
            "fileName": inputs.file_name,
            "fileHash": inputs.file_hash,
        });
        if let Some(folder) = &inputs.parent_folder {
            body["parentFolder"] = json!(folder);
        }

        let created: UploadBody =
            ctx.post(&format!("/v2/sites/{}/assets", inputs.site_id), body)?;
        let id = assigned_id(&created.id, self.type_name())?;
        let stamp = now();
        Ok((
            ResourceId::child(&inputs.site_id, id),
            AssetOutputs {
                upload_url: created.upload_url,
                upload_details: created.upload_details,
                asset_url: created.asset_url,
                hosted_url: created.hosted_url,
                content_type: created.content_type,
                size: 0,
                created_on: or_prior(created.created_on, &stamp),
                last_updated: or_prior(created.last_updated, &stamp),
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<AssetInputs, AssetOutputs>,
    ) -> Result<(AssetInputs, AssetOutputs)> {
        let asset: AssetBody = ctx.get(&format!("/v2/assets/{}", id.child_id()?))?;
        Ok((
            AssetInputs {
                site_id: id.parent.clone(),
                file_name: or_prior(asset.original_file_name, &prior.inputs.file_name),
                file_hash: prior.inputs.file_hash.clone(),
                parent_folder: prior.inputs.parent_folder.clone(),
                file_source: prior.inputs.file_source.clone(),
            },
            AssetOutputs {
                upload_url: prior.outputs.upload_url.clone(),
                upload_details: prior.outputs.upload_details.clone(),
                asset_url: prior.outputs.asset_url.clone(),
                hosted_url: or_prior(asset.hosted_url, &prior.outputs.hosted_url),
                content_type: or_prior(asset.content_type, &prior.outputs.content_type),
                size: asset.size,
                created_on: or_prior(asset.created_on, &prior.outputs.created_on),
                last_updated: or_prior(asset.last_updated, &prior.outputs.last_updated),
            },
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        id: &ResourceId,
        _inputs: &AssetInputs,
        _prior: &AssetOutputs,
    ) -> Result<AssetOutputs> {
        Err(Error::validation(
            "asset",
            format!("{id:?} cannot be changed in place; upload a new asset instead"),
        ))
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/assets/{}", id.child_id()?))
    }
}
