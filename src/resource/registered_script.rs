//! Registered (hosted) script resource - `{siteId}/registered_scripts/{scriptId}`
//!
//! Registering a script makes it available to `site_custom_code` and
//! `page_custom_code`, which reference it by id and version.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::LazyLock;

use super::{SITE_ID_HINT, assigned_id, now, or_prior};

const SRI_EXAMPLE: &str =
    "'sha384-oqVuAfXRKap7fdgcCY5uykM6+R9GqQ8K/uxy9rx7HNQlGYl1kPzQho1wx4JwY8wC'";

static DISPLAY_NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{1,50}$").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredScriptInputs {
    pub site_id: String,
    /// Alphanumeric, 1-50 characters
    pub display_name: String,
    /// HTTPS URL of the hosted script
    pub hosted_location: String,
    /// Subresource Integrity hash (e.g. "sha384-...")
    pub integrity_hash: String,
    /// Semantic version (e.g. "1.0.0")
    pub version: String,
    #[serde(default)]
    pub can_copy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredScriptOutputs {
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptBody {
    #[serde(default)]
    id: String,
    display_name: String,
    hosted_location: String,
    #[serde(default)]
    integrity_hash: String,
    version: String,
    #[serde(default)]
    can_copy: bool,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptList {
    #[serde(default)]
    registered_scripts: Vec<ScriptBody>,
}

/// Display names shared by hosted and inline scripts
pub(crate) fn check_display_name(display_name: &str) -> Result<()> {
    let matches = DISPLAY_NAME_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(display_name));
    if !matches {
        return Err(Error::validation(
            "displayName",
            format!(
                "displayName must be 1-50 alphanumeric characters (no spaces or \
                 punctuation): got '{display_name}'. Example: 'CmsSlider'"
            ),
        ));
    }
    Ok(())
}

pub(crate) fn check_version(version: &str) -> Result<()> {
    validate::required("version", version, "'1.0.0'")?;
    if !version.contains('.') {
        return Err(Error::validation(
            "version",
            format!("version should be a semantic version like '1.0.0': got '{version}'"),
        ));
    }
    Ok(())
}

fn request_body(inputs: &RegisteredScriptInputs) -> Value {
    json!({
        "displayName": inputs.display_name,
        "hostedLocation": inputs.hosted_location,
        "integrityHash": inputs.integrity_hash,
        "version": inputs.version,
        "canCopy": inputs.can_copy,
    })
}

/// Hosted script registered with a site
pub struct RegisteredScript;

impl ResourceKind for RegisteredScript {
    type Inputs = RegisteredScriptInputs;
    type Outputs = RegisteredScriptOutputs;

    fn type_name(&self) -> &'static str {
        "registered_script"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "registered_scripts",
            child: "scriptId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["siteId", "displayName"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &RegisteredScriptInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;

        check_display_name(&inputs.display_name)?;

        validate::https_url(
            "hostedLocation",
            &inputs.hosted_location,
            "https://cdn.example.com/slider.min.js",
        )?;

        validate::required("integrityHash", &inputs.integrity_hash, SRI_EXAMPLE)?;
        if !inputs.integrity_hash.starts_with("sha") {
            return Err(Error::validation(
                "integrityHash",
                format!(
                    "integrityHash must be a Subresource Integrity hash starting with \
                     'sha256-', 'sha384-' or 'sha512-': got '{}'",
                    inputs.integrity_hash
                ),
            ));
        }

        check_version(&inputs.version)?;
        Ok(())
    }

    fn parent(&self, inputs: &RegisteredScriptInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &RegisteredScriptInputs) -> String {
        format!("script {} v{}", inputs.display_name, inputs.version)
    }

    fn preview(
        &self,
        _inputs: &RegisteredScriptInputs,
        created_on: &str,
    ) -> RegisteredScriptOutputs {
        RegisteredScriptOutputs {
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &RegisteredScriptInputs,
    ) -> Result<(ResourceId, RegisteredScriptOutputs)> {
        let created: ScriptBody = ctx.post(
            &format!("/v2/sites/{}/registered_scripts/hosted", inputs.site_id),
            request_body(inputs),
        )?;
        let id = assigned_id(&created.id, self.type_name())?;
        let stamp = now();
        Ok((
            ResourceId::child(&inputs.site_id, id),
            RegisteredScriptOutputs {
                created_on: or_prior(created.created_on, &stamp),
                last_updated: or_prior(created.last_updated, &stamp),
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<RegisteredScriptInputs, RegisteredScriptOutputs>,
    ) -> Result<(RegisteredScriptInputs, RegisteredScriptOutputs)> {
        let script_id = id.child_id()?;
        let list: ScriptList = ctx.get(&format!("/v2/sites/{}/registered_scripts", id.parent))?;
        let script = list
            .registered_scripts
            .into_iter()
            .find(|script| script.id == script_id)
            .ok_or_else(|| Error::not_found(format!("registered script {script_id}")))?;

        Ok((
            RegisteredScriptInputs {
                site_id: id.parent.clone(),
                display_name: script.display_name,
                hosted_location: script.hosted_location,
                integrity_hash: or_prior(script.integrity_hash, &prior.inputs.integrity_hash),
                version: script.version,
                can_copy: script.can_copy,
            },
            RegisteredScriptOutputs {
                created_on: or_prior(script.created_on, &prior.outputs.created_on),
                last_updated: or_prior(script.last_updated, &prior.outputs.last_updated),
            },
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &RegisteredScriptInputs,
        prior: &RegisteredScriptOutputs,
    ) -> Result<RegisteredScriptOutputs> {
        let updated: ScriptBody = ctx.patch(
            &format!(
                "/v2/sites/{}/registered_scripts/{}",
                id.parent,
                id.child_id()?
            ),
            request_body(inputs),
        )?;
        Ok(RegisteredScriptOutputs {
            created_on: prior.created_on.clone(),
            last_updated: or_prior(updated.last_updated, &now()),
        })
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!(
            "/v2/sites/{}/registered_scripts/{}",
            id.parent,
            id.child_id()?
        ))
    }
}
