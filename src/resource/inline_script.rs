//! Inline script resource - `{siteId}/inline_scripts/{scriptId}`
//!
//! Webflow hosts the source itself, so there is no URL to manage. The API
//! has no update for inline scripts: every change replaces the script.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::registered_script::{check_display_name, check_version};
use super::{SITE_ID_HINT, assigned_id, now, or_prior};

const MAX_SOURCE_LEN: usize = 2000;

/// Version recorded when neither the API nor the prior state reports one
const UNKNOWN_VERSION: &str = "0.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineScriptInputs {
    pub site_id: String,
    /// Alphanumeric, 1-50 characters
    pub display_name: String,
    /// JavaScript source, at most 2000 characters
    pub source_code: String,
    /// Semantic version (e.g. "1.0.0")
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub integrity_hash: String,
    #[serde(default)]
    pub can_copy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineScriptOutputs {
    /// Where Webflow serves the registered source
    #[serde(default)]
    pub hosted_location: String,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    hosted_location: String,
    #[serde(default)]
    integrity_hash: String,
    #[serde(default)]
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
    registered_scripts: Vec<InlineBody>,
}

fn request_body(inputs: &InlineScriptInputs) -> Value {
    let mut body = json!({
        "sourceCode": inputs.source_code,
        "version": inputs.version,
        "displayName": inputs.display_name,
        "canCopy": inputs.can_copy,
    });
    if !inputs.integrity_hash.is_empty() {
        body["integrityHash"] = json!(inputs.integrity_hash);
    }
    body
}

/// Script source registered inline with a site
pub struct InlineScript;

impl ResourceKind for InlineScript {
    type Inputs = InlineScriptInputs;
    type Outputs = InlineScriptOutputs;

    fn type_name(&self) -> &'static str {
        "inline_script"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "inline_scripts",
            child: "scriptId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &InlineScriptInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        check_display_name(&inputs.display_name)?;

        validate::required(
            "sourceCode",
            &inputs.source_code,
            "'console.log(\"Hello from Webflow\");'",
        )?;
        let len = inputs.source_code.chars().count();
        if len > MAX_SOURCE_LEN {
            return Err(Error::validation(
                "sourceCode",
                format!(
                    "sourceCode is {len} characters, the limit is {MAX_SOURCE_LEN}. Host larger \
                     scripts externally and use registered_script with a hostedLocation"
                ),
            ));
        }

        check_version(&inputs.version)?;
        if !inputs.integrity_hash.is_empty() && !inputs.integrity_hash.starts_with("sha") {
            return Err(Error::validation(
                "integrityHash",
                format!(
                    "integrityHash must start with 'sha256-', 'sha384-' or 'sha512-' when set: \
                     got '{}'",
                    inputs.integrity_hash
                ),
            ));
        }
        Ok(())
    }

    fn parent(&self, inputs: &InlineScriptInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &InlineScriptInputs) -> String {
        format!("inline script {} v{}", inputs.display_name, inputs.version)
    }

    fn preview(&self, _inputs: &InlineScriptInputs, created_on: &str) -> InlineScriptOutputs {
        InlineScriptOutputs {
            hosted_location: String::new(),
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &InlineScriptInputs,
    ) -> Result<(ResourceId, InlineScriptOutputs)> {
        let created: InlineBody = ctx.post(
            &format!("/v2/sites/{}/registered_scripts/inline", inputs.site_id),
            request_body(inputs),
        )?;
        let id = assigned_id(&created.id, self.type_name())?;
        let stamp = now();
        Ok((
            ResourceId::child(&inputs.site_id, id),
            InlineScriptOutputs {
                hosted_location: created.hosted_location,
                created_on: or_prior(created.created_on, &stamp),
                last_updated: or_prior(created.last_updated, &stamp),
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<InlineScriptInputs, InlineScriptOutputs>,
    ) -> Result<(InlineScriptInputs, InlineScriptOutputs)> {
        let script_id = id.child_id()?;
        let list: ScriptList = ctx.get(&format!("/v2/sites/{}/registered_scripts", id.parent))?;
        let script = list
            .registered_scripts
            .into_iter()
            .find(|script| script.id == script_id)
            .ok_or_else(|| Error::not_found(format!("inline script {script_id}")))?;

        // The list endpoint never returns source and sometimes omits the version.
        let version = match (script.version.is_empty(), prior.inputs.version.is_empty()) {
            (false, _) => script.version,
            (true, false) => prior.inputs.version.clone(),
            (true, true) => {
                warn!(
                    "Inline script {} has no reported version, recording {UNKNOWN_VERSION}",
                    script.display_name
                );
                UNKNOWN_VERSION.to_string()
            }
        };

        Ok((
            InlineScriptInputs {
                site_id: id.parent.clone(),
                display_name: script.display_name,
                source_code: prior.inputs.source_code.clone(),
                version,
                integrity_hash: script.integrity_hash,
                can_copy: script.can_copy,
            },
            InlineScriptOutputs {
                hosted_location: or_prior(script.hosted_location, &prior.outputs.hosted_location),
                created_on: or_prior(script.created_on, &prior.outputs.created_on),
                last_updated: or_prior(script.last_updated, &prior.outputs.last_updated),
            },
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        id: &ResourceId,
        _inputs: &InlineScriptInputs,
        _prior: &InlineScriptOutputs,
    ) -> Result<InlineScriptOutputs> {
        Err(Error::validation(
            "inline_script",
            format!("{id:?} cannot be changed in place; every field change replaces the script"),
        ))
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!(
            "/v2/sites/{}/registered_scripts/{}",
            id.parent,
            id.child_id()?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{SITE, context};
    use declarative::{DiffOutcome, Reconciler};
    use flowkit::Method;
    use flowkit::transport::MockTransport;

    fn inputs() -> InlineScriptInputs {
        InlineScriptInputs {
            site_id: SITE.into(),
            display_name: "ConsentBanner".into(),
            source_code: "console.log('consent');".into(),
            version: "1.0.0".into(),
            integrity_hash: String::new(),
            can_copy: true,
        }
    }

    fn snapshot() -> Snapshot<InlineScriptInputs, InlineScriptOutputs> {
        Snapshot {
            id: format!("{SITE}/inline_scripts/consentbanner"),
            inputs: inputs(),
            outputs: InlineScriptOutputs {
                hosted_location: "https://cdn.webflow.com/consent.js".into(),
                created_on: "2024-06-01T00:00:00Z".into(),
                last_updated: "2024-06-01T00:00:00Z".into(),
            },
        }
    }

    #[test]
    fn test_validation() {
        assert!(InlineScript.validate(&inputs()).is_ok());

        let mut bad = inputs();
        bad.source_code = "x".repeat(MAX_SOURCE_LEN + 1);
        let message = InlineScript.validate(&bad).unwrap_err().to_string();
        assert!(message.contains("2001"));

        let mut bad = inputs();
        bad.source_code = String::new();
        assert!(InlineScript.validate(&bad).is_err());

        let mut bad = inputs();
        bad.display_name = "consent banner".into();
        assert!(InlineScript.validate(&bad).is_err());

        let mut bad = inputs();
        bad.integrity_hash = "md5-abc".into();
        assert!(InlineScript.validate(&bad).is_err());
    }

    #[test]
    fn test_any_change_replaces() {
        let mut desired = inputs();
        desired.source_code = "console.log('v2');".into();
        assert!(matches!(
            Reconciler::new(InlineScript).diff(&inputs(), &desired).unwrap(),
            DiffOutcome::Replace { .. }
        ));
    }

    #[test]
    fn test_create_posts_inline() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Post,
            format!("/v2/sites/{SITE}/registered_scripts/inline"),
            201,
            &json!({
                "id": "consentbanner",
                "displayName": "ConsentBanner",
                "hostedLocation": "https://cdn.webflow.com/consent.js",
                "version": "1.0.0",
                "createdOn": "2024-06-01T00:00:00Z"
            }),
        );

        let created = Reconciler::new(InlineScript)
            .create(&context(&mock, false), &inputs())
            .unwrap();
        assert_eq!(created.id, format!("{SITE}/inline_scripts/consentbanner"));
        assert_eq!(created.outputs.hosted_location, "https://cdn.webflow.com/consent.js");

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["sourceCode"], "console.log('consent');");
        assert!(body.get("integrityHash").is_none());
    }

    #[test]
    fn test_read_keeps_source_and_version_from_state() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            format!("/v2/sites/{SITE}/registered_scripts"),
            200,
            &json!({"registeredScripts": [{
                "id": "consentbanner",
                "displayName": "ConsentBanner",
                "canCopy": true
            }]}),
        );

        let observed = Reconciler::new(InlineScript)
            .read(&context(&mock, false), &snapshot())
            .unwrap()
            .unwrap();
        assert_eq!(observed.inputs, inputs());
        assert_eq!(
            observed.outputs.hosted_location,
            "https://cdn.webflow.com/consent.js"
        );
    }

    #[test]
    fn test_missing_from_list_is_gone() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            format!("/v2/sites/{SITE}/registered_scripts"),
            200,
            &json!({"registeredScripts": []}),
        );

        let observed = Reconciler::new(InlineScript)
            .read(&context(&mock, false), &snapshot())
            .unwrap();
        assert!(observed.is_none());
    }
}
