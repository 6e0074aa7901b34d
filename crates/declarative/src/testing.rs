//! Test fixtures: a small resource kind backed by the scripted transport.

use crate::context::ApplyContext;
use crate::diff::DiffRules;
use crate::resource::ResourceKind;
use crate::types::{DeletePolicy, Snapshot};
use flowkit::transport::MockTransport;
use flowkit::{ApiClient, IdShape, ResourceId, Result, RetryConfig, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

pub const PARENT: &str = "5f0c8c9e1c9d440000e8d8c3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInputs {
    pub parent_id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOutputs {
    pub created_on: String,
}

/// Notes live under a parent; `parentId` is identity-bearing.
pub struct Note {
    pub policy: DeletePolicy,
}

impl Note {
    pub fn new() -> Self {
        Self {
            policy: DeletePolicy::Remote,
        }
    }
}

impl ResourceKind for Note {
    type Inputs = NoteInputs;
    type Outputs = NoteOutputs;

    fn type_name(&self) -> &'static str {
        "note"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "parentId",
            discriminator: "notes",
            child: "noteId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["parentId"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &NoteInputs) -> Result<()> {
        validate::hex_id("parentId", &inputs.parent_id, "")?;
        validate::required("title", &inputs.title, "'hello'")
    }

    fn parent(&self, inputs: &NoteInputs) -> String {
        inputs.parent_id.clone()
    }

    fn preview(&self, _inputs: &NoteInputs, created_on: &str) -> NoteOutputs {
        NoteOutputs {
            created_on: created_on.to_string(),
        }
    }

    fn create(&self, ctx: &ApplyContext, inputs: &NoteInputs) -> Result<(ResourceId, NoteOutputs)> {
        let response: Value = ctx.post(
            &format!("/v2/parents/{}/notes", inputs.parent_id),
            json!({"title": inputs.title, "body": inputs.body}),
        )?;
        let id = response["id"].as_str().unwrap_or_default().to_string();
        Ok((
            ResourceId::child(&inputs.parent_id, id),
            NoteOutputs {
                created_on: response["createdOn"].as_str().unwrap_or_default().to_string(),
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<NoteInputs, NoteOutputs>,
    ) -> Result<(NoteInputs, NoteOutputs)> {
        let response: Value = ctx.get(&format!("/v2/notes/{}", id.child_id()?))?;
        Ok((
            NoteInputs {
                parent_id: id.parent.clone(),
                title: response["title"].as_str().unwrap_or_default().to_string(),
                body: response["body"].as_str().unwrap_or_default().to_string(),
                tags: prior.inputs.tags.clone(),
            },
            NoteOutputs {
                created_on: response["createdOn"].as_str().unwrap_or_default().to_string(),
            },
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &NoteInputs,
        prior: &NoteOutputs,
    ) -> Result<NoteOutputs> {
        let _: Value = ctx.patch(
            &format!("/v2/notes/{}", id.child_id()?),
            json!({"title": inputs.title, "body": inputs.body}),
        )?;
        Ok(prior.clone())
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/notes/{}", id.child_id()?))
    }

    fn delete_policy(&self) -> DeletePolicy {
        self.policy
    }
}

pub fn note(title: &str) -> NoteInputs {
    NoteInputs {
        parent_id: PARENT.to_string(),
        title: title.to_string(),
        body: String::new(),
        tags: Vec::new(),
    }
}

pub fn context(mock: &MockTransport, dry_run: bool) -> ApplyContext {
    let client = ApiClient::with_transport(
        Arc::new(mock.clone()),
        RetryConfig::new(1, Duration::from_millis(1), Duration::from_millis(5)),
    );
    ApplyContext::new(client, dry_run)
}
