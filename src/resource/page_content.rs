//! Static page text content - `{pageId}/content`
//!
//! Writes replace the text of individual DOM nodes. The DOM endpoint returns
//! the whole page tree, so Read only confirms the page still exists and keeps
//! the last-applied node text. Delete leaves the page untouched.

use declarative::{ApplyContext, DeletePolicy, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{PAGE_ID_HINT, now};

/// Replacement text for one DOM node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeText {
    pub node_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContentInputs {
    pub page_id: String,
    pub nodes: Vec<NodeText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContentOutputs {
    #[serde(default)]
    pub last_updated: String,
}

fn put_nodes(ctx: &ApplyContext, inputs: &PageContentInputs) -> Result<PageContentOutputs> {
    let _: Value = ctx.put(
        &format!("/v2/pages/{}/dom", inputs.page_id),
        json!({ "nodes": inputs.nodes }),
    )?;
    Ok(PageContentOutputs {
        last_updated: now(),
    })
}

/// Text content of a static page
pub struct PageContent;

impl ResourceKind for PageContent {
    type Inputs = PageContentInputs;
    type Outputs = PageContentOutputs;

    fn type_name(&self) -> &'static str {
        "page_content"
    }

    fn shape(&self) -> IdShape {
        IdShape::Singleton {
            parent: "pageId",
            suffix: "content",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["pageId"],
            keyed: &[("nodes", "nodeId")],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &PageContentInputs) -> Result<()> {
        validate::hex_id("pageId", &inputs.page_id, PAGE_ID_HINT)?;
        validate::non_empty(
            "nodes",
            inputs.nodes.len(),
            "[{ nodeId = \"a1b2c3\", text = \"Welcome\" }]",
        )?;
        for (i, node) in inputs.nodes.iter().enumerate() {
            let field = format!("{}.nodeId", validate::indexed("nodes", i));
            validate::required(&field, &node.node_id, "'a1b2c3d4-e5f6-7890'")?;
        }
        validate::unique_keys(
            "nodes",
            "nodeId",
            inputs.nodes.iter().map(|n| n.node_id.as_str()),
        )
    }

    fn parent(&self, inputs: &PageContentInputs) -> String {
        inputs.page_id.clone()
    }

    fn describe(&self, inputs: &PageContentInputs) -> String {
        format!("{} text node(s) on page {}", inputs.nodes.len(), inputs.page_id)
    }

    fn preview(&self, _inputs: &PageContentInputs, created_on: &str) -> PageContentOutputs {
        PageContentOutputs {
            last_updated: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &PageContentInputs,
    ) -> Result<(ResourceId, PageContentOutputs)> {
        let outputs = put_nodes(ctx, inputs)?;
        Ok((ResourceId::singleton(&inputs.page_id), outputs))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<PageContentInputs, PageContentOutputs>,
    ) -> Result<(PageContentInputs, PageContentOutputs)> {
        let _: Value = ctx.get(&format!("/v2/pages/{}/dom", id.parent))?;
        Ok((
            PageContentInputs {
                page_id: id.parent.clone(),
                nodes: prior.inputs.nodes.clone(),
            },
            prior.outputs.clone(),
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        _id: &ResourceId,
        inputs: &PageContentInputs,
        _prior: &PageContentOutputs,
    ) -> Result<PageContentOutputs> {
        put_nodes(ctx, inputs)
    }

    fn delete(&self, _ctx: &ApplyContext, _id: &ResourceId) -> Result<()> {
        Ok(())
    }

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::Untrack
    }
}
