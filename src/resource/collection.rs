//! CMS collection resource - `{siteId}/collections/{collectionId}`

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{SITE_ID_HINT, assigned_id, or_prior};

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInputs {
    pub site_id: String,
    /// Plural name shown in the CMS (e.g. "Blog Posts")
    pub display_name: String,
    /// Singular name (e.g. "Blog Post")
    pub singular_name: String,
    /// URL slug; generated from the display name when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOutputs {
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionBody {
    #[serde(default)]
    id: String,
    display_name: String,
    singular_name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

/// CMS collection
pub struct Collection;

impl ResourceKind for Collection {
    type Inputs = CollectionInputs;
    type Outputs = CollectionOutputs;

    fn type_name(&self) -> &'static str {
        "collection"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "collections",
            child: "collectionId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        // The v2 API has no collection update endpoint
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &CollectionInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate::required("displayName", &inputs.display_name, "'Blog Posts'")?;
        validate::max_len("displayName", &inputs.display_name, MAX_NAME_LEN)?;
        validate::required("singularName", &inputs.singular_name, "'Blog Post'")?;
        validate::max_len("singularName", &inputs.singular_name, MAX_NAME_LEN)?;
        if let Some(slug) = &inputs.slug {
            validate::required("slug", slug, "'blog-posts'")?;
        }
        Ok(())
    }

    fn parent(&self, inputs: &CollectionInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &CollectionInputs) -> String {
        format!("collection '{}'", inputs.display_name)
    }

    fn preview(&self, _inputs: &CollectionInputs, created_on: &str) -> CollectionOutputs {
        CollectionOutputs {
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &CollectionInputs,
    ) -> Result<(ResourceId, CollectionOutputs)> {
        let mut body = json!({
            "displayName": inputs.display_name,
            "singularName": inputs.singular_name,
        });
        if let Some(slug) = &inputs.slug {
            body["slug"] = json!(slug);
        }

        let created: CollectionBody =
            ctx.post(&format!("/v2/sites/{}/collections", inputs.site_id), body)?;
        let id = assigned_id(&created.id, self.type_name())?;
        Ok((
            ResourceId::child(&inputs.site_id, id),
            CollectionOutputs {
                created_on: created.created_on,
                last_updated: created.last_updated,
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<CollectionInputs, CollectionOutputs>,
    ) -> Result<(CollectionInputs, CollectionOutputs)> {
        let body: CollectionBody = ctx.get(&format!("/v2/collections/{}", id.child_id()?))?;
        Ok((
            CollectionInputs {
                site_id: id.parent.clone(),
                display_name: body.display_name,
                singular_name: body.singular_name,
                // A generated slug is not drift when none was declared
                slug: prior.inputs.slug.as_ref().and(body.slug),
            },
            CollectionOutputs {
                created_on: or_prior(body.created_on, &prior.outputs.created_on),
                last_updated: or_prior(body.last_updated, &prior.outputs.last_updated),
            },
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        _id: &ResourceId,
        _inputs: &CollectionInputs,
        prior: &CollectionOutputs,
    ) -> Result<CollectionOutputs> {
        Ok(prior.clone())
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/collections/{}", id.child_id()?))
    }
}
