//! CMS collection item resource - `{collectionId}/items/{itemId}`

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{COLLECTION_ID_HINT, assigned_id, or_prior};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItemInputs {
    pub collection_id: String,
    /// Field values keyed by field slug; `name` and `slug` are required
    pub field_data: Map<String, Value>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_locale_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItemOutputs {
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub last_published: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    field_data: Map<String, Value>,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    cms_locale_id: Option<String>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
    #[serde(default)]
    last_published: Option<String>,
}

impl ItemBody {
    fn outputs(&self, prior: Option<&CollectionItemOutputs>) -> CollectionItemOutputs {
        let (created_on, last_updated) =
            prior.map_or(("", ""), |p| (p.created_on.as_str(), p.last_updated.as_str()));
        CollectionItemOutputs {
            created_on: or_prior(self.created_on.clone(), created_on),
            last_updated: or_prior(self.last_updated.clone(), last_updated),
            last_published: self.last_published.clone().unwrap_or_default(),
        }
    }
}

fn request_body(inputs: &CollectionItemInputs) -> Value {
    let mut body = json!({
        "fieldData": inputs.field_data,
        "isArchived": inputs.is_archived,
        "isDraft": inputs.is_draft,
    });
    if let Some(locale) = &inputs.cms_locale_id {
        body["cmsLocaleId"] = json!(locale);
    }
    body
}

fn field_string<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a str {
    fields.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Item in a CMS collection
pub struct CollectionItem;

impl ResourceKind for CollectionItem {
    type Inputs = CollectionItemInputs;
    type Outputs = CollectionItemOutputs;

    fn type_name(&self) -> &'static str {
        "collection_item"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "collectionId",
            discriminator: "items",
            child: "itemId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["collectionId"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &CollectionItemInputs) -> Result<()> {
        validate::hex_id("collectionId", &inputs.collection_id, COLLECTION_ID_HINT)?;
        for key in ["name", "slug"] {
            let field = format!("fieldData.{key}");
            match inputs.field_data.get(key) {
                Some(Value::String(value)) => {
                    validate::required(&field, value, "'My First Post'")?;
                }
                Some(_) => {
                    return Err(Error::validation(
                        field.clone(),
                        format!("{field} must be a string"),
                    ));
                }
                None => {
                    return Err(Error::validation(
                        field.clone(),
                        format!(
                            "{field} is required but was not provided. Every item needs a \
                             name and a slug (e.g., 'my-first-post')"
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn parent(&self, inputs: &CollectionItemInputs) -> String {
        inputs.collection_id.clone()
    }

    fn describe(&self, inputs: &CollectionItemInputs) -> String {
        format!("item '{}'", field_string(&inputs.field_data, "name"))
    }

    fn preview(&self, _inputs: &CollectionItemInputs, created_on: &str) -> CollectionItemOutputs {
        CollectionItemOutputs {
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
            last_published: String::new(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &CollectionItemInputs,
    ) -> Result<(ResourceId, CollectionItemOutputs)> {
        let created: ItemBody = ctx.post(
            &format!("/v2/collections/{}/items", inputs.collection_id),
            request_body(inputs),
        )?;
        let id = assigned_id(&created.id, self.type_name())?;
        Ok((
            ResourceId::child(&inputs.collection_id, id),
            created.outputs(None),
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<CollectionItemInputs, CollectionItemOutputs>,
    ) -> Result<(CollectionItemInputs, CollectionItemOutputs)> {
        let body: ItemBody = ctx.get(&format!(
            "/v2/collections/{}/items/{}",
            id.parent,
            id.child_id()?
        ))?;
        let outputs = body.outputs(Some(&prior.outputs));

        // Only declared fields are tracked; the CMS adds its own
        let field_data = body
            .field_data
            .into_iter()
            .filter(|(key, _)| prior.inputs.field_data.contains_key(key))
            .collect();

        Ok((
            CollectionItemInputs {
                collection_id: id.parent.clone(),
                field_data,
                is_archived: body.is_archived,
                is_draft: body.is_draft,
                cms_locale_id: prior.inputs.cms_locale_id.as_ref().and(body.cms_locale_id),
            },
            outputs,
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &CollectionItemInputs,
        prior: &CollectionItemOutputs,
    ) -> Result<CollectionItemOutputs> {
        let updated: ItemBody = ctx.patch(
            &format!("/v2/collections/{}/items/{}", id.parent, id.child_id()?),
            request_body(inputs),
        )?;
        Ok(updated.outputs(Some(prior)))
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!(
            "/v2/collections/{}/items/{}",
            id.parent,
            id.child_id()?
        ))
    }
}
