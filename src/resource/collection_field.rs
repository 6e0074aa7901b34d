//! CMS collection field resource - `{collectionId}/fields/{fieldId}`

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{COLLECTION_ID_HINT, assigned_id};

/// Field types the CMS accepts
pub const FIELD_TYPES: &[&str] = &[
    "PlainText",
    "RichText",
    "Image",
    "MultiImage",
    "Video",
    "Link",
    "Email",
    "Phone",
    "Number",
    "DateTime",
    "Switch",
    "Color",
    "Option",
    "File",
    "Reference",
    "MultiReference",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFieldInputs {
    pub collection_id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Type-specific settings (options, reference target, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFieldOutputs {
    #[serde(default)]
    pub is_editable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldBody {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    field_type: String,
    display_name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    help_text: Option<String>,
    #[serde(default)]
    is_editable: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionSchema {
    #[serde(default)]
    fields: Vec<FieldBody>,
}

/// Field in a CMS collection schema
pub struct CollectionField;

impl ResourceKind for CollectionField {
    type Inputs = CollectionFieldInputs;
    type Outputs = CollectionFieldOutputs;

    fn type_name(&self) -> &'static str {
        "collection_field"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "collectionId",
            discriminator: "fields",
            child: "fieldId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["collectionId", "type"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &CollectionFieldInputs) -> Result<()> {
        validate::hex_id("collectionId", &inputs.collection_id, COLLECTION_ID_HINT)?;
        validate::one_of("type", &inputs.field_type, FIELD_TYPES)?;
        validate::required("displayName", &inputs.display_name, "'Author Name'")?;
        validate::max_len("displayName", &inputs.display_name, 255)
    }

    fn parent(&self, inputs: &CollectionFieldInputs) -> String {
        inputs.collection_id.clone()
    }

    fn describe(&self, inputs: &CollectionFieldInputs) -> String {
        format!("{} field '{}'", inputs.field_type, inputs.display_name)
    }

    fn preview(
        &self,
        _inputs: &CollectionFieldInputs,
        _created_on: &str,
    ) -> CollectionFieldOutputs {
        CollectionFieldOutputs { is_editable: true }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &CollectionFieldInputs,
    ) -> Result<(ResourceId, CollectionFieldOutputs)> {
        let mut body = json!({
            "type": inputs.field_type,
            "displayName": inputs.display_name,
            "isRequired": inputs.is_required,
        });
        if let Some(slug) = &inputs.slug {
            body["slug"] = json!(slug);
        }
        if let Some(help) = &inputs.help_text {
            body["helpText"] = json!(help);
        }
        if let Some(validations) = &inputs.validations {
            body["validations"] = Value::Object(validations.clone());
        }

        let created: FieldBody = ctx.post(
            &format!("/v2/collections/{}/fields", inputs.collection_id),
            body,
        )?;
        let id = assigned_id(&created.id, self.type_name())?;
        Ok((
            ResourceId::child(&inputs.collection_id, id),
            CollectionFieldOutputs {
                is_editable: created.is_editable,
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<CollectionFieldInputs, CollectionFieldOutputs>,
    ) -> Result<(CollectionFieldInputs, CollectionFieldOutputs)> {
        let field_id = id.child_id()?;
        let schema: CollectionSchema = ctx.get(&format!("/v2/collections/{}", id.parent))?;
        let field = schema
            .fields
            .into_iter()
            .find(|field| field.id == field_id)
            .ok_or_else(|| {
                Error::not_found(format!("field {field_id} in collection {}", id.parent))
            })?;

        Ok((
            CollectionFieldInputs {
                collection_id: id.parent.clone(),
                field_type: field.field_type,
                display_name: field.display_name,
                slug: prior.inputs.slug.as_ref().and(field.slug),
                is_required: field.is_required,
                help_text: field.help_text.filter(|text| !text.is_empty()),
                // The schema endpoint does not echo validations
                validations: prior.inputs.validations.clone(),
            },
            CollectionFieldOutputs {
                is_editable: field.is_editable,
            },
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &CollectionFieldInputs,
        _prior: &CollectionFieldOutputs,
    ) -> Result<CollectionFieldOutputs> {
        let mut body = json!({
            "displayName": inputs.display_name,
            "isRequired": inputs.is_required,
            "helpText": inputs.help_text.clone().unwrap_or_default(),
        });
        if let Some(slug) = &inputs.slug {
            body["slug"] = json!(slug);
        }

        let updated: FieldBody = ctx.put(
            &format!("/v2/collections/{}/fields/{}", id.parent, id.child_id()?),
            body,
        )?;
        Ok(CollectionFieldOutputs {
            is_editable: updated.is_editable,
        })
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!(
            "/v2/collections/{}/fields/{}",
            id.parent,
            id.child_id()?
        ))
    }
}
