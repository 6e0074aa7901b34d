//! Webhook resource - `{siteId}/webhooks/{webhookId}`
//!
//! Webhooks cannot be modified after creation; every field is replace-class.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{SITE_ID_HINT, assigned_id, or_prior};

/// Events a webhook can subscribe to
pub const TRIGGER_TYPES: &[&str] = &[
    "form_submission",
    "site_publish",
    "page_created",
    "page_metadata_updated",
    "page_deleted",
    "ecomm_new_order",
    "ecomm_order_changed",
    "ecomm_inventory_changed",
    "memberships_user_account_added",
    "memberships_user_account_updated",
    "memberships_user_account_deleted",
    "collection_item_created",
    "collection_item_changed",
    "collection_item_deleted",
    "collection_item_unpublished",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookInputs {
    pub site_id: String,
    pub trigger_type: String,
    /// HTTPS endpoint receiving the events
    pub url: String,
    /// Optional event filter (form_submission only supports `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutputs {
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_triggered: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    site_id: String,
    trigger_type: String,
    url: String,
    #[serde(default)]
    filter: Option<Map<String, Value>>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_triggered: String,
}

impl WebhookBody {
    fn outputs(&self) -> WebhookOutputs {
        WebhookOutputs {
            created_on: self.created_on.clone(),
            last_triggered: self.last_triggered.clone(),
        }
    }
}

/// Site webhook subscription
pub struct Webhook;

impl ResourceKind for Webhook {
    type Inputs = WebhookInputs;
    type Outputs = WebhookOutputs;

    fn type_name(&self) -> &'static str {
        "webhook"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "webhooks",
            child: "webhookId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &WebhookInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate::one_of("triggerType", &inputs.trigger_type, TRIGGER_TYPES)?;
        validate::https_url("url", &inputs.url, "https://hooks.example.com/webflow")
    }

    fn parent(&self, inputs: &WebhookInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &WebhookInputs) -> String {
        format!("{} -> {}", inputs.trigger_type, inputs.url)
    }

    fn preview(&self, _inputs: &WebhookInputs, created_on: &str) -> WebhookOutputs {
        WebhookOutputs {
            created_on: created_on.to_string(),
            last_triggered: String::new(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &WebhookInputs,
    ) -> Result<(ResourceId, WebhookOutputs)> {
        let mut body = json!({
            "triggerType": inputs.trigger_type,
            "url": inputs.url,
        });
        if let Some(filter) = &inputs.filter {
            body["filter"] = Value::Object(filter.clone());
        }

        let created: WebhookBody =
            ctx.post(&format!("/v2/sites/{}/webhooks", inputs.site_id), body)?;
        let id = assigned_id(&created.id, self.type_name())?;
        Ok((ResourceId::child(&inputs.site_id, id), created.outputs()))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<WebhookInputs, WebhookOutputs>,
    ) -> Result<(WebhookInputs, WebhookOutputs)> {
        let body: WebhookBody = ctx.get(&format!("/v2/webhooks/{}", id.child_id()?))?;
        let outputs = WebhookOutputs {
            created_on: or_prior(body.created_on.clone(), &prior.outputs.created_on),
            last_triggered: body.last_triggered.clone(),
        };
        let site_id = if body.site_id.is_empty() {
            id.parent.clone()
        } else {
            body.site_id
        };

        Ok((
            WebhookInputs {
                site_id,
                trigger_type: body.trigger_type,
                url: body.url,
                // Not every response echoes the filter
                filter: body.filter.or_else(|| prior.inputs.filter.clone()),
            },
            outputs,
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        _id: &ResourceId,
        _inputs: &WebhookInputs,
        prior: &WebhookOutputs,
    ) -> Result<WebhookOutputs> {
        // Unreachable through the reconciler: every field is replace-class
        Ok(prior.clone())
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/webhooks/{}", id.child_id()?))
    }
}
