//! Page resource - `{siteId}/pages/{pageId}`
//!
//! Pages are built in the Designer and cannot be created through the API.
//! Create adopts an existing page so its metadata can feed other resources
//! (e.g. `page_content` or `page_custom_code`). Delete only stops tracking.

use declarative::{ApplyContext, DeletePolicy, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};

use super::{PAGE_ID_HINT, SITE_ID_HINT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInputs {
    pub site_id: String,
    pub page_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutputs {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    /// Folder page holding this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Set for CMS template pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    #[serde(default)]
    site_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    collection_id: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    last_updated: String,
}

impl From<PageBody> for PageOutputs {
    fn from(body: PageBody) -> Self {
        Self {
            title: body.title,
            slug: body.slug,
            parent_id: body.parent_id.filter(|p| !p.is_empty()),
            collection_id: body.collection_id.filter(|c| !c.is_empty()),
            archived: body.archived,
            draft: body.draft,
            created_on: body.created_on,
            last_updated: body.last_updated,
        }
    }
}

fn fetch(ctx: &ApplyContext, site_id: &str, page_id: &str) -> Result<PageOutputs> {
    let page: PageBody = ctx.get(&format!("/v2/pages/{page_id}"))?;
    if !page.site_id.is_empty() && page.site_id != site_id {
        return Err(Error::validation(
            "pageId",
            format!(
                "page {page_id} belongs to site {}, not {site_id}. Check that siteId and \
                 pageId come from the same site",
                page.site_id
            ),
        ));
    }
    Ok(page.into())
}

/// Existing page adopted for tracking
pub struct Page;

impl ResourceKind for Page {
    type Inputs = PageInputs;
    type Outputs = PageOutputs;

    fn type_name(&self) -> &'static str {
        "page"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "pages",
            child: "pageId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules::replace_all()
    }

    fn validate(&self, inputs: &PageInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate::hex_id("pageId", &inputs.page_id, PAGE_ID_HINT)
    }

    fn parent(&self, inputs: &PageInputs) -> String {
        inputs.site_id.clone()
    }

    fn preview(&self, inputs: &PageInputs, created_on: &str) -> PageOutputs {
        PageOutputs {
            title: String::new(),
            slug: inputs.page_id.clone(),
            parent_id: None,
            collection_id: None,
            archived: false,
            draft: false,
            created_on: created_on.to_string(),
            last_updated: created_on.to_string(),
        }
    }

    fn create(&self, ctx: &ApplyContext, inputs: &PageInputs) -> Result<(ResourceId, PageOutputs)> {
        let outputs = fetch(ctx, &inputs.site_id, &inputs.page_id)?;
        Ok((ResourceId::child(&inputs.site_id, &inputs.page_id), outputs))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        _prior: &Snapshot<PageInputs, PageOutputs>,
    ) -> Result<(PageInputs, PageOutputs)> {
        let page_id = id.child_id()?;
        let outputs = fetch(ctx, &id.parent, page_id)?;
        Ok((
            PageInputs {
                site_id: id.parent.clone(),
                page_id: page_id.to_string(),
            },
            outputs,
        ))
    }

    fn update(
        &self,
        _ctx: &ApplyContext,
        _id: &ResourceId,
        _inputs: &PageInputs,
        prior: &PageOutputs,
    ) -> Result<PageOutputs> {
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
    use crate::resource::testing::{PAGE, SITE, context};
    use declarative::Reconciler;
    use flowkit::Method;
    use flowkit::transport::MockTransport;
    use serde_json::json;

    fn inputs() -> PageInputs {
        PageInputs {
            site_id: SITE.into(),
            page_id: PAGE.into(),
        }
    }

    #[test]
    fn test_adopt_reads_page() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            format!("/v2/pages/{PAGE}"),
            200,
            &json!({
                "id": PAGE,
                "siteId": SITE,
                "title": "Pricing",
                "slug": "pricing",
                "parentId": "",
                "draft": true,
                "createdOn": "2024-01-01T00:00:00Z",
                "lastUpdated": "2024-04-01T00:00:00Z"
            }),
        );

        let ctx = context(&mock, false);
        let reconciler = Reconciler::new(Page);
        let adopted = reconciler.create(&ctx, &inputs()).unwrap();
        assert_eq!(adopted.id, format!("{SITE}/pages/{PAGE}"));
        assert_eq!(adopted.outputs.slug, "pricing");
        assert_eq!(adopted.outputs.parent_id, None);
        assert!(adopted.outputs.draft);

        let observed = reconciler.read(&ctx, &adopted).unwrap().unwrap();
        assert_eq!(observed.inputs, inputs());
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn test_page_from_another_site_rejected() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            format!("/v2/pages/{PAGE}"),
            200,
            &json!({"id": PAGE, "siteId": "aaaaaaaaaaaaaaaaaaaaaaaa", "title": "Pricing"}),
        );

        let err = Reconciler::new(Page)
            .create(&context(&mock, false), &inputs())
            .unwrap_err();
        assert!(err.to_string().contains("same site"));
    }

    #[test]
    fn test_missing_page_cannot_be_adopted() {
        let mock = MockTransport::new();
        let err = Reconciler::new(Page)
            .create(&context(&mock, false), &inputs())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_only_untracks() {
        let mock = MockTransport::new();
        Reconciler::new(Page)
            .delete(&context(&mock, false), &format!("{SITE}/pages/{PAGE}"))
            .unwrap();
        assert_eq!(mock.request_count(), 0);
    }
}
