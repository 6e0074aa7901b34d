//! robots.txt resource - `{siteId}/robots.txt`
//!
//! Users write plain robots.txt text; the API speaks structured user-agent
//! rules. [`parse_rules`] and [`format_rules`] convert between the two.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{IdShape, ResourceId, Result, validate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{SITE_ID_HINT, now};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxtInputs {
    pub site_id: String,
    /// Full robots.txt text
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxtOutputs {
    #[serde(default)]
    pub last_modified: String,
}

/// One user-agent group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsRule {
    pub user_agent: String,
    #[serde(default)]
    pub allows: Vec<String>,
    #[serde(default)]
    pub disallows: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RobotsTxtBody {
    #[serde(default)]
    rules: Vec<RobotsRule>,
    #[serde(default)]
    sitemap: String,
}

/// Split robots.txt text into user-agent rules and the sitemap URL
///
/// Directives are case-insensitive. Allow/Disallow lines before the first
/// User-agent line, blank values and unknown directives are ignored.
pub fn parse_rules(content: &str) -> (Vec<RobotsRule>, String) {
    let mut rules: Vec<RobotsRule> = Vec::new();
    let mut sitemap = String::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(url) = directive(line, "sitemap") {
            sitemap = url.to_string();
        } else if let Some(agent) = directive(line, "user-agent") {
            rules.push(RobotsRule {
                user_agent: agent.to_string(),
                ..RobotsRule::default()
            });
        } else if let Some(rule) = rules.last_mut() {
            if let Some(path) = directive(line, "allow").filter(|p| !p.is_empty()) {
                rule.allows.push(path.to_string());
            } else if let Some(path) = directive(line, "disallow").filter(|p| !p.is_empty()) {
                rule.disallows.push(path.to_string());
            }
        }
    }

    (rules, sitemap)
}

/// Render rules and a sitemap URL as robots.txt text
pub fn format_rules(rules: &[RobotsRule], sitemap: &str) -> String {
    let mut out = String::new();

    for rule in rules {
        out.push_str(&format!("User-agent: {}\n", rule.user_agent));
        for path in &rule.allows {
            out.push_str(&format!("Allow: {path}\n"));
        }
        for path in &rule.disallows {
            out.push_str(&format!("Disallow: {path}\n"));
        }
    }

    if !sitemap.is_empty() {
        if !rules.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("Sitemap: {sitemap}\n"));
    }

    out
}

fn directive<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

fn normalize(content: &str) -> String {
    let (rules, sitemap) = parse_rules(content);
    format_rules(&rules, &sitemap)
}

fn request_body(content: &str) -> Value {
    let (rules, sitemap) = parse_rules(content);
    let mut body = json!({ "rules": rules });
    if !sitemap.is_empty() {
        body["sitemap"] = json!(sitemap);
    }
    body
}

/// Site robots.txt (one per site)
pub struct RobotsTxt;

impl ResourceKind for RobotsTxt {
    type Inputs = RobotsTxtInputs;
    type Outputs = RobotsTxtOutputs;

    fn type_name(&self) -> &'static str {
        "robots_txt"
    }

    fn shape(&self) -> IdShape {
        IdShape::Singleton {
            parent: "siteId",
            suffix: "robots.txt",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["siteId"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &RobotsTxtInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        validate::required(
            "content",
            &inputs.content,
            "'User-agent: *\\nAllow: /\\nSitemap: https://example.com/sitemap.xml'",
        )
    }

    fn parent(&self, inputs: &RobotsTxtInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &RobotsTxtInputs) -> String {
        format!("robots.txt for site {}", inputs.site_id)
    }

    fn preview(&self, _inputs: &RobotsTxtInputs, created_on: &str) -> RobotsTxtOutputs {
        RobotsTxtOutputs {
            last_modified: created_on.to_string(),
        }
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        inputs: &RobotsTxtInputs,
    ) -> Result<(ResourceId, RobotsTxtOutputs)> {
        let _: Value = ctx.put(
            &format!("/v2/sites/{}/robots_txt", inputs.site_id),
            request_body(&inputs.content),
        )?;
        Ok((
            ResourceId::singleton(&inputs.site_id),
            RobotsTxtOutputs {
                last_modified: now(),
            },
        ))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<RobotsTxtInputs, RobotsTxtOutputs>,
    ) -> Result<(RobotsTxtInputs, RobotsTxtOutputs)> {
        let body: Option<RobotsTxtBody> = ctx.get(&format!("/v2/sites/{}/robots_txt", id.parent))?;
        let body = body.unwrap_or_default();
        let observed = format_rules(&body.rules, &body.sitemap);

        // Keep the user's formatting when it means the same thing
        let content = if normalize(&prior.inputs.content) == observed {
            prior.inputs.content.clone()
        } else {
            observed
        };

        Ok((
            RobotsTxtInputs {
                site_id: id.parent.clone(),
                content,
            },
            prior.outputs.clone(),
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &RobotsTxtInputs,
        _prior: &RobotsTxtOutputs,
    ) -> Result<RobotsTxtOutputs> {
        let _: Value = ctx.put(
            &format!("/v2/sites/{}/robots_txt", id.parent),
            request_body(&inputs.content),
        )?;
        Ok(RobotsTxtOutputs {
            last_modified: now(),
        })
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&format!("/v2/sites/{}/robots_txt", id.parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{SITE, context};
    use declarative::{PREVIEW_TIMESTAMP, Reconciler};
    use flowkit::Method;
    use flowkit::transport::MockTransport;

    const CONTENT: &str = concat!(
        "User-agent: *\nAllow: /\nDisallow: /admin/\n",
        "\nSitemap: https://example.com/sitemap.xml\n",
    );

    #[test]
    fn test_parse_rules() {
        let (rules, sitemap) = parse_rules(
            concat!(
                "user-agent: Googlebot\nDISALLOW: /private\nAllow:\n",
                "\nUser-agent: *\nAllow: /\nsitemap: https://x.io/s.xml",
            ),
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].user_agent, "Googlebot");
        assert_eq!(rules[0].disallows, vec!["/private"]);
        assert!(rules[0].allows.is_empty());
        assert_eq!(rules[1].allows, vec!["/"]);
        assert_eq!(sitemap, "https://x.io/s.xml");
    }

    #[test]
    fn test_parse_ignores_orphan_directives() {
        let (rules, sitemap) = parse_rules("Disallow: /x\n# comment");
        assert!(rules.is_empty());
        assert!(sitemap.is_empty());
    }

    #[test]
    fn test_format_rules() {
        let (rules, sitemap) = parse_rules(CONTENT);
        assert_eq!(format_rules(&rules, &sitemap), CONTENT);
        assert_eq!(format_rules(&[], ""), "");
        assert_eq!(format_rules(&[], "https://x.io/s.xml"), "Sitemap: https://x.io/s.xml\n");
    }

    #[test]
    fn test_dry_run_identity_is_singleton() {
        let mock = MockTransport::new();
        let inputs = RobotsTxtInputs {
            site_id: SITE.into(),
            content: CONTENT.into(),
        };
        let preview = Reconciler::new(RobotsTxt)
            .create(&context(&mock, true), &inputs)
            .unwrap();
        assert_eq!(preview.id, format!("{SITE}/robots.txt"));
        assert_eq!(preview.outputs.last_modified, PREVIEW_TIMESTAMP);
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_create_sends_structured_rules() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Put,
            format!("/v2/sites/{SITE}/robots_txt"),
            200,
            &json!({}),
        );
        let inputs = RobotsTxtInputs {
            site_id: SITE.into(),
            content: CONTENT.into(),
        };
        Reconciler::new(RobotsTxt)
            .create(&context(&mock, false), &inputs)
            .unwrap();

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["rules"][0]["userAgent"], "*");
        assert_eq!(body["rules"][0]["disallows"][0], "/admin/");
        assert_eq!(body["sitemap"], "https://example.com/sitemap.xml");
    }

    #[test]
    fn test_read_keeps_equivalent_formatting() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::Get,
            format!("/v2/sites/{SITE}/robots_txt"),
            200,
            &json!({
                "rules": [{"userAgent": "*", "allows": ["/"], "disallows": ["/admin/"]}],
                "sitemap": "https://example.com/sitemap.xml"
            }),
        );
        let written = concat!(
            "user-agent: *\n  allow: /\ndisallow: /admin/\n",
            "sitemap: https://example.com/sitemap.xml",
        );
        let current = Snapshot {
            id: format!("{SITE}/robots.txt"),
            inputs: RobotsTxtInputs {
                site_id: SITE.into(),
                content: written.into(),
            },
            outputs: RobotsTxtOutputs {
                last_modified: "2024-01-01T00:00:00Z".into(),
            },
        };

        mock.respond_json(
            Method::Get,
            format!("/v2/sites/{SITE}/robots_txt"),
            200,
            &json!({"rules": [{"userAgent": "*", "disallows": ["/"]}]}),
        );

        let reconciler = Reconciler::new(RobotsTxt);
        let observed = reconciler
            .read(&context(&mock, false), &current)
            .unwrap()
            .unwrap();
        assert_eq!(observed.inputs.content, written);
        assert_eq!(observed.outputs.last_modified, "2024-01-01T00:00:00Z");

        let observed = reconciler
            .read(&context(&mock, false), &current)
            .unwrap()
            .unwrap();
        assert_eq!(observed.inputs.content, "User-agent: *\nDisallow: /\n");
    }
}
