//! Site membership user - `{siteId}/users/{userId}`
//!
//! Users are invited by email. The email cannot change afterwards; access
//! groups and the display name can.

use declarative::{ApplyContext, DiffRules, ResourceKind, Snapshot};
use flowkit::{Error, IdShape, ResourceId, Result, validate};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{SITE_ID_HINT, assigned_id, or_prior};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputs {
    pub site_id: String,
    pub email: String,
    /// Access group slugs; order does not matter
    #[serde(default)]
    pub access_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOutputs {
    #[serde(default)]
    pub is_email_verified: bool,
    /// "invited", "verified" or "unverified"
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub invited_on: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub last_login: String,
}

#[derive(Debug, Deserialize)]
struct AccessGroup {
    slug: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    is_email_verified: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    invited_on: String,
    #[serde(default)]
    last_updated: String,
    #[serde(default)]
    last_login: Option<String>,
    #[serde(default)]
    access_groups: Vec<AccessGroup>,
    #[serde(default)]
    data: UserData,
}

impl UserBody {
    fn outputs(&self, prior: Option<&UserOutputs>) -> UserOutputs {
        let (created_on, invited_on) = prior.map_or(("", ""), |p| {
            (p.created_on.as_str(), p.invited_on.as_str())
        });
        UserOutputs {
            is_email_verified: self.is_email_verified,
            status: self.status.clone(),
            created_on: or_prior(self.created_on.clone(), created_on),
            invited_on: or_prior(self.invited_on.clone(), invited_on),
            last_updated: self.last_updated.clone(),
            last_login: self.last_login.clone().unwrap_or_default(),
        }
    }
}

fn user_path(id: &ResourceId) -> Result<String> {
    Ok(format!("/v2/sites/{}/users/{}", id.parent, id.child_id()?))
}

fn patch_body(inputs: &UserInputs) -> Value {
    let mut body = json!({ "accessGroups": inputs.access_groups });
    if let Some(name) = &inputs.name {
        body["data"] = json!({ "name": name });
    }
    body
}

fn check_email(email: &str) -> Result<()> {
    validate::required("email", email, "'jane@example.com'")?;
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid || email.contains(char::is_whitespace) {
        return Err(Error::validation(
            "email",
            format!("email '{email}' is not a valid address. Example: 'jane@example.com'"),
        ));
    }
    Ok(())
}

/// Member of a site's user accounts
pub struct User;

impl ResourceKind for User {
    type Inputs = UserInputs;
    type Outputs = UserOutputs;

    fn type_name(&self) -> &'static str {
        "user"
    }

    fn shape(&self) -> IdShape {
        IdShape::Child {
            parent: "siteId",
            discriminator: "users",
            child: "userId",
        }
    }

    fn diff_rules(&self) -> DiffRules {
        DiffRules {
            replace: &["siteId", "email"],
            ..DiffRules::default()
        }
    }

    fn validate(&self, inputs: &UserInputs) -> Result<()> {
        validate::hex_id("siteId", &inputs.site_id, SITE_ID_HINT)?;
        check_email(&inputs.email)?;
        for (i, slug) in inputs.access_groups.iter().enumerate() {
            validate::required(&validate::indexed("accessGroups", i), slug, "'premium-members'")?;
        }
        Ok(())
    }

    fn parent(&self, inputs: &UserInputs) -> String {
        inputs.site_id.clone()
    }

    fn describe(&self, inputs: &UserInputs) -> String {
        format!("user {}", inputs.email)
    }

    fn preview(&self, _inputs: &UserInputs, created_on: &str) -> UserOutputs {
        UserOutputs {
            is_email_verified: false,
            status: "invited".to_string(),
            created_on: created_on.to_string(),
            invited_on: created_on.to_string(),
            last_updated: created_on.to_string(),
            last_login: String::new(),
        }
    }

    fn create(&self, ctx: &ApplyContext, inputs: &UserInputs) -> Result<(ResourceId, UserOutputs)> {
        let invited: UserBody = ctx.post(
            &format!("/v2/sites/{}/users/invite", inputs.site_id),
            json!({
                "email": inputs.email,
                "accessGroups": inputs.access_groups,
            }),
        )?;
        let id = ResourceId::child(&inputs.site_id, assigned_id(&invited.id, self.type_name())?);
        let outputs = invited.outputs(None);

        // The invite endpoint takes no profile data. The invite already
        // exists remotely, so a failed follow-up must not drop the identity.
        if inputs.name.is_some() {
            match ctx.patch::<UserBody>(&user_path(&id)?, patch_body(inputs)) {
                Ok(updated) => return Ok((id, updated.outputs(Some(&outputs)))),
                Err(err) => warn!(
                    "Invited {} but could not set their name: {err}. \
                     Edit the name and apply again to retry",
                    inputs.email
                ),
            }
        }
        Ok((id, outputs))
    }

    fn read(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        prior: &Snapshot<UserInputs, UserOutputs>,
    ) -> Result<(UserInputs, UserOutputs)> {
        let body: UserBody = ctx.get(&user_path(id)?)?;
        let outputs = body.outputs(Some(&prior.outputs));
        let email = or_prior(body.data.email, &prior.inputs.email);

        Ok((
            UserInputs {
                site_id: id.parent.clone(),
                email,
                access_groups: body.access_groups.into_iter().map(|g| g.slug).collect(),
                name: body.data.name.or_else(|| prior.inputs.name.clone()),
            },
            outputs,
        ))
    }

    fn update(
        &self,
        ctx: &ApplyContext,
        id: &ResourceId,
        inputs: &UserInputs,
        prior: &UserOutputs,
    ) -> Result<UserOutputs> {
        let updated: UserBody = ctx.patch(&user_path(id)?, patch_body(inputs))?;
        Ok(updated.outputs(Some(prior)))
    }

    fn delete(&self, ctx: &ApplyContext, id: &ResourceId) -> Result<()> {
        ctx.delete(&user_path(id)?)
    }
}
