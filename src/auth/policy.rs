//! Authorization policies checked after token validation.

use serde::Deserialize;

use crate::db::Role;
use crate::jwt::Identity;

pub const NOT_AN_ADMIN: &str = "not an admin";
pub const OTHER_USER: &str = "cannot access other user's data";
pub const NOT_IN_GROUP: &str = "user not in group";

/// The rule an endpoint requires of the caller's claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Any valid, matching token pair.
    Simple,
    /// Role must be `Admin`.
    Admin,
    /// Username must equal the given one.
    User(String),
    /// Email must be one of the given ones.
    Group(Vec<String>),
}

impl AuthPolicy {
    /// Check `identity` against the policy, returning the failure cause.
    pub fn evaluate(&self, identity: &Identity) -> Result<(), &'static str> {
        match self {
            AuthPolicy::Simple => Ok(()),
            AuthPolicy::Admin if identity.role == Role::Admin.as_str() => Ok(()),
            AuthPolicy::Admin => Err(NOT_AN_ADMIN),
            AuthPolicy::User(username) if identity.username == *username => Ok(()),
            AuthPolicy::User(_) => Err(OTHER_USER),
            AuthPolicy::Group(emails) if emails.contains(&identity.email) => Ok(()),
            AuthPolicy::Group(_) => Err(NOT_IN_GROUP),
        }
    }
}

/// Wire form of a policy: `{ "authType": "...", "username"?, "emails"? }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDescriptor {
    pub auth_type: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub emails: Option<Vec<String>>,
}

impl PolicyDescriptor {
    /// `None` when `authType` names no known policy.
    pub fn resolve(&self) -> Option<AuthPolicy> {
        match self.auth_type.as_str() {
            "Simple" => Some(AuthPolicy::Simple),
            "Admin" => Some(AuthPolicy::Admin),
            "User" => Some(AuthPolicy::User(self.username.clone().unwrap_or_default())),
            "Group" => Some(AuthPolicy::Group(self.emails.clone().unwrap_or_default())),
            _ => None,
        }
    }
}
