//! User profile as returned by `GET user/{sub}/app`.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use tracing::{debug, trace};

/// Roles reachable from the browser-facing pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "root")]
    Root,
    #[serde(rename = "mod", alias = "moderator")]
    Moderator,
    #[serde(rename = "user")]
    User,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "mod" | "moderator" => Ok(Self::Moderator),
            "user" => Ok(Self::User),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::Moderator => "mod",
            Self::User => "user",
        })
    }
}

/// Backend-only roles. They can show up in upstream payloads but never grant
/// anything on the browser side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InternalRole {
    Root,
    Mqtt,
    Remote,
    Global,
    Local,
    Home,
    Cache,
    Api,
}

impl FromStr for InternalRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "mqtt" => Ok(Self::Mqtt),
            "remote" => Ok(Self::Remote),
            "global" => Ok(Self::Global),
            "local" => Ok(Self::Local),
            "home" => Ok(Self::Home),
            "cache" => Ok(Self::Cache),
            "api" => Ok(Self::Api),
            _ => Err(()),
        }
    }
}

#[derive(Deserialize)]
struct RawProfile {
    name: String,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawProfile")]
pub struct UserProfile {
    pub name: String,
    pub roles: BTreeSet<Role>,
}

impl From<RawProfile> for UserProfile {
    fn from(raw: RawProfile) -> Self {
        let roles = raw
            .roles
            .iter()
            .filter_map(|role| match role.parse::<Role>() {
                Ok(role) => Some(role),
                Err(()) => {
                    if role.parse::<InternalRole>().is_ok() {
                        trace!(role = %role, "ignoring backend-only role");
                    } else {
                        debug!(role = %role, "ignoring unknown role");
                    }
                    None
                }
            })
            .collect();
        Self {
            name: raw.name,
            roles,
        }
    }
}

impl UserProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            name: name.into(),
            roles: roles.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.roles.contains(&Role::Root)
    }

    #[must_use]
    pub fn is_mod(&self) -> bool {
        self.roles.contains(&Role::Moderator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_and_filters_roles() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"name":"bjorn","roles":["root","mqtt","mod","bogus"]}"#)
                .expect("profile");
        assert_eq!(profile.name, "bjorn");
        assert!(profile.is_root());
        assert!(profile.is_mod());
        assert_eq!(profile.roles.len(), 2);
    }

    #[test]
    fn missing_roles_is_plain_user() {
        let profile: UserProfile = serde_json::from_str(r#"{"name":"anna"}"#).expect("profile");
        assert!(!profile.is_root());
        assert!(profile.roles.is_empty());
    }

    #[test]
    fn serializes_role_names() {
        let profile = UserProfile::new("x", [Role::Moderator, Role::Root]);
        let json = serde_json::to_value(&profile).expect("json");
        assert_eq!(json["roles"], serde_json::json!(["root", "mod"]));
    }

    #[test]
    fn internal_roles_are_not_browser_roles() {
        assert!("mqtt".parse::<InternalRole>().is_ok());
        assert!("mqtt".parse::<Role>().is_err());
        assert_eq!(Role::Moderator.to_string(), "mod");
    }
}
