use serde::{Deserialize, Serialize};

/// Non-secret user record as returned by the login endpoint.
///
/// Role information arrives as raw backend fields; callers read roles through
/// [`RoleFlags`], which is derived once per identity change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "is_admin")]
    pub is_admin: bool,
    #[serde(default, alias = "is_superuser")]
    pub is_superuser: bool,
    #[serde(default, alias = "user_type")]
    pub user_type: Option<String>,
}

impl Identity {
    /// A stable positive id and a non-empty username.
    pub fn is_well_formed(&self) -> bool {
        self.id > 0 && !self.username.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_superuser: bool,
}

impl RoleFlags {
    pub fn derive(identity: &Identity) -> Self {
        let typed_admin = identity
            .user_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("admin"))
            .unwrap_or(false);
        Self {
            is_admin: identity.is_admin || typed_admin,
            is_superuser: identity.is_superuser,
        }
    }
}
