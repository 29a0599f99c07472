//! Bundled user representation

use chrono::NaiveDateTime;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::any::Any;
use std::collections::BTreeSet;

use super::principal::{Principal, PrincipalId};

/// Discriminator the binary registers [`StandardUser`] under
pub const STANDARD_USER_TYPE: &str = "AppUser";

/// General-purpose user carrying exactly the common capability set
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardUser {
    #[serde(default)]
    pub id: PrincipalId,
    pub username: String,
    pub password: Secret<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl StandardUser {
    pub fn new(
        id: PrincipalId,
        username: impl Into<String>,
        password: impl Into<String>,
        roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password: Secret::new(password.into()),
            roles: roles.into_iter().collect(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Principal for StandardUser {
    fn id(&self) -> PrincipalId {
        self.id.clone()
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        self.password.expose_secret()
    }

    fn roles(&self) -> BTreeSet<String> {
        self.roles.clone()
    }

    fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
