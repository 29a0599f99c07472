//! Principal capability set shared by every registered user representation

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;

/// Opaque principal identifier, numeric or textual depending on the variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrincipalId {
    Number(i64),
    Text(String),
}

impl Default for PrincipalId {
    fn default() -> Self {
        PrincipalId::Number(0)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalId::Number(n) => write!(f, "{}", n),
            PrincipalId::Text(s) => f.write_str(s),
        }
    }
}

/// Authenticated subject data.
///
/// Concrete representations are registered under a discriminator in
/// [`PrincipalTypeRegistry`](crate::models::PrincipalTypeRegistry) and keep
/// their own field layout; this trait is the part the token pipeline reads.
///
/// `Debug` implementations must not print the password. Wrapping it in
/// `secrecy::Secret` takes care of that.
pub trait Principal: Send + Sync + fmt::Debug {
    fn id(&self) -> PrincipalId;

    fn username(&self) -> &str;

    /// Hashed (stored principal) or transport-encoded (login payload) secret
    fn password(&self) -> &str;

    fn roles(&self) -> BTreeSet<String>;

    fn created_at(&self) -> Option<NaiveDateTime> {
        None
    }

    fn updated_at(&self) -> Option<NaiveDateTime> {
        None
    }

    /// Access to the concrete variant
    fn as_any(&self) -> &dyn Any;
}
