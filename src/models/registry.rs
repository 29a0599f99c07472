//! Discriminator-driven decoding of polymorphic user payloads
//!
//! A login body carries a `type` field naming the concrete user
//! representation. The registry maps that name to a decode function; the
//! discriminator is stripped and the remaining fields are decoded into the
//! registered variant.
//!
//! Registration takes `&mut self`, so once the registry is shared behind an
//! `Arc` in the application state it can no longer change.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::error::AuthError;
use crate::models::principal::Principal;

/// Reserved key holding the discriminator
pub const TYPE_FIELD: &str = "type";

/// Decodes the discriminator-less document into a concrete principal
pub type DecodeFn =
    Box<dyn Fn(Value) -> Result<Box<dyn Principal>, serde_json::Error> + Send + Sync>;

#[derive(Default)]
pub struct PrincipalTypeRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl PrincipalTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a serde-decodable variant under `discriminator`.
    /// A duplicate discriminator replaces the previous mapping.
    pub fn register<P>(&mut self, discriminator: impl Into<String>) -> &mut Self
    where
        P: Principal + DeserializeOwned + 'static,
    {
        self.register_with(discriminator, |value| {
            serde_json::from_value::<P>(value).map(|p| Box::new(p) as Box<dyn Principal>)
        })
    }

    /// Register an arbitrary decode function under `discriminator`.
    /// A duplicate discriminator replaces the previous mapping.
    pub fn register_with<F>(&mut self, discriminator: impl Into<String>, decode: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Box<dyn Principal>, serde_json::Error> + Send + Sync + 'static,
    {
        self.insert_decoder(discriminator.into(), Box::new(decode));
        self
    }

    /// Register a whole mapping at once
    pub fn register_all<I>(&mut self, mapping: I) -> &mut Self
    where
        I: IntoIterator<Item = (String, DecodeFn)>,
    {
        for (discriminator, decode) in mapping {
            self.insert_decoder(discriminator, decode);
        }
        self
    }

    fn insert_decoder(&mut self, discriminator: String, decode: DecodeFn) {
        if self.decoders.insert(discriminator.clone(), decode).is_some() {
            tracing::debug!(%discriminator, "Replaced principal type registration");
        }
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.decoders.contains_key(discriminator)
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Registered discriminators, sorted
    pub fn discriminators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parse a raw JSON body and resolve it
    pub fn resolve_bytes(&self, body: &[u8]) -> Result<Box<dyn Principal>, AuthError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|_| AuthError::MalformedPayload("body is not valid JSON".to_string()))?;
        self.resolve(payload)
    }

    /// Resolve a parsed document into its registered variant.
    ///
    /// An unregistered discriminator fails before any other field is looked at.
    pub fn resolve(&self, payload: Value) -> Result<Box<dyn Principal>, AuthError> {
        let Value::Object(mut fields) = payload else {
            return Err(AuthError::MalformedPayload("expected a JSON object".to_string()));
        };

        let discriminator = take_discriminator(&mut fields)?;

        let decode = self.decoders.get(&discriminator).ok_or_else(|| {
            tracing::error!(%discriminator, "Unrecognized principal type");
            AuthError::UnrecognizedType(discriminator.clone())
        })?;

        decode(Value::Object(fields))
            .map_err(|e| AuthError::MalformedPayload(describe_decode_error(&e)))
    }
}

impl fmt::Debug for PrincipalTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrincipalTypeRegistry")
            .field("discriminators", &self.discriminators())
            .finish()
    }
}

fn take_discriminator(fields: &mut Map<String, Value>) -> Result<String, AuthError> {
    match fields.remove(TYPE_FIELD) {
        Some(Value::String(discriminator)) => Ok(discriminator),
        Some(_) => Err(AuthError::MalformedPayload(format!(
            "'{}' must be a string",
            TYPE_FIELD
        ))),
        None => Err(AuthError::MalformedPayload(format!(
            "missing '{}' discriminator",
            TYPE_FIELD
        ))),
    }
}

// serde messages for type mismatches quote the offending value, which may be
// the password. Only structural messages are passed through.
fn describe_decode_error(e: &serde_json::Error) -> String {
    let message = e.to_string();
    if message.starts_with("missing field") || message.starts_with("unknown field") {
        message
    } else {
        "field has an unexpected shape".to_string()
    }
}
