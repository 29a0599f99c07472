//! Credential verification against the user store

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::{
    auth::password::PasswordHasher,
    error::{AppError, AuthError},
    models::Principal,
    repository::UserStore,
};

/// Undo the base64 transport encoding applied to login passwords
pub fn decode_transport_password(encoded: &str) -> Result<Vec<u8>, AuthError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedPayload("password is not valid base64".to_string()))
}

/// Hashed once per verifier; checked on unknown-user logins
const DUMMY_PASSWORD: &[u8] = b"jwt-guard-unknown-user";

pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            dummy_hash,
        })
    }

    /// Look up `username` and check `candidate` against its stored hash.
    ///
    /// Store failures are returned as-is; lookups are neither retried nor cached.
    pub async fn verify(
        &self,
        username: &str,
        candidate: &[u8],
    ) -> Result<Arc<dyn Principal>, AuthError> {
        let Some(principal) = self.store.find_by_username(username).await? else {
            // 未知用户同样付出一次 Argon2 开销，响应时间不暴露用户是否存在
            self.hasher.verify(candidate, &self.dummy_hash);
            return Err(AuthError::UnknownUser(username.to_string()));
        };

        if !self.hasher.verify(candidate, principal.password()) {
            return Err(AuthError::BadCredentials(username.to_string()));
        }

        Ok(principal)
    }
}
