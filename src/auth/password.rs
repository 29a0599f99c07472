//! Password hashing and verification using Argon2id

use argon2::{password_hash::PasswordHasher as _, Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordVerifier, SaltString};
use rand::rngs::OsRng;

use crate::error::AppError;

/// Password hasher with configurable parameters
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create hasher with default parameters (OWASP recommended)
    pub fn new() -> Self {
        // m=64MiB, t=3 iterations, p=4 lanes
        let params = Params::new(65536, 3, 4, None).unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Create hasher with explicit cost parameters
    pub fn with_params(m_cost_kib: u32, t_cost: u32, p_cost: u32) -> Result<Self, AppError> {
        let params = Params::new(m_cost_kib, t_cost, p_cost, None)
            .map_err(|e| AppError::Config(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string
    pub fn hash(&self, password: &[u8]) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password, &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// The cost parameters embedded in the hash are used, not the hasher's own.
    /// Returns `false` for a mismatch and for a hash that cannot be parsed.
    pub fn verify(&self, password: &[u8], hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Failed to parse stored password hash: {:?}", e);
                return false;
            }
        };

        self.argon2.verify_password(password, &parsed_hash).is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
