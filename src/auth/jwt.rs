//! JWT token issuance and verification
//! HS512-signed access tokens carrying the principal's identity claims

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Profile, SecurityConfig},
    error::{AppError, AuthError},
    models::{Principal, PrincipalId},
};

/// Roles claim value for a principal without roles
pub const DEFAULT_ROLE: &str = "DEFAULT_ROLE";

/// HS512 needs at least 512 bits of key material
pub const MIN_KEY_BYTES: usize = 64;

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Expiration
    pub exp: i64,

    /// Username
    #[serde(default)]
    pub username: String,

    /// Comma-joined roles, or `DEFAULT_ROLE`
    #[serde(default)]
    pub roles: String,

    /// ISO-8601 local timestamp
    #[serde(default)]
    pub created_at: String,

    /// ISO-8601 local timestamp
    #[serde(default)]
    pub updated_at: String,

    /// Principal ID
    #[serde(default)]
    pub id: PrincipalId,

    /// Issued at
    pub iat: i64,

    /// JWT ID (unique token identifier)
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    /// Roles claim split back into role names, sentinel excluded
    pub fn role_list(&self) -> Vec<String> {
        self.roles
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty() && *role != DEFAULT_ROLE)
            .map(str::to_string)
            .collect()
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    /// Seconds until expiry, used for the cookie Max-Age
    pub max_age_secs: u64,
}

/// Process-wide symmetric signing key
#[derive(Clone)]
pub struct SigningKey {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Load the key from configuration.
    ///
    /// A placeholder value (containing `INVALID`) is only accepted in the
    /// test and build profiles.
    pub fn from_config(security: &SecurityConfig, profile: Profile) -> Result<Self, AppError> {
        let encoded = security.secret_key.expose_secret();

        if encoded.contains("INVALID") && !profile.allows_placeholder_key() {
            return Err(AppError::Config(
                "secret key must be defined in the environment outside the test and build profiles"
                    .to_string(),
            ));
        }

        Self::from_base64(encoded)
    }

    /// Decode a standard base64 key
    pub fn from_base64(encoded: &str) -> Result<Self, AppError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AppError::Config("secret key is not valid base64".to_string()))?;

        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        if bytes.len() < MIN_KEY_BYTES {
            return Err(AppError::Config(format!(
                "secret key too short ({} bytes, min {})",
                bytes.len(),
                MIN_KEY_BYTES
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
        })
    }

    /// Generate a random 512-bit key, base64 encoded
    pub fn generate_base64() -> String {
        let mut bytes = [0u8; MIN_KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// JWT service
pub struct JwtService {
    key: SigningKey,
    expiration_secs: u64,
    validation: Validation,
}

impl JwtService {
    pub fn new(key: SigningKey, expiration_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        // An expired token is rejected no matter how recently it expired
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key,
            expiration_secs,
            validation,
        }
    }

    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let key = SigningKey::from_config(&config.security, config.profile)?;
        Ok(Self::new(key, config.security.token_expiration_secs))
    }

    pub fn expiration_secs(&self) -> u64 {
        self.expiration_secs
    }

    /// Issue a token for an authenticated principal
    pub fn issue(&self, principal: &dyn Principal) -> Result<IssuedToken, AppError> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        principal: &dyn Principal,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let expiration = now + Duration::seconds(self.expiration_secs as i64);
        let local_now = now.with_timezone(&Local).naive_local();

        let roles = principal.roles();
        let roles = if roles.is_empty() {
            DEFAULT_ROLE.to_string()
        } else {
            roles.into_iter().collect::<Vec<_>>().join(",")
        };

        let claims = Claims {
            sub: principal.username().to_string(),
            exp: expiration.timestamp(),
            username: principal.username().to_string(),
            roles,
            created_at: iso_local(principal.created_at().unwrap_or(local_now)),
            updated_at: iso_local(principal.updated_at().unwrap_or(local_now)),
            id: principal.id(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.key.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to encode access token: {:?}", e);
                AppError::Internal
            })?;

        Ok(IssuedToken {
            token,
            claims,
            max_age_secs: self.expiration_secs,
        })
    }

    /// Verify signature and expiry and decode the claims.
    /// Every failure collapses into `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e.kind());
                AuthError::InvalidToken
            })
    }
}

fn iso_local(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}
