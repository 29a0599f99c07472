//! Authentication-related models

use serde::Serialize;

/// Login response
///
/// The token itself travels only in the `access_token` cookie (and the
/// `Authorization` response header in header-only deployments).
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub expires_in: u64,
}

/// Current identity response
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub username: String,
    pub authorities: Vec<String>,
}
