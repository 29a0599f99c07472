//! Authentication and authorization module

pub mod cookie;
pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;

pub use credentials::{decode_transport_password, CredentialVerifier};
pub use jwt::{Claims, IssuedToken, JwtService, SigningKey};
pub use middleware::{
    extract_token, get_auth_context, token_auth_middleware, AuthContext, AuthOutcome,
    RequestAuthenticator,
};
pub use password::PasswordHasher;
pub use policy::{require_authentication, OpenEndpoints, SecurityPolicy};
