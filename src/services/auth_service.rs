//! 认证服务：解析登录请求、校验凭证、签发令牌

use std::sync::Arc;

use crate::{
    auth::{
        credentials::{decode_transport_password, CredentialVerifier},
        jwt::{IssuedToken, JwtService},
    },
    error::{AppError, AuthError},
    models::{Principal, PrincipalTypeRegistry},
};

pub struct AuthService {
    registry: Arc<PrincipalTypeRegistry>,
    credentials: Arc<CredentialVerifier>,
    jwt_service: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        registry: Arc<PrincipalTypeRegistry>,
        credentials: Arc<CredentialVerifier>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            registry,
            credentials,
            jwt_service,
        }
    }

    /// 用户登录
    ///
    /// 失败原因只写入日志，对外统一为认证失败。
    pub async fn login(&self, body: &[u8]) -> Result<IssuedToken, AppError> {
        let principal = match self.authenticate(body).await {
            Ok(principal) => principal,
            Err(e) => {
                self.record_failure(&e);
                return Err(e.into());
            }
        };

        let issued = self.jwt_service.issue(principal.as_ref())?;

        tracing::info!(
            username = %issued.claims.sub,
            jti = %issued.claims.jti,
            "Login succeeded"
        );
        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);

        Ok(issued)
    }

    async fn authenticate(&self, body: &[u8]) -> Result<Arc<dyn Principal>, AuthError> {
        // 按 type 字段解码登录请求
        let submitted = self.registry.resolve_bytes(body)?;

        if submitted.username().is_empty() {
            return Err(AuthError::MalformedPayload("username must not be empty".to_string()));
        }

        // 请求中的密码经过 Base64 编码
        let candidate = decode_transport_password(submitted.password())?;

        self.credentials.verify(submitted.username(), &candidate).await
    }

    /// 记录登录失败
    fn record_failure(&self, error: &AuthError) {
        match error {
            AuthError::UnrecognizedType(discriminator) => {
                tracing::warn!(%discriminator, "Login rejected: unrecognized principal type");
            }
            AuthError::UnknownUser(username) => {
                tracing::warn!(%username, "Login rejected: user not found");
            }
            AuthError::BadCredentials(username) => {
                tracing::warn!(%username, "Login rejected: bad credentials");
            }
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Login failed: credential store error");
            }
            other => {
                tracing::warn!(reason = %other, "Login rejected");
            }
        }

        metrics::counter!("auth_login_total", "outcome" => error.kind()).increment(1);
    }
}
