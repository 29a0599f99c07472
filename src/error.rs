//! 统一错误模型
//! 定义认证领域错误、HTTP 边界错误以及错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repository::StoreError;

/// 认证领域错误
///
/// 登录与令牌校验过程中产生的全部失败类型。对外统一折叠为 401，
/// 仅在服务端日志中保留细节。
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unrecognized principal type '{0}'")]
    UnrecognizedType(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("bad credentials for user '{0}'")]
    BadCredentials(String),

    #[error("invalid token")]
    InvalidToken,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// 用于指标标签的简短名称
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::UnrecognizedType(_) => "unrecognized_type",
            AuthError::MalformedPayload(_) => "malformed_payload",
            AuthError::UnknownUser(_) => "unknown_user",
            AuthError::BadCredentials(_) => "bad_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Store(_) => "store_failure",
        }
    }
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Config(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Authentication failed".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 凭证存储故障按 500 透传，其余认证失败一律 401，避免泄露用户是否存在
impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Store(_) => AppError::Internal,
            _ => AppError::Unauthorized,
        }
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        // 401 属于正常业务流程，不按错误级别记录
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        } else {
            tracing::info!(
                code = self.code(),
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
