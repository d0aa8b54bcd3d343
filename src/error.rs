//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication failed")]
    Unauthorized {
        /// 机器可读错误码，例如 INVALID_REFRESH_TOKEN
        code: &'static str,
        message: String,
    },

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// 通用 401 错误
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized {
            code: "UNAUTHORIZED",
            message: message.into(),
        }
    }

    /// 登录失败：用户不存在和密码错误返回完全相同的错误，防止用户枚举
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized {
            code: "INVALID_CREDENTIALS",
            message: "Invalid email or password".to_string(),
        }
    }

    /// 刷新令牌无效、已轮换或已过期
    pub fn invalid_refresh_token() -> Self {
        AppError::Unauthorized {
            code: "INVALID_REFRESH_TOKEN",
            message: "Invalid refresh token".to_string(),
        }
    }

    /// 请求中没有携带刷新令牌
    pub fn refresh_token_required() -> Self {
        AppError::Unauthorized {
            code: "REFRESH_TOKEN_REQUIRED",
            message: "Refresh token is required".to_string(),
        }
    }

    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取机器可读错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized { code, .. } => code,
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) | AppError::Config(_) | AppError::Internal => "INTERNAL_ERROR",
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized { message, .. } => message.clone(),
            AppError::Forbidden => "Forbidden - Insufficient permissions".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Database(_) | AppError::Config(_) | AppError::Internal => {
                "Internal server error".to_string()
            }
        }
    }
}

/// 错误响应 DTO
/// 格式: {"status": "error", "error": {"code", "message"}}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 记录错误日志（完整错误链在日志里，响应里只有脱敏消息）
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Application error");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "Request rejected");
        }

        let error_response = ErrorResponse {
            status: "error",
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.user_message(),
                details: None,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// 从 String 转换为 AppError::Config
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Config(s)
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 从 validator::ValidationErrors 转换
impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
