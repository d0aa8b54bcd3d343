//! Authentication-related models

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::user::UserResponse;

/// Stored refresh token. The signed token itself is never persisted,
/// only its SHA-256 digest.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Token refresh request (token may also arrive via cookie)
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Result of a token issuance (login, register, rotation)
#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}
