//! Session domain models
//! 会话独立于令牌有效性，用于用户可见的设备管理

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logical device/browser login
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// "active" 的定义: expires_at > now
    pub fn is_active(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// Terminate session request
#[derive(Debug, Deserialize)]
pub struct TerminateSessionRequest {
    pub session_id: Uuid,
}
