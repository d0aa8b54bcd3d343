//! 会话服务：设备/浏览器登录的列表与终止

use crate::{
    error::AppError,
    models::session::Session,
    repository::SessionRepository,
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct SessionService {
    db: PgPool,
}

impl SessionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 用户的活跃会话，按创建时间倒序
    pub async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        SessionRepository::new(self.db.clone())
            .list_active(user_id)
            .await
    }

    /// 终止指定会话
    /// 会话不存在或不属于该用户时返回 404
    pub async fn terminate_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), AppError> {
        let repo = SessionRepository::new(self.db.clone());

        let session = repo.find_owned(user_id, session_id).await?.ok_or_else(|| {
            AppError::NotFound("Session not found or does not belong to user".to_string())
        })?;

        repo.expire(session.id).await?;

        tracing::info!(user_id = %user_id, session_id = %session_id, "Session terminated");

        Ok(())
    }

    /// 终止当前设备以外的所有活跃会话，返回终止数量
    ///
    /// 当前会话按 (user_id, ip, user_agent) 匹配最近的活跃会话。
    /// 指纹匹配不到时（例如 IP 变化），保留最近创建的活跃会话，
    /// 避免把调用者自己也登出。
    pub async fn terminate_all_other_sessions(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<u64, AppError> {
        let repo = SessionRepository::new(self.db.clone());

        let current = match repo.find_current(user_id, ip_address, user_agent).await? {
            Some(session) => Some(session),
            None => repo.find_most_recent_active(user_id).await?,
        };

        let Some(current) = current else {
            // 没有任何活跃会话，无事可做
            return Ok(0);
        };

        let terminated = repo.expire_all_except(user_id, current.id).await?;

        tracing::info!(
            user_id = %user_id,
            terminated,
            "Terminated all other sessions"
        );

        Ok(terminated)
    }
}
