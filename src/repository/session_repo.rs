//! Session repository (会话数据访问)
//! 会话只做软过期（expires_at = NOW()），从不硬删除

use crate::{error::AppError, models::session::Session};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct SessionRepository {
    db: PgPool,
}

impl SessionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 创建会话
    pub async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(session)
    }

    /// 列出用户的活跃会话，按创建时间倒序
    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }

    /// 查找属于指定用户的会话
    pub async fn find_owned(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    /// 根据设备指纹（IP + User-Agent）查找最近的活跃会话
    pub async fn find_current(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1
                AND ($2::text IS NULL OR ip_address = $2)
                AND ($3::text IS NULL OR user_agent = $3)
                AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    /// 用户最近创建的活跃会话
    pub async fn find_most_recent_active(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    /// 终止会话：把过期时间设置为当前时间（软过期）
    pub async fn expire(&self, session_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE sessions SET expires_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 终止用户除指定会话外的所有活跃会话，返回终止数量
    pub async fn expire_all_except(
        &self,
        user_id: Uuid,
        keep_session_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET expires_at = NOW()
            WHERE user_id = $1 AND id <> $2 AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(keep_session_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
