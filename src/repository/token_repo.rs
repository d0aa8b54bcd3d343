//! Refresh token repository (刷新令牌数据访问)

use crate::{error::AppError, models::auth::RefreshToken};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

pub struct TokenRepository {
    db: PgPool,
}

impl TokenRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 存储刷新令牌记录
    pub async fn store(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, user_id, token_digest, expires_at, is_valid, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_digest)
        .bind(token.expires_at)
        .bind(token.is_valid)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .bind(token.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 根据摘要查找有效且未过期的刷新令牌
    pub async fn find_valid_by_digest(
        &self,
        token_digest: &str,
    ) -> Result<Option<RefreshToken>, AppError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT * FROM refresh_tokens
            WHERE token_digest = $1 AND is_valid AND expires_at > NOW()
            "#,
        )
        .bind(token_digest)
        .fetch_optional(&self.db)
        .await?;

        Ok(token)
    }

    /// 在一个事务内完成轮换：旧令牌失效 + 新令牌入库
    /// 两步写在同一事务里，不存在"旧令牌已失效但新令牌未入库"的中间状态
    pub async fn rotate(&self, old_id: Uuid, new_token: &RefreshToken) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE refresh_tokens SET is_valid = FALSE WHERE id = $1")
            .bind(old_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, user_id, token_digest, expires_at, is_valid, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(new_token.id)
        .bind(new_token.user_id)
        .bind(&new_token.token_digest)
        .bind(new_token.expires_at)
        .bind(new_token.is_valid)
        .bind(&new_token.ip_address)
        .bind(&new_token.user_agent)
        .bind(new_token.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// 根据摘要使所有匹配的有效令牌失效（幂等：第二次调用影响 0 行）
    pub async fn invalidate_by_digest(&self, token_digest: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_valid = FALSE WHERE token_digest = $1 AND is_valid",
        )
        .bind(token_digest)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// 清理过期的刷新令牌（维护任务）
    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()")
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// 哈希令牌用于存储（库里只存摘要，不存签名令牌本身）
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_deterministic() {
        let a = TokenRepository::hash_token("some.signed.token");
        let b = TokenRepository::hash_token("some.signed.token");
        assert_eq!(a, b);
        // SHA-256 hex digest
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_token_differs_per_input() {
        assert_ne!(
            TokenRepository::hash_token("token-a"),
            TokenRepository::hash_token("token-b")
        );
    }
}
