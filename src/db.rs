//! PostgreSQL 访问层
//! 连接池构建、启动迁移、供探针使用的存活检查

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// 数据库层错误
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("could not open connection pool: {0}")]
    Pool(#[source] sqlx::Error),

    #[error("migration run failed: {0}")]
    Migrate(#[source] sqlx::migrate::MigrateError),
}

/// 按配置构建连接池
/// 取连接前先探活，避免把失效连接交给请求
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    tracing::debug!(
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Opening Postgres pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(config.url.expose_secret())
        .await
        .map_err(DbError::Pool)?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Postgres pool ready"
    );

    Ok(pool)
}

/// 启动时执行编译进二进制的迁移
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DbError::Migrate)?;

    tracing::info!("Database schema is up to date");
    Ok(())
}

/// 存活探测，/ready 就绪探针调用
pub async fn health_check(pool: &PgPool) -> HealthStatus {
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthStatus::Healthy,
        Err(e) => {
            tracing::warn!(error = %e, "Postgres liveness probe failed");
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

/// 上报连接池水位指标
pub fn record_pool_metrics(pool: &PgPool) {
    metrics::gauge!("db.pool.size").set(pool.size() as f64);
    metrics::gauge!("db.pool.idle").set(pool.num_idle() as f64);
}

/// 探活结果
#[derive(Debug, Clone)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_display() {
        let err = DbError::Pool(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().contains("connection pool"));
    }

    #[test]
    fn test_health_status_carries_reason() {
        let unhealthy = HealthStatus::Unhealthy("connection refused".to_string());

        match unhealthy {
            HealthStatus::Unhealthy(reason) => assert_eq!(reason, "connection refused"),
            HealthStatus::Healthy => panic!("expected unhealthy"),
        }
    }
}
