//! PostgreSQL 连接池
//!
//! 账户余额的持久化存储。服务启动时建池并执行迁移，就绪探针通过 `health_check` 探测连通性。

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::Result;

/// 连接池句柄，clone 后共享同一个池
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 建立连接池
    ///
    /// `connect_timeout_seconds` 同时作为获取连接的超时，存储不可用时请求不会无限等待。
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("PostgreSQL 连接池已建立");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行 `SELECT 1` 探测连通性
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL 连接池已关闭");
    }

    /// 执行迁移
    ///
    /// `sqlx::migrate!` 在编译期按调用方 crate 的目录解析迁移文件，
    /// 所以由服务自己构造 `Migrator` 后传入。
    #[instrument(skip_all)]
    pub async fn run_migrations(&self, migrator: &Migrator) -> Result<()> {
        migrator.run(&self.pool).await?;
        info!(migrations = migrator.iter().count(), "数据库迁移完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要 PostgreSQL 数据库连接"]
    async fn test_connect_and_ping() {
        let db = Database::connect(&DatabaseConfig::default()).await.unwrap();
        db.health_check().await.unwrap();
        db.close().await;
    }
}
