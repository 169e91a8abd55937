//! 钱包账户仓储
//!
//! 基于 PostgreSQL `wallets` 表的账户存取，version 列承担乐观并发控制。

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::traits::AccountRepositoryTrait;
use crate::error::Result;
use crate::models::Account;

/// PostgreSQL 账户仓储
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    #[instrument(skip(self))]
    async fn get(&self, user_id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT user_id, balance, version, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self, account), fields(user_id = account.user_id))]
    async fn put(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance, version, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET balance = EXCLUDED.balance,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account.user_id)
        .bind(account.balance)
        .bind(account.version)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, account), fields(user_id = account.user_id))]
    async fn compare_and_put(
        &self,
        account: &Account,
        expected_version: Option<i64>,
    ) -> Result<bool> {
        let result = match expected_version {
            // 新账户：主键冲突说明并发请求已先行创建
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO wallets (user_id, balance, version, updated_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(account.user_id)
                .bind(account.balance)
                .bind(account.version)
                .bind(account.updated_at)
                .execute(&self.pool)
                .await?
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE wallets
                    SET balance = $2, version = $3, updated_at = $4
                    WHERE user_id = $1 AND version = $5
                    "#,
                )
                .bind(account.user_id)
                .bind(account.balance)
                .bind(account.version)
                .bind(account.updated_at)
                .bind(version)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }
}
