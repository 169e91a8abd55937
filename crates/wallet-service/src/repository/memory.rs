//! 进程内账户仓储
//!
//! 基于 DashMap 的分片锁实现，CAS 在单个 entry 的锁内完成比较与写入。

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use super::traits::AccountRepositoryTrait;
use crate::error::Result;
use crate::models::Account;

/// 进程内账户仓储，clone 后共享同一份数据
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountRepository {
    accounts: Arc<DashMap<i64, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已存储的账户数量
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountRepositoryTrait for InMemoryAccountRepository {
    async fn get(&self, user_id: i64) -> Result<Option<Account>> {
        Ok(self.accounts.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, account: &Account) -> Result<()> {
        self.accounts.insert(account.user_id, account.clone());
        Ok(())
    }

    async fn compare_and_put(
        &self,
        account: &Account,
        expected_version: Option<i64>,
    ) -> Result<bool> {
        let written = match self.accounts.entry(account.user_id) {
            Entry::Occupied(mut entry) => {
                if expected_version == Some(entry.get().version) {
                    entry.insert(account.clone());
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                if expected_version.is_none() {
                    entry.insert(account.clone());
                    true
                } else {
                    false
                }
            }
        };

        Ok(written)
    }
}
