//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Account;

/// 账户仓储接口：以用户 ID 为键的余额存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// 按用户 ID 读取账户，不存在时返回 None
    async fn get(&self, user_id: i64) -> Result<Option<Account>>;

    /// 整行覆盖写入（不存在则插入），不做版本校验
    async fn put(&self, account: &Account) -> Result<()>;

    /// 比较并交换写入
    ///
    /// - `expected_version = None`：仅当账户尚不存在时插入
    /// - `expected_version = Some(v)`：仅当当前存储的 version 等于 v 时覆盖
    ///
    /// 写入成功返回 true；条件不满足（被其他请求抢先修改）返回 false。
    async fn compare_and_put(&self, account: &Account, expected_version: Option<i64>)
    -> Result<bool>;
}
