//! 交易处理服务
//!
//! 单次扣款的完整流程：
//! 1. 按金额策略校验请求
//! 2. 读取账户，不存在时按缺失账户策略处理（默认零余额新建）
//! 3. 计算 `balance - amount` 并整行写回
//! 4. 以用户 ID 为分区键，把原始请求发布到交易 topic
//!
//! 第 3 步完成后才会尝试第 4 步。两步之间没有原子性：发布失败时扣款已经生效，
//! 事件丢失，错误原样返回给调用方。

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use wallet_shared::observability::metrics;

use crate::config::{AmountPolicy, MissingAccountPolicy, UpdateStrategy, WalletConfig};
use crate::error::{Result, WalletError};
use crate::models::{Account, TransactionRequest};
use crate::publisher::{EventPublisher, encode_json};
use crate::repository::AccountRepositoryTrait;

/// 交易处理参数
#[derive(Debug, Clone)]
pub struct TransactionOptions {
    pub topic: String,
    pub update_strategy: UpdateStrategy,
    pub max_update_attempts: u32,
    pub amount_policy: AmountPolicy,
    pub missing_account_policy: MissingAccountPolicy,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self::from(&WalletConfig::default())
    }
}

impl From<&WalletConfig> for TransactionOptions {
    fn from(config: &WalletConfig) -> Self {
        Self {
            topic: config.topics.transaction.clone(),
            update_strategy: config.update_strategy,
            max_update_attempts: config.max_update_attempts,
            amount_policy: config.amount_policy,
            missing_account_policy: config.missing_account_policy,
        }
    }
}

/// 交易成功后返回给调用方的确认文本
pub fn confirmation_message(user_id: i64) -> String {
    format!("Transaction initiated for user: {user_id}")
}

/// 交易处理服务
///
/// 仓储与事件通道都以 trait object 注入，便于测试替换。
pub struct TransactionService {
    repo: Arc<dyn AccountRepositoryTrait>,
    publisher: Arc<dyn EventPublisher>,
    options: TransactionOptions,
}

impl TransactionService {
    pub fn new(
        repo: Arc<dyn AccountRepositoryTrait>,
        publisher: Arc<dyn EventPublisher>,
        options: TransactionOptions,
    ) -> Self {
        Self {
            repo,
            publisher,
            options,
        }
    }

    /// 处理一次扣款请求
    ///
    /// 同一请求重复提交会重复扣款，本服务不做幂等去重。
    #[instrument(skip(self, request), fields(user_id = request.user_id, amount = %request.amount))]
    pub async fn process_transaction(&self, request: &TransactionRequest) -> Result<String> {
        let start = Instant::now();

        let result = self.execute(request).await;

        let status = match &result {
            Ok(_) => "success",
            Err(WalletError::Publish { .. }) => "publish_error",
            Err(
                WalletError::InvalidAmount { .. }
                | WalletError::AccountNotFound(_)
                | WalletError::BalanceOutOfRange { .. },
            ) => "rejected",
            Err(WalletError::Conflict { .. }) => "conflict",
            Err(_) => "storage_error",
        };
        metrics::record_transaction(status, start.elapsed().as_secs_f64());

        result
    }

    /// 查询账户当前余额
    pub async fn get_account(&self, user_id: i64) -> Result<Account> {
        self.repo
            .get(user_id)
            .await?
            .ok_or(WalletError::AccountNotFound(user_id))
    }

    async fn execute(&self, request: &TransactionRequest) -> Result<String> {
        self.validate_amount(request)?;

        // 先序列化消息体，序列化失败时不会产生任何余额变更
        let payload = encode_json(request)?;

        let account = self.apply_debit(request).await?;

        let key = request.partition_key();
        let receipt = self
            .publisher
            .publish(&self.options.topic, Some(&key), &payload)
            .await
            .inspect_err(|e| {
                error!(
                    user_id = request.user_id,
                    new_balance = %account.balance,
                    topic = %self.options.topic,
                    error = %e,
                    "余额已更新但交易事件发布失败"
                );
            })?;

        info!(
            user_id = request.user_id,
            new_balance = %account.balance,
            version = account.version,
            partition = receipt.partition,
            offset = receipt.offset,
            "交易处理完成"
        );

        Ok(confirmation_message(request.user_id))
    }

    fn validate_amount(&self, request: &TransactionRequest) -> Result<()> {
        match self.options.amount_policy {
            AmountPolicy::DebitOnly if request.amount < Decimal::ZERO => {
                Err(WalletError::InvalidAmount {
                    amount: request.amount,
                })
            }
            AmountPolicy::Signed | AmountPolicy::DebitOnly => Ok(()),
        }
    }

    /// 账户不存在时的处理
    fn resolve_missing(&self, user_id: i64) -> Result<Account> {
        match self.options.missing_account_policy {
            MissingAccountPolicy::CreateWithZeroBalance => Ok(Account::zero(user_id)),
            MissingAccountPolicy::Reject => Err(WalletError::AccountNotFound(user_id)),
        }
    }

    async fn apply_debit(&self, request: &TransactionRequest) -> Result<Account> {
        match self.options.update_strategy {
            UpdateStrategy::CompareAndSwap => self.debit_with_cas(request).await,
            UpdateStrategy::Overwrite => self.debit_with_overwrite(request).await,
        }
    }

    /// 读取 -> 计算 -> 覆盖写入，并发扣同一账户时后写者覆盖先写者
    async fn debit_with_overwrite(&self, request: &TransactionRequest) -> Result<Account> {
        let current = match self.repo.get(request.user_id).await? {
            Some(account) => account,
            None => self.resolve_missing(request.user_id)?,
        };

        let updated = current.debited(request.amount)?;
        self.repo.put(&updated).await?;

        Ok(updated)
    }

    /// 基于 version 的乐观并发扣款，冲突时重读重试
    async fn debit_with_cas(&self, request: &TransactionRequest) -> Result<Account> {
        let max_attempts = self.options.max_update_attempts.max(1);

        for attempt in 1..=max_attempts {
            let existing = self.repo.get(request.user_id).await?;
            let expected_version = existing.as_ref().map(|a| a.version);
            let current = match existing {
                Some(account) => account,
                None => self.resolve_missing(request.user_id)?,
            };

            let updated = current.debited(request.amount)?;
            if self.repo.compare_and_put(&updated, expected_version).await? {
                return Ok(updated);
            }

            metrics::record_balance_conflict();
            warn!(
                user_id = request.user_id,
                attempt,
                max_attempts,
                "余额并发更新冲突，重新读取后重试"
            );
            tokio::task::yield_now().await;
        }

        Err(WalletError::Conflict {
            user_id: request.user_id,
            attempts: max_attempts,
        })
    }
}
