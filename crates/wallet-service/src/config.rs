//! 钱包服务配置
//!
//! 在共享 [`AppConfig`] 之外增加 `[wallet]` 配置段：topic 名称、
//! 存储后端、余额更新策略、金额策略、通知批次与发布重试参数。

use std::time::Duration;

use serde::Deserialize;
use wallet_shared::config::{AppConfig, load_layered, service_port_from_env};
use wallet_shared::error::SharedError;
use wallet_shared::kafka::topics;
use wallet_shared::retry::RetryPolicy;

use crate::notification::NotificationGenerator;

pub const SERVICE_NAME: &str = "wallet-service";

/// 服务完整配置：共享配置 + 钱包配置段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub app: AppConfig,
    pub wallet: WalletConfig,
}

impl ServiceConfig {
    /// 按 config/default.toml -> 环境 -> 服务 -> WALLET_ 环境变量 的顺序加载
    pub fn load() -> Result<Self, SharedError> {
        let mut config: Self = load_layered(SERVICE_NAME)?;
        if let Some(port) = service_port_from_env(SERVICE_NAME) {
            config.app.server.port = port;
        }
        Ok(config)
    }
}

/// 账户存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// 进程内存储，仅用于本地开发与演示
    Memory,
}

/// 余额写入策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// 基于 version 的比较并交换，冲突时重读重试
    #[default]
    CompareAndSwap,
    /// 直接覆盖写入，后写者胜出；并发扣款同一账户时可能丢失更新
    Overwrite,
}

/// 扣款金额校验策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// 不校验符号，负数金额即入账
    #[default]
    Signed,
    /// 只允许非负金额
    DebitOnly,
}

/// 账户不存在时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingAccountPolicy {
    /// 以零余额新建账户后再扣款
    #[default]
    CreateWithZeroBalance,
    /// 直接拒绝
    Reject,
}

/// 事件 topic 名称
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub transaction: String,
    pub notification: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            transaction: topics::TRANSACTION.to_string(),
            notification: topics::NOTIFICATION.to_string(),
        }
    }
}

/// 通知批次配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub count: usize,
    pub name_prefix: String,
    pub message_prefix: String,
    /// 定时发送间隔（秒），0 表示只通过接口手动触发
    pub schedule_interval_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            count: 100,
            name_prefix: "first_".to_string(),
            message_prefix: "msg_".to_string(),
            schedule_interval_secs: 0,
        }
    }
}

impl NotificationConfig {
    pub fn generator(&self) -> NotificationGenerator {
        NotificationGenerator::new(self.count, &self.name_prefix, &self.message_prefix)
    }

    pub fn schedule_interval(&self) -> Option<Duration> {
        (self.schedule_interval_secs > 0).then(|| Duration::from_secs(self.schedule_interval_secs))
    }
}

/// 事件发布重试配置，作用于 Kafka 事件通道内部
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PublishRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
        }
    }
}

impl From<&PublishRetryConfig> for RetryPolicy {
    fn from(config: &PublishRetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: 2.0,
        }
    }
}

/// `[wallet]` 配置段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub storage: StorageBackend,
    pub topics: TopicConfig,
    pub update_strategy: UpdateStrategy,
    pub max_update_attempts: u32,
    pub amount_policy: AmountPolicy,
    pub missing_account_policy: MissingAccountPolicy,
    pub notification: NotificationConfig,
    pub publish_retry: PublishRetryConfig,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            topics: TopicConfig::default(),
            update_strategy: UpdateStrategy::default(),
            max_update_attempts: 16,
            amount_policy: AmountPolicy::default(),
            missing_account_policy: MissingAccountPolicy::default(),
            notification: NotificationConfig::default(),
            publish_retry: PublishRetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wallet_config() {
        let config = WalletConfig::default();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.topics.transaction, "transaction-topic");
        assert_eq!(config.topics.notification, "notification-topic");
        assert_eq!(config.update_strategy, UpdateStrategy::CompareAndSwap);
        assert_eq!(config.amount_policy, AmountPolicy::Signed);
        assert_eq!(
            config.missing_account_policy,
            MissingAccountPolicy::CreateWithZeroBalance
        );
        assert_eq!(config.notification.count, 100);
        assert!(config.notification.schedule_interval().is_none());
    }

    #[test]
    fn test_deserialize_wallet_section() {
        let config: WalletConfig = serde_json::from_value(serde_json::json!({
            "storage": "memory",
            "topics": { "transaction": "wallet.tx" },
            "update_strategy": "overwrite",
            "amount_policy": "debit_only",
            "notification": { "count": 5, "schedule_interval_secs": 60 }
        }))
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.topics.transaction, "wallet.tx");
        // 未配置的字段保持默认值
        assert_eq!(config.topics.notification, "notification-topic");
        assert_eq!(config.update_strategy, UpdateStrategy::Overwrite);
        assert_eq!(config.amount_policy, AmountPolicy::DebitOnly);
        assert_eq!(config.notification.count, 5);
        assert_eq!(config.notification.name_prefix, "first_");
        assert_eq!(
            config.notification.schedule_interval(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(config.max_update_attempts, 16);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from(&PublishRetryConfig::default());
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.initial_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_service_config_flattens_app_config() {
        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "service_name": "wallet-service",
            "server": { "port": 9000 },
            "wallet": { "storage": "memory" }
        }))
        .unwrap();

        assert_eq!(config.app.service_name, "wallet-service");
        assert_eq!(config.app.server.port, 9000);
        assert_eq!(config.app.kafka.brokers, "localhost:9092");
        assert_eq!(config.wallet.storage, StorageBackend::Memory);
    }
}
