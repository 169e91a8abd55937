//! 事件通道
//!
//! `EventPublisher` 抽象按 topic 投递消息的能力，核心流程只依赖该 trait；
//! `KafkaEventPublisher` 是基于共享 KafkaProducer 的实现，瞬时故障在通道内部按退避策略重试。

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;
use wallet_shared::error::SharedError;
use wallet_shared::kafka::{DeliveryReceipt, KafkaProducer};
use wallet_shared::retry::{RetryPolicy, retry_with_policy};

use crate::error::{Result, WalletError};

/// 事件发布接口
///
/// 返回即表示 broker 已确认（ack）或明确失败。`key` 为 None 时使用 broker 默认分区。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
    ) -> Result<DeliveryReceipt>;
}

/// 将消息体序列化为 JSON 字节
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| WalletError::Shared(SharedError::from(e)))
}

/// 序列化后发布
pub async fn publish_json<T: Serialize + Sync>(
    publisher: &dyn EventPublisher,
    topic: &str,
    key: Option<&str>,
    value: &T,
) -> Result<DeliveryReceipt> {
    let payload = encode_json(value)?;
    publisher.publish(topic, key, &payload).await
}

/// 基于 Kafka 的事件通道
#[derive(Clone)]
pub struct KafkaEventPublisher {
    producer: KafkaProducer,
    retry_policy: RetryPolicy,
}

impl KafkaEventPublisher {
    pub fn new(producer: KafkaProducer, retry_policy: RetryPolicy) -> Self {
        Self {
            producer,
            retry_policy,
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
    ) -> Result<DeliveryReceipt> {
        let producer = &self.producer;
        retry_with_policy(
            &self.retry_policy,
            "kafka_publish",
            SharedError::is_retryable,
            move || producer.send(topic, key, payload),
        )
        .await
        .map_err(|e| {
            warn!(topic, key, error = %e, "Kafka 消息投递失败");
            WalletError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            }
        })
    }
}
