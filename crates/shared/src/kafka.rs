//! Kafka 基础设施封装
//!
//! 将 rdkafka 的 FutureProducer 封装为按 topic/key 发送字节消息的生产者，
//! 统一错误映射与关闭前刷新。

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, info, warn};

use crate::config::KafkaConfig;
use crate::error::SharedError;

// ---------------------------------------------------------------------------
// Topic 常量
// ---------------------------------------------------------------------------

/// 默认 topic 名称，实际使用的 topic 以配置为准
pub mod topics {
    pub const TRANSACTION: &str = "transaction-topic";
    pub const NOTIFICATION: &str = "notification-topic";
}

/// 消息投递回执：broker 确认写入的分区与偏移量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub partition: i32,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 生产者
///
/// `FutureProducer` 内部是 Arc 包装的，clone 开销很小。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    pub fn new(config: &KafkaConfig) -> Result<Self, SharedError> {
        let producer: FutureProducer = client_config(config)
            .create()
            .map_err(|e| SharedError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            client_id = %config.client_id,
            compression = %config.compression_type,
            "Kafka 生产者已初始化"
        );
        Ok(Self {
            producer,
            send_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }

    /// 发送原始字节消息
    ///
    /// `key` 为 None 时由 broker 默认分区器决定分区。
    pub async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
    ) -> Result<DeliveryReceipt, SharedError> {
        let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        // rdkafka 0.39+ 返回 Delivery 结构体而非元组
        let delivery = self
            .producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| SharedError::Kafka(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok(DeliveryReceipt {
            partition: delivery.partition,
            offset: delivery.offset,
        })
    }

    /// 刷新本地队列中尚未发出的消息，进程退出前调用
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            warn!(error = %e, "Kafka 生产者刷新未完成");
        }
    }
}

/// 构造生产者客户端配置
fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", &config.client_id)
        .set("linger.ms", config.linger_ms.to_string())
        .set("batch.size", config.batch_size.to_string())
        .set("compression.type", &config.compression_type)
        .set("message.timeout.ms", config.message_timeout_ms.to_string());
    client
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
