//! 通知批量发布服务
//!
//! 按生成器顺序逐条发布通知事件，不指定分区键。任一条发布失败即中止，
//! 已发出的消息不撤回、不重试，错误中带上已发送条数。

use std::sync::Arc;

use tracing::{error, info, instrument};
use wallet_shared::observability::metrics;

use crate::error::{Result, WalletError};
use crate::notification::NotificationGenerator;
use crate::publisher::{EventPublisher, publish_json};

/// 批次全部发出后的确认文本
pub const NOTIFICATION_CONFIRMATION: &str = "Notification initiated";

/// 通知批量发布服务
pub struct NotificationService {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    generator: NotificationGenerator,
}

impl NotificationService {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        topic: impl Into<String>,
        generator: NotificationGenerator,
    ) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            generator,
        }
    }

    /// 发布一整批通知，成功时返回固定确认文本
    pub async fn emit_notification_batch(&self) -> Result<String> {
        self.publish_batch().await?;
        Ok(NOTIFICATION_CONFIRMATION.to_string())
    }

    /// 发布一整批通知，返回发送条数
    #[instrument(skip(self), fields(topic = %self.topic, total = self.generator.len()))]
    pub async fn publish_batch(&self) -> Result<usize> {
        let total = self.generator.len();

        for (sent, event) in self.generator.events().enumerate() {
            if let Err(e) = publish_json(self.publisher.as_ref(), &self.topic, None, &event).await {
                metrics::record_notification_batch(sent as u64, "partial");
                error!(sent, total, error = %e, "通知批次发布中断");
                return Err(WalletError::PartialBatch {
                    sent,
                    total,
                    source: Box::new(e),
                });
            }
        }

        metrics::record_notification_batch(total as u64, "success");
        info!(total, "通知批次发布完成");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationEvent;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wallet_shared::kafka::DeliveryReceipt;

    /// 前 `fail_after` 条成功，之后全部失败
    struct FlakyPublisher {
        fail_after: usize,
        sent: Mutex<Vec<(Option<String>, NotificationEvent)>>,
    }

    impl FlakyPublisher {
        fn new(fail_after: usize) -> Self {
            Self {
                fail_after,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventPublisher for FlakyPublisher {
        async fn publish(
            &self,
            topic: &str,
            key: Option<&str>,
            payload: &[u8],
        ) -> Result<DeliveryReceipt> {
            let mut sent = self.sent.lock().unwrap();
            if sent.len() >= self.fail_after {
                return Err(WalletError::Publish {
                    topic: topic.to_string(),
                    message: "超时".to_string(),
                });
            }
            let event: NotificationEvent = serde_json::from_slice(payload).unwrap();
            sent.push((key.map(String::from), event));
            Ok(DeliveryReceipt {
                partition: 0,
                offset: sent.len() as i64 - 1,
            })
        }
    }

    #[tokio::test]
    async fn test_emit_full_batch() {
        let publisher = Arc::new(FlakyPublisher::new(usize::MAX));
        let service = NotificationService::new(
            publisher.clone(),
            "notification-topic",
            NotificationGenerator::default(),
        );

        let message = service.emit_notification_batch().await.unwrap();
        assert_eq!(message, "Notification initiated");

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 100);
        assert!(sent.iter().all(|(key, _)| key.is_none()));
        assert_eq!(sent[42].1.name, "first_42");
        assert_eq!(sent[42].1.message, "msg_42");
    }

    #[tokio::test]
    async fn test_partial_failure_stops_and_reports_sent() {
        let publisher = Arc::new(FlakyPublisher::new(37));
        let service = NotificationService::new(
            publisher.clone(),
            "notification-topic",
            NotificationGenerator::default(),
        );

        let err = service.emit_notification_batch().await.unwrap_err();
        match err {
            WalletError::PartialBatch { sent, total, source } => {
                assert_eq!(sent, 37);
                assert_eq!(total, 100);
                assert!(matches!(*source, WalletError::Publish { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // 中止后不再继续发送
        assert_eq!(publisher.sent.lock().unwrap().len(), 37);
    }

    #[tokio::test]
    async fn test_first_publish_fails() {
        let service = NotificationService::new(
            Arc::new(FlakyPublisher::new(0)),
            "notification-topic",
            NotificationGenerator::new(5, "a_", "b_"),
        );

        let err = service.publish_batch().await.unwrap_err();
        assert!(matches!(err, WalletError::PartialBatch { sent: 0, total: 5, .. }));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let service = NotificationService::new(
            Arc::new(FlakyPublisher::new(0)),
            "notification-topic",
            NotificationGenerator::new(0, "a_", "b_"),
        );

        assert_eq!(service.publish_batch().await.unwrap(), 0);
    }
}
