//! 集成测试公共设施
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wallet_service::config::WalletConfig;
use wallet_service::models::Account;
use wallet_service::notification::NotificationGenerator;
use wallet_service::publisher::EventPublisher;
use wallet_service::repository::{AccountRepositoryTrait, InMemoryAccountRepository};
use wallet_service::service::{NotificationService, TransactionOptions, TransactionService};
use wallet_service::state::AppState;
use wallet_service::{Result, WalletError};
use wallet_shared::kafka::DeliveryReceipt;

/// 一条已发布的消息
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.payload).expect("payload 应为合法 JSON")
    }
}

/// 记录所有消息的事件通道，可配置为拒绝投递
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    reject: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<PublishedMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
    ) -> Result<DeliveryReceipt> {
        if self.reject {
            return Err(WalletError::Publish {
                topic: topic.to_string(),
                message: "broker unavailable".to_string(),
            });
        }

        let mut messages = self.messages.lock().unwrap();
        messages.push(PublishedMessage {
            topic: topic.to_string(),
            key: key.map(String::from),
            payload: payload.to_vec(),
        });
        Ok(DeliveryReceipt {
            partition: 0,
            offset: messages.len() as i64 - 1,
        })
    }
}

/// 所有操作都失败的存储
pub struct UnavailableStore;

#[async_trait]
impl AccountRepositoryTrait for UnavailableStore {
    async fn get(&self, _user_id: i64) -> Result<Option<Account>> {
        Err(WalletError::Storage("connection refused".to_string()))
    }

    async fn put(&self, _account: &Account) -> Result<()> {
        Err(WalletError::Storage("connection refused".to_string()))
    }

    async fn compare_and_put(&self, _account: &Account, _expected: Option<i64>) -> Result<bool> {
        Err(WalletError::Storage("connection refused".to_string()))
    }
}

/// 读取后暂停一段时间的存储，用来放大读写之间的竞争窗口
#[derive(Clone)]
pub struct SlowReadStore {
    inner: InMemoryAccountRepository,
    delay: Duration,
}

impl SlowReadStore {
    pub fn new(inner: InMemoryAccountRepository, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl AccountRepositoryTrait for SlowReadStore {
    async fn get(&self, user_id: i64) -> Result<Option<Account>> {
        let account = self.inner.get(user_id).await?;
        tokio::time::sleep(self.delay).await;
        Ok(account)
    }

    async fn put(&self, account: &Account) -> Result<()> {
        self.inner.put(account).await
    }

    async fn compare_and_put(&self, account: &Account, expected: Option<i64>) -> Result<bool> {
        self.inner.compare_and_put(account, expected).await
    }
}

pub const TRANSACTION_TOPIC: &str = "transaction-topic";
pub const NOTIFICATION_TOPIC: &str = "notification-topic";

pub fn transaction_service(
    repo: Arc<dyn AccountRepositoryTrait>,
    publisher: Arc<dyn EventPublisher>,
    options: TransactionOptions,
) -> Arc<TransactionService> {
    Arc::new(TransactionService::new(repo, publisher, options))
}

pub fn notification_service(publisher: Arc<dyn EventPublisher>) -> Arc<NotificationService> {
    Arc::new(NotificationService::new(
        publisher,
        NOTIFICATION_TOPIC,
        NotificationGenerator::default(),
    ))
}

/// 进程内存储 + 记录型事件通道组成的应用状态
pub fn in_memory_state() -> (AppState, InMemoryAccountRepository, Arc<RecordingPublisher>) {
    let repo = InMemoryAccountRepository::new();
    let publisher = Arc::new(RecordingPublisher::new());
    let transactions = transaction_service(
        Arc::new(repo.clone()),
        publisher.clone(),
        TransactionOptions::from(&WalletConfig::default()),
    );
    let notifications = notification_service(publisher.clone());
    (
        AppState::new(transactions, notifications),
        repo,
        publisher,
    )
}
