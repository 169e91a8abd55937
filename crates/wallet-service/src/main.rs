//! 钱包交易服务
//!
//! 加载配置、初始化可观测性与基础设施，启动 HTTP 服务和通知定时 Worker。

use std::sync::Arc;
use std::time::Duration;

use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use wallet_service::{
    config::{ServiceConfig, StorageBackend, UpdateStrategy},
    publisher::{EventPublisher, KafkaEventPublisher},
    repository::{AccountRepository, AccountRepositoryTrait, InMemoryAccountRepository},
    routes,
    service::{NotificationService, TransactionOptions, TransactionService},
    state::AppState,
    worker::NotificationWorker,
};
use wallet_shared::{database::Database, kafka::KafkaProducer, observability, retry::RetryPolicy};

static MIGRATOR: Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()?;
    let app_config = &config.app;
    let wallet = &config.wallet;

    let _guard = observability::init(&app_config.service_name, &app_config.observability).await?;

    info!("Starting wallet-service on {}", app_config.server_addr());

    // 账户存储
    let (repo, database): (Arc<dyn AccountRepositoryTrait>, Option<Database>) = match wallet.storage {
        StorageBackend::Postgres => {
            let db = Database::connect(&app_config.database).await?;
            db.run_migrations(&MIGRATOR).await?;
            let repo: Arc<dyn AccountRepositoryTrait> =
                Arc::new(AccountRepository::new(db.pool().clone()));
            (repo, Some(db))
        }
        StorageBackend::Memory => {
            if app_config.is_production() {
                warn!("生产环境使用进程内账户存储，重启后余额将丢失");
            }
            let repo: Arc<dyn AccountRepositoryTrait> = Arc::new(InMemoryAccountRepository::new());
            (repo, None)
        }
    };

    if wallet.update_strategy == UpdateStrategy::Overwrite {
        warn!("余额更新策略为 overwrite，并发扣款同一账户可能丢失更新");
    }

    // 事件通道
    let producer = KafkaProducer::new(&app_config.kafka)?;
    let publisher: Arc<dyn EventPublisher> = Arc::new(KafkaEventPublisher::new(
        producer.clone(),
        RetryPolicy::from(&wallet.publish_retry),
    ));

    let transactions = Arc::new(TransactionService::new(
        repo,
        publisher.clone(),
        TransactionOptions::from(wallet),
    ));
    let notifications = Arc::new(NotificationService::new(
        publisher,
        wallet.topics.notification.clone(),
        wallet.notification.generator(),
    ));

    info!(
        transaction_topic = %wallet.topics.transaction,
        notification_topic = %wallet.topics.notification,
        storage = ?wallet.storage,
        update_strategy = ?wallet.update_strategy,
        amount_policy = ?wallet.amount_policy,
        "钱包服务组件已初始化"
    );

    // 通知定时 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = wallet.notification.schedule_interval().map(|interval| {
        let worker = NotificationWorker::new(notifications.clone(), interval);
        tokio::spawn(async move { worker.run(shutdown_rx).await })
    });

    let mut state = AppState::new(transactions, notifications);
    if let Some(db) = database.clone() {
        state = state.with_database(db);
    }

    let listener = TcpListener::bind(app_config.server_addr()).await?;
    info!("Listening on {}", app_config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }

    producer.flush(Duration::from_secs(5));
    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
