//! 钱包服务指标
//!
//! 业务代码通过下方的 `record_*` 函数打点；启用后由独立端口的 `/metrics` 以 Prometheus 格式导出。
//! 未安装 recorder 时打点为空操作。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 安装全局 Prometheus recorder 并在 `port` 上启动 `/metrics` 服务
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 登记指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "wallet_transactions_total",
        "Total number of wallet debit transactions"
    );
    metrics::describe_histogram!(
        "wallet_transaction_duration_seconds",
        "Wallet transaction duration in seconds"
    );
    metrics::describe_counter!(
        "wallet_balance_update_conflicts_total",
        "Total number of compare-and-swap conflicts on balance updates"
    );

    metrics::describe_counter!(
        "wallet_notifications_published_total",
        "Total number of notification events published"
    );
    metrics::describe_counter!(
        "wallet_notification_batches_total",
        "Total number of notification batches"
    );

    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last worker run"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 指标服务与业务 HTTP 服务分开监听
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录钱包交易，status 如 success / storage_error / publish_error
#[inline]
pub fn record_transaction(status: &str, duration_secs: f64) {
    metrics::counter!("wallet_transactions_total", "status" => status.to_string()).increment(1);

    metrics::histogram!(
        "wallet_transaction_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration_secs);
}

/// 记录余额 CAS 冲突
#[inline]
pub fn record_balance_conflict() {
    metrics::counter!("wallet_balance_update_conflicts_total").increment(1);
}

/// 记录通知批次结果
#[inline]
pub fn record_notification_batch(published: u64, status: &str) {
    metrics::counter!(
        "wallet_notifications_published_total",
        "status" => status.to_string()
    )
    .increment(published);

    metrics::counter!(
        "wallet_notification_batches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string()).set(now);
}
