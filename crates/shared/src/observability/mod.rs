//! 日志与指标
//!
//! `init` 在进程启动时调用一次：安装 tracing 订阅者，按配置启动 Prometheus 导出。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 持有指标服务任务，需要在 main 中保持存活
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
}

impl ObservabilityGuard {
    /// 未启用指标导出时使用
    pub fn empty() -> Self {
        Self {
            _metrics_handle: None,
        }
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("可观测性组件关闭");
    }
}

/// 先安装日志订阅者，再按 `metrics_enabled` 启动指标导出
///
/// ```ignore
/// let config = ServiceConfig::load()?;
/// let _guard = observability::init(&config.app.service_name, &config.app.observability).await?;
/// ```
pub async fn init(service_name: &str, config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    info!(
        service = %service_name,
        log_format = %config.log_format,
        metrics_enabled = config.metrics_enabled,
        metrics_port = config.metrics_port,
        "可观测性已初始化"
    );

    if !config.metrics_enabled {
        return Ok(ObservabilityGuard::empty());
    }

    let metrics_handle = metrics::init(service_name, config.metrics_port).await?;

    Ok(ObservabilityGuard {
        _metrics_handle: Some(metrics_handle),
    })
}
