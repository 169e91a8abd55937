//! 重试策略与执行器
//!
//! 对 broker 抖动这类瞬时故障做有限次数的指数退避重试。
//! 哪些错误值得重试由调用方通过 `is_retryable` 判定。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// 退避重试策略
///
/// 第 n 次重试前等待 `initial_delay * multiplier^n`，不超过 `max_delay`。
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 首次执行之外的最大重试次数
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    /// 最多重试 2 次，100ms 起步，上限 1s
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试（从 0 计）之前的等待时间
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let delay_ms = self.initial_delay.as_millis() as f64 * factor;
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// 已重试 `retries` 次后是否还能再试
    pub fn allows(&self, retries: u32) -> bool {
        retries < self.max_retries
    }
}

/// 按策略执行异步操作
///
/// `is_retryable` 返回 false 的错误立即返回；重试次数用尽后返回最后一次的错误。
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retries: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    info!(operation = operation_name, retries, "重试后成功");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable(&err) {
            warn!(operation = operation_name, error = %err, "不可重试的错误");
            return Err(err);
        }

        if !policy.allows(retries) {
            warn!(
                operation = operation_name,
                retries,
                error = %err,
                "重试次数已用尽"
            );
            return Err(err);
        }

        let delay = policy.backoff(retries);
        warn!(
            operation = operation_name,
            retry = retries + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "操作失败，退避后重试"
        );
        tokio::time::sleep(delay).await;
        retries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SharedError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn broker_down() -> SharedError {
        SharedError::Kafka("Local: Message timed out".to_string())
    }

    fn malformed_payload() -> SharedError {
        SharedError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err())
    }

    #[test]
    fn test_default_policy_matches_publish_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(1000),
            multiplier: 3.0,
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(900));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(30), Duration::from_millis(1000));
    }

    #[test]
    fn test_allows() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));

        let once = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert!(!once.allows(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_recovers() {
        let calls = AtomicU32::new(0);

        let result = retry_with_policy(
            &RetryPolicy::default(),
            "kafka_publish",
            SharedError::is_retryable,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err(broker_down()) } else { Ok(n) } }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = retry_with_policy(
            &RetryPolicy::default(),
            "kafka_publish",
            SharedError::is_retryable,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(broker_down()) }
            },
        )
        .await;

        assert!(matches!(result, Err(SharedError::Kafka(_))));
        // 首次 + 2 次重试
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms 的退避
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_policy(
            &RetryPolicy::default(),
            "kafka_publish",
            SharedError::is_retryable,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(malformed_payload()) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_policy(
            &RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
            "kafka_publish",
            |_: &SharedError| true,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(broker_down()) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
