//! 钱包服务错误类型
//!
//! 在共享库 SharedError 基础上定义本服务特有的错误变体，
//! 并实现 axum 的 `IntoResponse`，让所有失败都以统一 JSON 结构返回给调用方。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use wallet_shared::error::SharedError;

use crate::dto::ApiResponse;

/// 钱包服务错误
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// 账户读取或写入失败；此时不会发布任何事件
    #[error("账户存储失败: {0}")]
    Storage(String),

    /// 余额已持久化，但事件未能投递到 broker
    #[error("事件发布失败: topic={topic}, {message}")]
    Publish { topic: String, message: String },

    /// 通知批次中途失败，已发送的消息不会回滚
    #[error("通知批次中断: 已发送 {sent}/{total}, 原因: {source}")]
    PartialBatch {
        sent: usize,
        total: usize,
        #[source]
        source: Box<WalletError>,
    },

    /// 并发更新同一账户时 CAS 重试次数耗尽
    #[error("余额更新冲突: user_id={user_id}, 已尝试 {attempts} 次")]
    Conflict { user_id: i64, attempts: u32 },

    /// 仅扣款策略下拒绝负数金额
    #[error("无效的金额: {amount}")]
    InvalidAmount { amount: Decimal },

    /// 扣款后的余额超出可表示范围，账户保持不变
    #[error("余额超出可表示范围: user_id={user_id}")]
    BalanceOutOfRange { user_id: i64 },

    #[error("账户不存在: user_id={0}")]
    AccountNotFound(i64),

    #[error(transparent)]
    Shared(#[from] SharedError),
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, WalletError>;

impl From<sqlx::Error> for WalletError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl WalletError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
            Self::BalanceOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Storage(_)
            | Self::Publish { .. }
            | Self::PartialBatch { .. }
            | Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "STORAGE_FAILURE",
            Self::Publish { .. } => "PUBLISH_FAILURE",
            Self::PartialBatch { .. } => "PARTIAL_BATCH_FAILURE",
            Self::Conflict { .. } => "BALANCE_CONFLICT",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::BalanceOutOfRange { .. } => "BALANCE_OUT_OF_RANGE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Shared(e) => e.code(),
        }
    }
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 基础设施错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Storage(e) => {
                tracing::error!(error = %e, "账户存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Shared(e) => {
                tracing::error!(error = %e, "基础设施错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()>::error(self.error_code(), message);
        (status, axum::Json(body)).into_response()
    }
}
