//! 钱包领域模型
//!
//! 账户余额记录、扣款请求与通知事件。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// 用户钱包账户
///
/// 余额没有下限约束，允许透支。`version` 每次成功写入递增，
/// 用于余额更新的比较并交换（CAS）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: i64,
    pub balance: Decimal,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// 零余额账户，version 为 0 表示尚未持久化
    pub fn zero(user_id: i64) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// 扣减指定金额后的账户，version 前进一位
    ///
    /// 负数金额等价于入账，是否允许由调用方的金额策略决定。
    /// 结果超出 `Decimal` 可表示范围（约 ±7.9e28）时返回 `BalanceOutOfRange`。
    pub fn debited(&self, amount: Decimal) -> Result<Self> {
        let balance = self
            .balance
            .checked_sub(amount)
            .ok_or(WalletError::BalanceOutOfRange {
                user_id: self.user_id,
            })?;

        Ok(Self {
            user_id: self.user_id,
            balance,
            version: self.version + 1,
            updated_at: Utc::now(),
        })
    }
}

/// 扣款请求
///
/// 线上格式为 camelCase JSON，`amount` 以 JSON 数字输出：
/// `{"userId": 42, "amount": 10.0}`。该结构同时作为交易事件的消息体。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub user_id: i64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
}

impl TransactionRequest {
    pub fn new(user_id: i64, amount: Decimal) -> Self {
        Self { user_id, amount }
    }

    /// 消息分区键：用户 ID 的十进制字符串，保证同一用户的事件落在同一分区
    pub fn partition_key(&self) -> String {
        self.user_id.to_string()
    }
}

/// 通知事件，仅作为消息存在，不落库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub name: String,
    pub message: String,
}
