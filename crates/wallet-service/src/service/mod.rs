//! 服务层
//!
//! - `TransactionService`: 读余额 -> 计算 -> 持久化 -> 发布交易事件
//! - `NotificationService`: 生成并发布一批通知事件

mod notification_service;
mod transaction_service;

pub use notification_service::{NOTIFICATION_CONFIRMATION, NotificationService};
pub use transaction_service::{TransactionOptions, TransactionService, confirmation_message};
