//! 钱包交易服务
//!
//! 接收扣款请求，更新账户余额后向 Kafka 发布以用户 ID 为键的交易事件；
//! 另提供通知事件的批量发布（HTTP 手动触发或定时触发）。

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notification;
pub mod publisher;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod worker;

pub use error::{Result, WalletError};
pub use models::{Account, NotificationEvent, TransactionRequest};
