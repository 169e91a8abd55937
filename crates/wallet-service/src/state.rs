//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use wallet_shared::database::Database;

use crate::service::{NotificationService, TransactionService};

/// Axum 应用共享状态
///
/// 服务实例通过 Arc 在 handler 间共享；`database` 仅在 PostgreSQL 存储下存在，用于就绪探针。
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub notifications: Arc<NotificationService>,
    pub database: Option<Database>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        transactions: Arc<TransactionService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            transactions,
            notifications,
            database: None,
        }
    }

    /// 附加数据库连接，供就绪探针检查
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}
