//! HTTP 处理器
//!
//! 请求边界只做参数提取与转发，业务逻辑全部在服务层。

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::dto::{AccountDto, ApiResponse};
use crate::error::WalletError;
use crate::models::TransactionRequest;
use crate::state::AppState;

/// 发起扣款
///
/// POST /wallet/transaction
pub async fn initiate_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<String, WalletError> {
    state.transactions.process_transaction(&request).await
}

/// 触发一批通知
///
/// GET /wallet/notification
pub async fn initiate_notification(State(state): State<AppState>) -> Result<String, WalletError> {
    state.notifications.emit_notification_batch().await
}

/// 查询账户余额
///
/// GET /wallet/accounts/{user_id}
pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<AccountDto>>, WalletError> {
    let account = state.transactions.get_account(user_id).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

/// 存活探针
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "wallet-service"
    }))
}

/// 就绪探针：检查数据库连接是否可用
///
/// 进程内存储没有外部依赖，直接视为就绪。
pub async fn readiness_check(State(state): State<AppState>) -> Json<Value> {
    let db_ok = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "wallet-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }))
}
