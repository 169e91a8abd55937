//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{get, post},
};
use wallet_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 钱包业务路由
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/transaction", post(handlers::initiate_transaction))
        .route("/notification", get(handlers::initiate_notification))
        .route("/accounts/{user_id}", get(handlers::get_account))
}

/// 构建完整应用：业务路由 + 探针 + 可观测性中间件
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/wallet", wallet_routes())
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
