//! HTTP / WebSocket 接入层
//!
//! POST /api/copilot/chat 提交请求（202）；GET / DELETE /api/copilot/requests/:id 查询与取消；
//! GET /ws 订阅事件流；GET /api/health 健康检查。

pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::config::ServerSection;
use crate::copilot::CopilotManager;

/// 路由共享状态
pub struct AppState {
    pub manager: Arc<CopilotManager>,
    pub server: ServerSection,
}

impl AppState {
    pub fn new(manager: Arc<CopilotManager>, server: ServerSection) -> Self {
        Self { manager, server }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/copilot/chat", post(http::submit_chat))
        .route(
            "/api/copilot/requests/:id",
            get(http::request_status).delete(http::cancel_request),
        )
        .route("/ws", get(ws::copilot_ws))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}
