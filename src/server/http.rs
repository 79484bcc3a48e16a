//! 提交 / 查询 / 取消接口

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::copilot::{ChatRequest, RequestInfo, SubmitResponse};
use crate::core::CopilotError;
use crate::server::AppState;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// POST /api/copilot/chat：立即返回 202 {requestId, sessionId, status:"processing"}
pub async fn submit_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    match state.manager.submit(req).await {
        Ok(resp) => Ok((StatusCode::ACCEPTED, Json(resp))),
        Err(e @ CopilotError::InvalidInput(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// GET /api/copilot/requests/:id
pub async fn request_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RequestInfo>, ApiError> {
    state
        .manager
        .status(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "request not found"))
}

/// DELETE /api/copilot/requests/:id：仅对处理中的请求生效
pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.manager.cancel(&id).await {
        return Ok(Json(json!({ "requestId": id, "cancelled": true })));
    }
    match state.manager.status(&id).await {
        Some(info) => Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "request already finished", "status": info.status })),
        )),
        None => Err(api_error(StatusCode::NOT_FOUND, "request not found")),
    }
}
