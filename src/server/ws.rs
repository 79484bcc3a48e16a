//! WebSocket 订阅端点
//!
//! 客户端发送 `{action:"subscribe", requestId}` 后收到该请求的 JSON 事件，直到 done:true 或 error；
//! `{action:"cancel", requestId}` 取消请求。一条连接上可以先后或同时订阅多个请求。

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::copilot::{forward_request, WireMessage};
use crate::server::AppState;

/// 客户端指令
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCommand {
    pub action: String,
    #[serde(default)]
    pub request_id: String,
}

/// GET /ws
pub async fn copilot_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<WireMessage>(256);
    let connection = CancellationToken::new();
    let mut subscribed: HashSet<String> = HashSet::new();

    // 写端：所有订阅共用一个出站通道
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode wire message");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let command = match serde_json::from_str::<ClientCommand>(&text) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed client message");
                reply_error(&outbound_tx, "", format!("invalid message: {e}")).await;
                continue;
            }
        };

        match command.action.as_str() {
            "subscribe" => {
                subscribed.insert(command.request_id.clone());
                let manager = state.manager.clone();
                let mut sink = outbound_tx.clone();
                let stop = connection.child_token();
                tokio::spawn(async move {
                    forward_request(&manager, &command.request_id, &mut sink, &stop).await;
                });
            }
            "cancel" => {
                if !state.manager.cancel(&command.request_id).await {
                    reply_error(
                        &outbound_tx,
                        &command.request_id,
                        "request not found or already finished",
                    )
                    .await;
                }
            }
            other => {
                reply_error(
                    &outbound_tx,
                    &command.request_id,
                    format!("unknown action: {other}"),
                )
                .await;
            }
        }
    }

    connection.cancel();
    if state.server.cancel_on_disconnect {
        for request_id in &subscribed {
            state.manager.cancel(request_id).await;
        }
    }
    drop(outbound_tx);
    writer.abort();
    tracing::debug!(subscriptions = subscribed.len(), "copilot socket closed");
}

/// 回一条 error 消息；写端已退出时只记日志
async fn reply_error(
    outbound: &mpsc::Sender<WireMessage>,
    request_id: &str,
    error: impl Into<String>,
) {
    if let Err(e) = outbound.send(WireMessage::error(request_id, error)).await {
        tracing::debug!(request_id = %request_id, error = %e, "error reply dropped");
    }
}
