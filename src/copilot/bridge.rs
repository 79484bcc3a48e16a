//! 流式桥接：把某个请求的事件流转发到一条实时连接
//!
//! 只依赖注册表的订阅接口；每条事件转成 WireMessage 交给 EventSink，
//! 转发到终止事件（done:true / error）为止，连接本身可继续用于其他订阅。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::copilot::{CopilotManager, EventSubscription, WireMessage};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("connection closed")]
    Closed,
}

/// 线上消息的接收端（WebSocket 写端、测试用通道等）
#[async_trait]
pub trait EventSink: Send {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError>;
}

#[async_trait]
impl EventSink for mpsc::Sender<WireMessage> {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| BridgeError::Closed)
    }
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<WireMessage> {
    async fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| BridgeError::Closed)
    }
}

/// 转发结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// 已转发终止事件
    Completed,
    /// 请求未知或已回收
    NotFound,
    /// 连接侧停止（断线或主动退订）
    Stopped,
}

/// 转发一个订阅直到终止事件；返回已转发的消息数
pub async fn forward<S: EventSink + ?Sized>(
    mut subscription: EventSubscription,
    sink: &mut S,
    stop: &CancellationToken,
) -> (ForwardOutcome, usize) {
    let mut sent = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => return (ForwardOutcome::Stopped, sent),
            next = subscription.next() => next,
        };
        let Some(event) = next else {
            // 日志被回收时没有终止事件可转发
            return (ForwardOutcome::Completed, sent);
        };
        let message = event.to_wire();
        let terminal = message.is_terminal();
        if sink.send(message).await.is_err() {
            return (ForwardOutcome::Stopped, sent);
        }
        sent += 1;
        if terminal {
            return (ForwardOutcome::Completed, sent);
        }
    }
}

/// 按 request_id 订阅并转发；未知请求回一条 error 消息
pub async fn forward_request<S: EventSink + ?Sized>(
    manager: &CopilotManager,
    request_id: &str,
    sink: &mut S,
    stop: &CancellationToken,
) -> (ForwardOutcome, usize) {
    match manager.subscribe(request_id).await {
        Some(subscription) => {
            let (outcome, sent) = forward(subscription, sink, stop).await;
            tracing::debug!(request_id = %request_id, ?outcome, sent, "forwarding finished");
            (outcome, sent)
        }
        None => {
            tracing::warn!(request_id = %request_id, "subscribe to unknown request");
            if let Err(e) = sink
                .send(WireMessage::error(request_id, "request not found"))
                .await
            {
                tracing::debug!(request_id = %request_id, error = %e, "not-found reply dropped");
            }
            (ForwardOutcome::NotFound, 0)
        }
    }
}
