//! 流式事件与线上消息
//!
//! worker 产出 StreamEvent；泵任务给每个事件打上 request_id 成为 RequestEvent；
//! 传输层再转成 JSON 线上消息 `{requestId, type, role?, content?, data?, done?, error?}`。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::copilot::{ArtifactUpdate, Plan};
use crate::memory::Role;

/// 单个请求的事件
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Plan(Plan),
    Chat { role: Role, content: String },
    Artifact(ArtifactUpdate),
    Error(String),
    Done,
}

impl StreamEvent {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Chat {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Done / Error 为终止事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }

    /// 线上 type 字段
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plan(_) => "plan",
            Self::Chat { .. } => "chat",
            Self::Artifact(_) => "artifact",
            Self::Error(_) => "error",
            Self::Done => "done",
        }
    }
}

/// 打上 request_id 的事件
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub request_id: String,
    /// 在该请求事件序列中的位置，从 0 开始
    pub seq: usize,
    pub event: StreamEvent,
}

impl RequestEvent {
    pub fn is_terminal(&self) -> bool {
        self.event.is_terminal()
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage::from_event(&self.request_id, &self.event)
    }
}

/// JSON 线上消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub request_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl WireMessage {
    fn bare(request_id: &str, kind: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            kind: kind.to_string(),
            role: None,
            content: None,
            data: None,
            done: false,
            error: None,
        }
    }

    pub fn from_event(request_id: &str, event: &StreamEvent) -> Self {
        let mut msg = Self::bare(request_id, event.kind());
        match event {
            StreamEvent::Plan(plan) => msg.data = serde_json::to_value(plan).ok(),
            StreamEvent::Chat { role, content } => {
                msg.role = Some(*role);
                msg.content = Some(content.clone());
            }
            StreamEvent::Artifact(update) => msg.data = serde_json::to_value(update).ok(),
            StreamEvent::Error(error) => {
                msg.error = Some(error.clone());
                msg.done = true;
            }
            StreamEvent::Done => msg.done = true,
        }
        msg
    }

    /// 订阅之外的错误回执（未知请求、非法指令等）
    pub fn error(request_id: &str, error: impl Into<String>) -> Self {
        let mut msg = Self::bare(request_id, "error");
        msg.error = Some(error.into());
        msg.done = true;
        msg
    }

    /// done:true 或带 error 即为该订阅的最后一条
    pub fn is_terminal(&self) -> bool {
        self.done || self.error.is_some()
    }
}
