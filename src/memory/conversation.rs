//! 对话消息模型
//!
//! 前端提交的完整对话记录（role + content）；Planner / Synthesizer 直接按顺序转成 LLM 消息。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）；未知角色统一归入 Other，规划时按 user 处理
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// 单条消息，创建后不可变
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// 规划阶段的角色映射：system / assistant 原样保留，其余一律视为 user
    pub fn for_planning(&self) -> ChatMessage {
        match self.role {
            Role::System | Role::Assistant => self.clone(),
            Role::User | Role::Other => ChatMessage::user(self.content.clone()),
        }
    }
}

/// 最后一条 user 消息内容（用于日志与默认 user_request）
pub fn last_user_content(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}
