//! 补全服务抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：一次非流式补全，输入有序消息与可选模型名。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::ChatMessage;

/// 补全服务错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("no response choices returned")]
    EmptyResponse,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式补全；model 为 None 时使用客户端默认模型
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<String, LlmError>;
}
