//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本依次返回预设回复（文本 / 失败 / 永不返回）；脚本耗尽后回显最后一条 user 消息。
//! 记录每次调用收到的消息与模型名，便于断言调用次数与 prompt 内容。

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{last_user_content, ChatMessage};

/// 单次脚本化回复
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
    /// 等待指定时长后返回文本
    Delayed(Duration, String),
    /// 永不返回（用于超时 / 取消测试）
    Hang,
}

/// 一次调用的记录
#[derive(Debug, Clone)]
pub struct MockCall {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
}

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let client = Self::new();
        lock(&client.script).extend(replies);
        client
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<String, LlmError> {
        lock(&self.calls).push(MockCall {
            messages: messages.to_vec(),
            model: model.map(String::from),
        });

        let next = lock(&self.script).pop_front();
        match next {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(reason)) => Err(LlmError::Request(reason)),
            Some(MockReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                Err(LlmError::EmptyResponse)
            }
            None => Ok(format!(
                "Echo from Mock: {}",
                last_user_content(messages).unwrap_or("(no input)")
            )),
        }
    }
}
