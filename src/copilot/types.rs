//! 写作助手数据模型
//!
//! ChatRequest（请求入参）、Plan / PlannedTool（规划结果）、ToolExecutionResult（单个工具的执行记录）、
//! ArtifactUpdate（面向 UI 的工具进度）、RequestStatus（请求生命周期状态）。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::CopilotError;
use crate::memory::ChatMessage;

/// 一次编排的输入：对话历史 + 可选模型名 + 可选文档内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_content: Option<String>,
    /// 复用已有会话记忆；缺省或未知时分配新会话
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_document(mut self, content: impl Into<String>) -> Self {
        self.document_content = Some(content.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// 非空模型名
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }

    /// 非空文档内容
    pub fn document(&self) -> Option<&str> {
        self.document_content.as_deref().filter(|d| !d.is_empty())
    }

    /// 提交前校验：messages 不能为空
    pub fn validate(&self) -> Result<(), CopilotError> {
        if self.messages.is_empty() {
            return Err(CopilotError::InvalidInput("no messages provided".into()));
        }
        Ok(())
    }
}

/// 规划策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 直接回复，不调用工具
    RespondOnly,
    /// 按顺序执行工具后再合成回复
    UseTools,
}

/// 计划中的一次工具调用；按数组顺序串行执行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedTool {
    /// 工具名，如 edit_text
    pub name: String,
    /// 工具参数
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    /// 执行期间展示给用户的进度文案
    #[serde(default, rename = "message")]
    pub progress_message: String,
}

impl PlannedTool {
    pub fn new(name: impl Into<String>, parameters: HashMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
            progress_message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = message.into();
        self
    }
}

/// 规划结果：每个请求恰好产生一个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    pub strategy: Strategy,
    /// 选择该策略的简短理由
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tools: Vec<PlannedTool>,
    /// 初始回复，在工具执行前推送给用户
    #[serde(default, rename = "response_msg")]
    pub initial_reply: String,
}

/// 规划输出无法解析时的降级理由
pub const PARSE_FAILURE_REASONING: &str = "Failed to parse planning response";

impl Plan {
    pub fn respond_only(reasoning: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::RespondOnly,
            reasoning: reasoning.into(),
            tools: Vec::new(),
            initial_reply: reply.into(),
        }
    }

    pub fn use_tools(
        reasoning: impl Into<String>,
        tools: Vec<PlannedTool>,
        reply: impl Into<String>,
    ) -> Self {
        Self {
            strategy: Strategy::UseTools,
            reasoning: reasoning.into(),
            tools,
            initial_reply: reply.into(),
        }
    }

    /// 解析失败降级：原文作为初始回复
    pub fn degraded(raw: impl Into<String>) -> Self {
        Self::respond_only(PARSE_FAILURE_REASONING, raw)
    }

    /// 是否进入工具执行阶段
    pub fn uses_tools(&self) -> bool {
        self.strategy == Strategy::UseTools && !self.tools.is_empty()
    }
}

/// 单个工具的执行记录；创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub tool_name: String,
    pub parameters: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ToolExecutionResult {
    pub fn new(tool_name: impl Into<String>, parameters: HashMap<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// 工具进度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Starting,
    Completed,
    Error,
}

/// 面向 UI 的工具进度更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactUpdate {
    pub tool_name: String,
    pub status: ArtifactStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactUpdate {
    pub fn starting(tool: &PlannedTool) -> Self {
        Self {
            tool_name: tool.name.clone(),
            status: ArtifactStatus::Starting,
            message: tool.progress_message.clone(),
            result: None,
            error: None,
        }
    }

    /// 由执行记录生成 Completed 或 Error 更新
    pub fn finished(result: &ToolExecutionResult) -> Self {
        match &result.error {
            None => Self {
                tool_name: result.tool_name.clone(),
                status: ArtifactStatus::Completed,
                message: format!("Completed {}", result.tool_name),
                result: result.result.clone(),
                error: None,
            },
            Some(e) => Self {
                tool_name: result.tool_name.clone(),
                status: ArtifactStatus::Error,
                message: format!("Failed to execute {}", result.tool_name),
                result: None,
                error: Some(e.clone()),
            },
        }
    }
}

/// 请求生命周期状态：Processing -> Done | Error，单调
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Processing,
    Done,
    Error,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// 提交接口的即时响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub request_id: String,
    pub session_id: String,
    pub status: RequestStatus,
}

/// 状态查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    pub request_id: String,
    pub session_id: String,
    pub status: RequestStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// 已产生的事件数
    pub events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_wire_shape() {
        let req: ChatRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "documentContent": "# Title",
            "model": ""
        }))
        .unwrap();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.document(), Some("# Title"));
        assert_eq!(req.model(), None);
        assert!(req.session_id.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_messages_rejected() {
        let err = ChatRequest::default().validate().unwrap_err();
        assert!(matches!(err, CopilotError::InvalidInput(_)));
    }

    #[test]
    fn test_plan_wire_keys() {
        let plan: Plan = serde_json::from_value(json!({
            "strategy": "use_tools",
            "reasoning": "typo",
            "tools": [{
                "name": "edit_text",
                "parameters": {"original_text": "teh", "new_text": "the"},
                "message": "Editing: paragraph 2"
            }],
            "response_msg": "Let me fix that text"
        }))
        .unwrap();
        assert!(plan.uses_tools());
        assert_eq!(plan.tools[0].progress_message, "Editing: paragraph 2");
        assert_eq!(plan.initial_reply, "Let me fix that text");

        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["strategy"], "use_tools");
        assert!(value.get("response_msg").is_some());
    }

    #[test]
    fn test_artifact_from_result() {
        let ok = ToolExecutionResult::new("edit_text", HashMap::new()).with_result(json!({"x": 1}));
        let update = ArtifactUpdate::finished(&ok);
        assert_eq!(update.status, ArtifactStatus::Completed);
        assert_eq!(update.message, "Completed edit_text");

        let failed = ToolExecutionResult::new("edit_text", HashMap::new())
            .with_error("new_text parameter is required");
        let update = ArtifactUpdate::finished(&failed);
        assert_eq!(update.status, ArtifactStatus::Error);
        assert_eq!(update.error.as_deref(), Some("new_text parameter is required"));
    }

    #[test]
    fn test_status_is_monotonic_terminal() {
        assert!(!RequestStatus::Processing.is_terminal());
        assert!(RequestStatus::Done.is_terminal());
        assert_eq!(serde_json::to_value(RequestStatus::Processing).unwrap(), "processing");
    }
}
