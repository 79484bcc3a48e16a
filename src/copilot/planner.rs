//! 规划引擎：一次补全决定直接回复还是调用工具
//!
//! 规划提示词包含两种策略说明、工具目录（含参数 schema）、Plan 的输出格式与当前文档；
//! 其后按顺序附上对话历史。parse_plan 从文本中提取 JSON，解析失败降级为直接回复，不报错。

use std::sync::Arc;

use crate::copilot::{ChatRequest, Plan};
use crate::core::CopilotError;
use crate::llm::LlmClient;
use crate::memory::ChatMessage;
use crate::tools::{plan_schema_json, ToolCatalog};

const PLANNING_HEADER: &str = r#"You are the planning step of a writing assistant. Read the conversation and the current document, then decide how to respond.

Reply with a single JSON object and nothing else:
{
  "strategy": "respond_only" | "use_tools",
  "reasoning": "one sentence on why",
  "tools": [
    {"name": "tool_name", "parameters": {"param": "value"}, "message": "progress text shown while the tool runs"}
  ],
  "response_msg": "short first reply to the user"
}

Strategies:
- "respond_only": questions, advice, explanations, small suggestions. Leave "tools" empty.
- "use_tools": the user wants the document edited or rewritten, an image prompt, or a review of the document.

Choosing tools:
- edit_text for typos, grammar and rewording a specific sentence or paragraph. original_text must match the document exactly.
- rewrite_document only when most of the document changes.
- analyze_document to suggest improvements without changing anything. Always pass user_request.
- Tools run in the listed order.

response_msg is one or two conversational sentences that acknowledge the request, e.g. "Let me fix that text". The detailed result is shown after the tools finish.
"#;

/// 规划引擎
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<ToolCatalog>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<ToolCatalog>) -> Self {
        Self { llm, catalog }
    }

    /// 规划提示词（嵌入当前文档）
    pub fn planning_instruction(&self, document: &str) -> String {
        format!(
            "{}\n{}\nPlan JSON schema:\n{}\n\nCurrent document:\n{}",
            PLANNING_HEADER,
            self.catalog.prompt_section(),
            plan_schema_json(),
            document
        )
    }

    /// 规划请求的完整消息序列
    pub fn build_messages(&self, req: &ChatRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        messages.push(ChatMessage::system(
            self.planning_instruction(req.document().unwrap_or_default()),
        ));
        messages.extend(req.messages.iter().map(ChatMessage::for_planning));
        messages
    }

    /// 补全调用失败是 PlanningFailure；输出无法解析只会降级
    pub async fn create_plan(&self, req: &ChatRequest) -> Result<Plan, CopilotError> {
        let messages = self.build_messages(req);
        let raw = self
            .llm
            .complete(&messages, req.model())
            .await
            .map_err(|e| CopilotError::PlanningFailure(e.to_string()))?;
        let plan = parse_plan(&raw);
        tracing::debug!(
            strategy = ?plan.strategy,
            tools = plan.tools.len(),
            raw_len = raw.len(),
            "plan parsed"
        );
        Ok(plan)
    }
}

/// 从补全文本中提取 JSON 对象（```json 代码块或首个 '{' 到最后一个 '}'）
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// 解析规划输出；任何失败都降级为 respond_only，初始回复为原文
pub fn parse_plan(raw: &str) -> Plan {
    let trimmed = raw.trim();
    match extract_json(trimmed).map(serde_json::from_str::<Plan>) {
        Some(Ok(plan)) => plan,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "failed to parse planning response as JSON");
            Plan::degraded(raw)
        }
        None => {
            tracing::warn!("planning response contains no JSON object");
            Plan::degraded(raw)
        }
    }
}
