//! 回复合成引擎
//!
//! respond_only 直接返回初始回复，不再调用补全服务；
//! 工具执行后汇总各工具成败，并按工具类型补充说明（分析请求带上文档原文、重写要求解释改动、图片提示词原样给出），
//! 再加上 user / assistant 对话历史做一次补全。

use std::sync::Arc;

use serde_json::Value;

use crate::copilot::{ChatRequest, Plan, Strategy, ToolExecutionResult};
use crate::core::CopilotError;
use crate::llm::LlmClient;
use crate::memory::{ChatMessage, Role};
use crate::tools::ToolKind;

const SYNTHESIS_HEADER: &str = "You are a writing assistant. The user made a request and tools were run on their behalf.\n\n\
Using the conversation and the document, write a natural, helpful reply that directly answers what the user asked for.\n\n";

const REWRITE_NOTE: &str = "Document rewriting has been completed. Explain what was changed and why.";

/// 回复合成引擎
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 生成最终回复；respond_only 原样返回 plan.initial_reply
    pub async fn generate_final_response(
        &self,
        req: &ChatRequest,
        plan: &Plan,
        results: &[ToolExecutionResult],
    ) -> Result<String, CopilotError> {
        if plan.strategy == Strategy::RespondOnly {
            return Ok(plan.initial_reply.clone());
        }

        let messages = build_messages(req, results);
        self.llm
            .complete(&messages, req.model())
            .await
            .map_err(|e| CopilotError::SynthesisFailure(e.to_string()))
    }
}

fn result_str<'a>(result: &'a ToolExecutionResult, key: &str) -> Option<&'a str> {
    result
        .result
        .as_ref()
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
}

/// 合成提示词：工具成败列表 + 各类工具的补充说明
pub fn synthesis_instruction(req: &ChatRequest, results: &[ToolExecutionResult]) -> String {
    let mut summary = String::from("Tools executed and results:\n");
    let mut analysis = Vec::new();
    let mut rewritten = false;
    let mut image_prompts = Vec::new();

    for result in results {
        match &result.error {
            Some(e) => summary.push_str(&format!("- {}: ERROR - {}\n", result.tool_name, e)),
            None => {
                summary.push_str(&format!("- {}: SUCCESS\n", result.tool_name));
                match ToolKind::from_name(&result.tool_name) {
                    Some(ToolKind::AnalyzeDocument) => analysis.push(result),
                    Some(ToolKind::RewriteDocument) => {
                        rewritten |=
                            result_str(result, "new_content").is_some_and(|c| !c.is_empty());
                    }
                    Some(ToolKind::GenerateImagePrompt) => {
                        if let Some(p) = result_str(result, "prompt").filter(|p| !p.is_empty()) {
                            image_prompts.push(p);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    let mut out = String::from(SYNTHESIS_HEADER);
    out.push_str(&summary);

    for result in analysis {
        out.push_str(&format!(
            "\n\nDOCUMENT ANALYSIS REQUEST:\n\
             - User asked: \"{}\"\n\
             - Focus area: {}\n\
             - Document content: {}\n\n\
             Read the actual document and give specific suggestions for improvement, \
             numbered, quoting their text where it helps. Keep it conversational and \
             answer the user's request directly.",
            result_str(result, "user_request").unwrap_or_default(),
            result_str(result, "focus_area").unwrap_or("overall"),
            req.document().unwrap_or_default()
        ));
    }

    if rewritten {
        out.push_str("\n\n");
        out.push_str(REWRITE_NOTE);
    }

    if !image_prompts.is_empty() {
        out.push_str("\n\nImage prompt has been generated: ");
        out.push_str(&image_prompts.join("; "));
    }

    out
}

/// 合成请求的消息序列：只保留 user / assistant 历史
pub fn build_messages(req: &ChatRequest, results: &[ToolExecutionResult]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(synthesis_instruction(req, results))];
    messages.extend(
        req.messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .cloned(),
    );
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copilot::PlannedTool;
    use crate::llm::{MockLlmClient, MockReply};
    use serde_json::json;
    use std::collections::HashMap;

    fn ok(tool: &str, value: Value) -> ToolExecutionResult {
        ToolExecutionResult::new(tool, HashMap::new()).with_result(value)
    }

    #[tokio::test]
    async fn test_respond_only_fast_path_skips_completion() {
        let llm = Arc::new(MockLlmClient::new());
        let synth = Synthesizer::new(llm.clone());
        let plan = Plan::respond_only("question", "Open with a surprising statistic.");
        let req = ChatRequest::new(vec![ChatMessage::user("hook?")]);
        let reply = synth.generate_final_response(&req, &plan, &[]).await.unwrap();
        assert_eq!(reply, "Open with a surprising statistic.");
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_instruction_summarises_each_tool() {
        let req =
            ChatRequest::new(vec![ChatMessage::user("improve")]).with_document("Once upon a time");
        let analysis = json!({
            "focus_area": "clarity",
            "user_request": "is it clear?",
            "analysis_done": true
        });
        let results = vec![
            ok("analyze_document", analysis),
            ToolExecutionResult::new("edit_text", HashMap::new())
                .with_error("new_text parameter is required"),
            ok("rewrite_document", json!({"new_content": "v2", "reason": ""})),
            ok("generate_image_prompt", json!({"prompt": "a castle"})),
            ok("generate_image_prompt", json!({"prompt": "a dragon"})),
        ];
        let text = synthesis_instruction(&req, &results);
        assert!(text.contains("- analyze_document: SUCCESS"));
        assert!(text.contains("- edit_text: ERROR - new_text parameter is required"));
        assert!(text.contains("- Focus area: clarity"));
        assert!(text.contains("- Document content: Once upon a time"));
        assert!(text.contains(REWRITE_NOTE));
        assert!(text.contains("Image prompt has been generated: a castle; a dragon"));
    }

    #[tokio::test]
    async fn test_history_keeps_user_and_assistant_only() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::Text(
            "Fixed the typo.".into(),
        )]));
        let synth = Synthesizer::new(llm.clone());
        let req = ChatRequest::new(vec![
            ChatMessage::system("house style"),
            ChatMessage::user("fix it"),
            ChatMessage::assistant("sure"),
        ]);
        let plan = Plan::use_tools("edit", vec![PlannedTool::new("edit_text", HashMap::new())], "");
        let reply = synth
            .generate_final_response(&req, &plan, &[ok("edit_text", json!({}))])
            .await
            .unwrap();
        assert_eq!(reply, "Fixed the typo.");

        let calls = llm.calls();
        let roles: Vec<Role> = calls[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_completion_failure_is_synthesis_failure() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::Fail("down".into())]));
        let synth = Synthesizer::new(llm);
        let plan = Plan::use_tools("edit", vec![], "");
        let req = ChatRequest::new(vec![ChatMessage::user("x")]);
        let err = synth
            .generate_final_response(&req, &plan, &[ok("edit_text", json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::SynthesisFailure(_)));
        assert!(!err.is_request_fatal());
    }
}
