//! generate_image_prompt 工具：由补全服务把文章内容浓缩成一条插图提示词

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::ToolError;
use crate::llm::LlmClient;
use crate::memory::ChatMessage;
use crate::tools::params::{required_str, string_property};
use crate::tools::{Tool, ToolContext, ToolKind};

const IMAGE_PROMPT_SYSTEM: &str = "You are an image prompt generator. Given the content of an article, \
craft a vivid, concise prompt that an image generation model can use to create a representative \
illustration. Focus on key subjects, environment, style, mood, and colors. Respond with the prompt only.";

pub struct ImagePromptTool {
    llm: Arc<dyn LlmClient>,
}

impl ImagePromptTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for ImagePromptTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GenerateImagePrompt
    }

    fn description(&self) -> &str {
        "Create an illustration prompt from document content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": string_property("Document content to illustrate")
            },
            "required": ["content"]
        })
    }

    async fn execute(
        &self,
        args: &HashMap<String, Value>,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let content = required_str(args, "content")?;
        if content.trim().is_empty() {
            return Err(ToolError::Generation(
                "article text cannot be empty for prompt generation".into(),
            ));
        }

        let messages = [ChatMessage::system(IMAGE_PROMPT_SYSTEM), ChatMessage::user(content)];
        let prompt = self
            .llm
            .complete(&messages, ctx.model.as_deref())
            .await
            .map_err(|e| ToolError::Generation(e.to_string()))?;

        Ok(json!({ "prompt": prompt.trim() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockReply};
    use crate::memory::Role;

    #[tokio::test]
    async fn test_prompt_from_completion() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::Text(
            " A lighthouse at dusk, watercolor ".into(),
        )]));
        let tool = ImagePromptTool::new(llm.clone());
        let args =
            serde_json::from_value(json!({"content": "A story about a lighthouse"})).unwrap();
        let out = tool.execute(&args, &ToolContext::default()).await.unwrap();
        assert_eq!(out, json!({"prompt": "A lighthouse at dusk, watercolor"}));

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages[0].role, Role::System);
        assert_eq!(calls[0].messages[1].content, "A story about a lighthouse");
    }

    #[tokio::test]
    async fn test_empty_content_skips_completion() {
        let llm = Arc::new(MockLlmClient::new());
        let tool = ImagePromptTool::new(llm.clone());
        let args = serde_json::from_value(json!({"content": "  "})).unwrap();
        let err = tool.execute(&args, &ToolContext::default()).await.unwrap_err();
        assert!(!err.is_parameter_error());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_is_generation_error() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::Fail("503".into())]));
        let tool = ImagePromptTool::new(llm);
        let args = serde_json::from_value(json!({"content": "text"})).unwrap();
        let err = tool.execute(&args, &ToolContext::default()).await.unwrap_err();
        assert!(matches!(err, ToolError::Generation(_)));
    }
}
