//! edit_text 工具：定点替换文档中的一段文本
//!
//! 只返回替换描述 { original_text, new_text, reason, edit_type }，由前端负责落到文档上。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::ToolError;
use crate::tools::params::{optional_str, required_str, string_property};
use crate::tools::{Tool, ToolContext, ToolKind};

pub struct EditTextTool;

#[async_trait]
impl Tool for EditTextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::EditText
    }

    fn description(&self) -> &str {
        "Targeted edit of a specific passage while keeping the rest of the document intact. \
         Preferred for small changes: typos, grammar fixes, rewording one sentence or paragraph."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "original_text": string_property("Exact text to find in the document"),
                "new_text": string_property("Replacement text"),
                "reason": string_property("Short explanation of the edit")
            },
            "required": ["original_text", "new_text"]
        })
    }

    async fn execute(
        &self,
        args: &HashMap<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let original_text = required_str(args, "original_text")?;
        let new_text = required_str(args, "new_text")?;
        let reason = optional_str(args, "reason")?.unwrap_or_default();

        tracing::debug!(
            original_len = original_text.len(),
            new_len = new_text.len(),
            "edit_text prepared"
        );

        Ok(json!({
            "original_text": original_text,
            "new_text": new_text,
            "reason": reason,
            "edit_type": "replace"
        }))
    }
}
