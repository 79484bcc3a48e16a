//! rewrite_document 工具：整篇重写，返回新内容与修改理由

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::ToolError;
use crate::tools::params::{optional_str, required_str, string_property};
use crate::tools::{Tool, ToolContext, ToolKind};

pub struct RewriteDocumentTool;

#[async_trait]
impl Tool for RewriteDocumentTool {
    fn kind(&self) -> ToolKind {
        ToolKind::RewriteDocument
    }

    fn description(&self) -> &str {
        "Rewrite the whole document. Use for restructuring or when most of the content changes."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "new_content": string_property("Full new document content in markdown"),
                "reason": string_property("Short explanation of the changes")
            },
            "required": ["new_content"]
        })
    }

    async fn execute(
        &self,
        args: &HashMap<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let new_content = required_str(args, "new_content")?;
        let reason = optional_str(args, "reason")?.unwrap_or_default();
        tracing::debug!(content_len = new_content.len(), "rewrite_document prepared");
        Ok(json!({ "new_content": new_content, "reason": reason }))
    }
}
