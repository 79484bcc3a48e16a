//! analyze_document 工具：记录分析请求与关注点
//!
//! 不在这里生成分析内容；合成阶段会把文档原文与关注点一起交给补全服务。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::ToolError;
use crate::tools::params::{optional_str, required_str, string_property};
use crate::tools::{Tool, ToolContext, ToolKind};

pub struct AnalyzeDocumentTool;

/// 从用户请求推断关注点
pub fn infer_focus_area(user_request: &str) -> &'static str {
    let lower = user_request.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["engaging", "boring"]) {
        "engagement"
    } else if has(&["clear", "confusing"]) {
        "clarity"
    } else if has(&["structure", "organize"]) {
        "structure"
    } else if has(&["grammar", "spelling"]) {
        "grammar"
    } else {
        "overall"
    }
}

#[async_trait]
impl Tool for AnalyzeDocumentTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AnalyzeDocument
    }

    fn description(&self) -> &str {
        "Review the document and suggest improvements without changing it. \
         Always pass the user's original request."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_request": string_property("The user's original request"),
                "focus_area": string_property(concat!(
                    "Optional: engagement | clarity | structure | grammar | flow",
                    " | technical_accuracy"
                ))
            },
            "required": ["user_request"]
        })
    }

    async fn execute(
        &self,
        args: &HashMap<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let user_request = required_str(args, "user_request")?;
        let focus_area = match optional_str(args, "focus_area")? {
            Some(area) if !area.trim().is_empty() => area.to_string(),
            _ => infer_focus_area(user_request).to_string(),
        };
        tracing::debug!(focus_area = %focus_area, "analyze_document captured");

        Ok(json!({
            "focus_area": focus_area,
            "user_request": user_request,
            "analysis_done": true
        }))
    }
}
