//! 工具目录
//!
//! 工具集合是封闭的：ToolKind 枚举列出全部工具，每个变体对应一个实现 Tool trait 的处理器，
//! 由 ToolCatalog 按 kind 注册与查找；新增工具只需增加变体并在 standard() 中注册。

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ToolError;
use crate::llm::LlmClient;
use crate::tools::{AnalyzeDocumentTool, EditTextTool, ImagePromptTool, RewriteDocumentTool};

/// 支持的工具种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    EditText,
    RewriteDocument,
    GenerateImagePrompt,
    AnalyzeDocument,
}

impl ToolKind {
    /// 在提示词中的展示顺序
    pub const ALL: [ToolKind; 4] = [
        ToolKind::EditText,
        ToolKind::RewriteDocument,
        ToolKind::GenerateImagePrompt,
        ToolKind::AnalyzeDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::EditText => "edit_text",
            ToolKind::RewriteDocument => "rewrite_document",
            ToolKind::GenerateImagePrompt => "generate_image_prompt",
            ToolKind::AnalyzeDocument => "analyze_document",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次工具调用的上下文
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// 请求指定的模型名，None 时用客户端默认模型
    pub model: Option<String>,
}

impl ToolContext {
    pub fn with_model(model: Option<&str>) -> Self {
        Self {
            model: model.map(String::from),
        }
    }
}

/// 工具 trait：种类、描述（供 LLM 理解）、参数 schema、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// 工具描述（写入规划提示词）
    fn description(&self) -> &str;

    /// 参数 JSON Schema
    fn parameters_schema(&self) -> Value;

    /// 校验参数并执行；成功返回结构化结果，由调用方决定如何应用到文档
    async fn execute(
        &self,
        args: &HashMap<String, Value>,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError>;
}

/// 工具目录：ToolKind -> 处理器
#[derive(Default, Clone)]
pub struct ToolCatalog {
    tools: BTreeMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部四个写作工具；图片提示词生成需要补全服务
    pub fn standard(llm: Arc<dyn LlmClient>) -> Self {
        let mut catalog = Self::new();
        catalog.register(EditTextTool);
        catalog.register(RewriteDocumentTool);
        catalog.register(ImagePromptTool::new(llm));
        catalog.register(AnalyzeDocumentTool);
        catalog
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    /// 按名称解析；未知名称或未注册返回 ToolError::Unknown
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        ToolKind::from_name(name)
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| ToolError::Unknown(name.to_string()))
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 规划提示词中的 Available tools 段落
    pub fn prompt_section(&self) -> String {
        let mut out = String::from("Available tools:\n");
        for (kind, tool) in &self.tools {
            out.push_str(&format!("- {}: {}\n", kind, tool.description()));
            out.push_str(&format!("  Parameters: {}\n", tool.parameters_schema()));
        }
        out
    }

    /// 工具定义 JSON（name / description / parameters）
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|(kind, tool)| {
                serde_json::json!({
                    "name": kind.as_str(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}
