//! 按配置创建补全客户端
//!
//! DeepSeek 提供与 OpenAI 完全兼容的 API 接口，复用 OpenAiClient，仅替换 base_url 与 API Key 来源。
//! - Base URL: https://api.deepseek.com
//! - 默认模型: deepseek-chat

use std::sync::Arc;

use crate::config::LlmSection;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端
///
/// - 优先使用环境变量 `DEEPSEEK_API_KEY`，其次 `OPENAI_API_KEY`
/// - 模型可通过 `model` 参数或 `DEEPSEEK_MODEL` 环境变量指定
pub fn create_deepseek_client(model: Option<&str>, api_key: Option<&str>) -> OpenAiClient {
    let api_key = api_key
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| "sk-placeholder".to_string());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());

    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &model, Some(api_key.as_str()))
}

/// 根据 [llm] 配置段创建客户端：openai / deepseek / mock
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    match cfg.provider.as_str() {
        "mock" => {
            tracing::warn!("using mock LLM provider, replies are echoes");
            Arc::new(MockLlmClient::new())
        }
        "deepseek" => {
            let client = match cfg.base_url.as_deref() {
                Some(url) => OpenAiClient::new(Some(url), &cfg.model, cfg.api_key.as_deref()),
                None => create_deepseek_client(Some(&cfg.model), cfg.api_key.as_deref()),
            };
            Arc::new(client.with_request_timeout(cfg.timeouts.request))
        }
        other => {
            if other != "openai" {
                tracing::warn!(provider = %other, "unknown LLM provider, falling back to openai");
            }
            Arc::new(
                OpenAiClient::new(cfg.base_url.as_deref(), &cfg.model, cfg.api_key.as_deref())
                    .with_request_timeout(cfg.timeouts.request),
            )
        }
    }
}
