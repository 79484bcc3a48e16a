//! Quill - 写作助手异步编排服务
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类与单请求运行守卫（取消 + 截止时间）
//! - **llm**: 补全服务抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话消息模型与会话记忆
//! - **tools**: 写作工具目录与执行器
//! - **copilot**: 规划、工具执行、回复合成、请求注册表与流式桥接
//! - **server**: HTTP 提交接口与 WebSocket 订阅（feature `server`）
//! - **observability**: 日志初始化

pub mod config;
pub mod copilot;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
#[cfg(feature = "server")]
pub mod server;
pub mod tools;

pub use copilot::{ChatRequest, CopilotManager, ManagerSettings, StreamEvent, WireMessage};
