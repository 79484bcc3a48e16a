//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `QUILL__*` 覆盖（双下划线表示嵌套，如 `QUILL__LLM__PROVIDER=deepseek`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 事件通道容量下限：保证常规扇出下 worker 不会因无人订阅而阻塞
pub const MIN_EVENT_BUFFER: usize = 100;

/// 单请求截止时间的取值范围（秒）
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub copilot: CopilotSection,
    #[serde(default)]
    pub memory: MemorySection,
}

/// [server] 段：监听地址与断线策略
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// WebSocket 断开时是否取消该连接订阅的请求
    #[serde(default)]
    pub cancel_on_disconnect: bool,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cancel_on_disconnect: false,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 请求未指定 model 时使用的默认模型
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次补全请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

/// [copilot] 段：单请求截止时间、事件缓冲、完成后保留时长、工具超时
#[derive(Debug, Clone, Deserialize)]
pub struct CopilotSection {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default = "default_eviction_grace_secs")]
    pub eviction_grace_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_event_buffer() -> usize {
    MIN_EVENT_BUFFER
}

fn default_eviction_grace_secs() -> u64 {
    900
}

fn default_tool_timeout_secs() -> u64 {
    60
}

impl Default for CopilotSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            event_buffer: default_event_buffer(),
            eviction_grace_secs: default_eviction_grace_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl CopilotSection {
    /// 单请求截止时间，限制在 5 到 10 分钟之间
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .clamp(MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn eviction_grace(&self) -> Duration {
        Duration::from_secs(self.eviction_grace_secs)
    }

    /// 事件通道容量，不低于 MIN_EVENT_BUFFER
    pub fn event_buffer(&self) -> usize {
        self.event_buffer.max(MIN_EVENT_BUFFER)
    }
}

/// [memory] 段：会话记忆的过期与容量
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// 定期清理间隔（秒）
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 QUILL__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 QUILL__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("QUILL")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
