//! 可观测性：tracing 订阅器初始化
//!
//! 默认只输出本 crate 的 info 级日志，可通过 RUST_LOG 覆盖（如 `RUST_LOG=quill=debug,tower_http=info`）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "quill=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 进程级初始化；重复调用时保留第一次的订阅器
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init();
}
