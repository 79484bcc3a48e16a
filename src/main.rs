//! Quill 服务入口
//!
//! 初始化日志、加载配置、创建补全客户端与 CopilotManager，然后启动 HTTP / WebSocket 服务。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use quill::config::load_config;
use quill::copilot::CopilotManager;
use quill::llm::create_llm_from_config;
use quill::observability;
use quill::server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;

    let llm = create_llm_from_config(&cfg.llm);
    let manager = Arc::new(CopilotManager::from_config(llm, &cfg));
    let sweeper = manager.start_session_sweeper();

    let state = Arc::new(AppState::new(manager.clone(), cfg.server.clone()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.server.bind_addr))?;
    tracing::info!(
        addr = %cfg.server.bind_addr,
        provider = %cfg.llm.provider,
        model = %cfg.llm.model,
        "quill listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("Server error")?;

    manager.shutdown();
    sweeper.abort();
    Ok(())
}
