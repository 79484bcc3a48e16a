//! 工具执行器
//!
//! 持有 ToolCatalog 与单工具超时；execute(planned, ctx) 解析工具、在超时内执行，
//! 无论成败都产出一条 ToolExecutionResult（失败时附带 ToolError）；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::timeout;

use crate::copilot::{PlannedTool, ToolExecutionResult};
use crate::core::ToolError;
use crate::tools::{ToolCatalog, ToolContext};

/// 工具失败：仍携带一条带 error 的执行记录，调用方必须照常记录
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct ToolFailure {
    pub result: ToolExecutionResult,
    pub error: ToolError,
}

impl ToolFailure {
    fn new(tool: &PlannedTool, error: ToolError) -> Self {
        Self {
            result: ToolExecutionResult::new(tool.name.clone(), tool.parameters.clone())
                .with_error(error.to_string()),
            error,
        }
    }

    pub fn into_result(self) -> ToolExecutionResult {
        self.result
    }
}

/// 工具执行器：对每次调用施加超时，并把结果统一成 ToolExecutionResult
pub struct ToolExecutor {
    catalog: Arc<ToolCatalog>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(catalog: Arc<ToolCatalog>, timeout_secs: u64) -> Self {
        Self {
            catalog,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    /// 执行一次计划中的工具调用
    pub async fn execute(
        &self,
        planned: &PlannedTool,
        ctx: &ToolContext,
    ) -> Result<ToolExecutionResult, ToolFailure> {
        let start = Instant::now();
        let args_preview = args_preview(planned);

        let outcome = match self.catalog.resolve(&planned.name) {
            Ok(tool) => match timeout(self.timeout, tool.execute(&planned.parameters, ctx)).await {
                Ok(out) => out,
                Err(_) => Err(ToolError::Timeout(self.timeout.as_secs())),
            },
            Err(e) => Err(e),
        };

        let (ok, label): (bool, &str) = match &outcome {
            Ok(_) => (true, "ok"),
            Err(ToolError::Timeout(_)) => (false, "timeout"),
            Err(ToolError::Unknown(_)) => (false, "unknown"),
            Err(e) if e.is_parameter_error() => (false, "invalid_params"),
            Err(_) => (false, "error"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": planned.name,
            "ok": ok,
            "outcome": label,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match outcome {
            Ok(value) => Ok(
                ToolExecutionResult::new(planned.name.clone(), planned.parameters.clone())
                    .with_result(value),
            ),
            Err(error) => {
                tracing::warn!(
                    tool = %planned.name,
                    outcome = label,
                    error = %error,
                    "tool failed"
                );
                Err(ToolFailure::new(planned, error))
            }
        }
    }
}

fn args_preview(planned: &PlannedTool) -> String {
    let s = serde_json::to_string(&planned.parameters).unwrap_or_default();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
