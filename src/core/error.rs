//! 错误类型
//!
//! 只有 InvalidInput 与 PlanningFailure（以及超时 / 取消）会终止整个请求；
//! 工具错误限定在单个工具，合成失败只会让请求缺少收尾消息。

use thiserror::Error;

/// 编排过程中的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CopilotError {
    /// 提交时校验失败（如 messages 为空），不会进入 worker
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Planning failed: {0}")]
    PlanningFailure(String),

    #[error("Response synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    /// 请求以 Error 事件结束（同步等待结果时使用，内容为事件中的错误文本）
    #[error("{0}")]
    Aborted(String),
}

impl CopilotError {
    /// 是否应以 Error 终止请求
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::PlanningFailure(_)
                | Self::Timeout
                | Self::Cancelled
                | Self::Aborted(_)
        )
    }
}

/// 单个工具的错误；文本会原样写入 ToolExecutionResult.error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0} parameter is required")]
    MissingParameter(String),

    #[error("{0} parameter must be a string")]
    InvalidParameter(String),

    #[error("{0}")]
    Generation(String),

    #[error("tool timed out after {0}s")]
    Timeout(u64),

    #[error("unknown tool: {0}")]
    Unknown(String),
}

impl ToolError {
    /// 参数类错误（ToolParameterError）还是执行类错误（ToolExecutionError）
    pub fn is_parameter_error(&self) -> bool {
        matches!(self, Self::MissingParameter(_) | Self::InvalidParameter(_))
    }
}
