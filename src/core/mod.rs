//! 核心层：错误分类、单请求运行守卫（取消 + 截止时间）

pub mod error;
pub mod guard;

pub use error::{CopilotError, ToolError};
pub use guard::RunGuard;
