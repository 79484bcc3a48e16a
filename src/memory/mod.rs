//! 记忆层：对话消息模型、按会话的记忆（文档快照 + 工具执行历史）

pub mod conversation;
pub mod session;

pub use conversation::{last_user_content, ChatMessage, Role};
pub use session::{SessionMemory, SessionStore, LAST_DOCUMENT_KEY};
