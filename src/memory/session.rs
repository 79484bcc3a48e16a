//! 会话记忆（Session Memory）
//!
//! 按 session_id 保存最近一次文档快照与工具执行历史，首次访问时惰性创建。
//! 与网关会话管理一致：空闲超过 TTL 的会话由定期清理移除；总数超过上限时淘汰最久未更新的会话。

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::copilot::ToolExecutionResult;

/// context 中保存最近文档快照的键
pub const LAST_DOCUMENT_KEY: &str = "last_document";

/// 单个会话的记忆
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMemory {
    pub session_id: String,
    pub context: HashMap<String, Value>,
    pub tool_results: Vec<ToolExecutionResult>,
    pub updated_at: DateTime<Utc>,
}

impl SessionMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            context: HashMap::new(),
            tool_results: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// 最近一次请求携带的文档内容
    pub fn last_document(&self) -> Option<&str> {
        self.context.get(LAST_DOCUMENT_KEY).and_then(|v| v.as_str())
    }

    fn idle_for(&self) -> Duration {
        (Utc::now() - self.updated_at).to_std().unwrap_or_default()
    }
}

/// 进程内会话记忆表（session_id -> SessionMemory）
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionMemory>>,
    /// 空闲过期时间
    ttl: Duration,
    /// 会话数上限
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl_secs: u64, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
            max_sessions: max_sessions.max(1),
        }
    }

    /// 获取会话快照；不存在时创建（必要时先淘汰最久未更新的会话）
    pub async fn get_or_create(&self, session_id: &str) -> SessionMemory {
        if let Some(memory) = self.sessions.read().await.get(session_id) {
            return memory.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(memory) = sessions.get(session_id) {
            return memory.clone();
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .min_by_key(|m| m.updated_at)
                .map(|m| m.session_id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    tracing::debug!(session_id = %id, "evicted least recently updated session");
                }
                None => break,
            }
        }

        let memory = SessionMemory::new(session_id);
        sessions.insert(session_id.to_string(), memory.clone());
        memory
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionMemory> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// 追加一条工具执行结果
    pub async fn append_result(&self, session_id: &str, result: ToolExecutionResult) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionMemory::new(session_id))
            .tool_results
            .push(result);
    }

    /// 一轮请求结束：刷新 updated_at，并在有文档时记录最新快照
    pub async fn finish_turn(&self, session_id: &str, document: Option<&str>) {
        let mut sessions = self.sessions.write().await;
        let memory = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionMemory::new(session_id));
        memory.updated_at = Utc::now();
        if let Some(doc) = document.filter(|d| !d.is_empty()) {
            memory
                .context
                .insert(LAST_DOCUMENT_KEY.to_string(), Value::String(doc.to_string()));
        }
    }

    /// 清理空闲超过 TTL 的会话，返回清理数量
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, m| m.idle_for() <= self.ttl);
        before - sessions.len()
    }

    /// 当前会话数
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(3600, 1000)
    }
}
