//! 请求注册表 / 异步管理器
//!
//! submit 校验请求、分配 request_id 与 session_id、启动一个 worker 和一个泵任务后立即返回。
//! 泵任务给事件打上 request_id 写入 EventLog、在终止事件时更新状态并关闭日志，
//! 再在宽限期后把记录从注册表中移除。注册表由读写锁保护，只有 submit、泵任务与回收定时器写入。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{AppConfig, CopilotSection, MIN_EVENT_BUFFER};
use crate::copilot::{
    ChatRequest, CopilotEngine, EventLog, EventSubscription, Job, Phase, RequestEvent, RequestInfo,
    RequestStatus, StreamEvent, SubmitResponse,
};
use crate::core::{CopilotError, RunGuard};
use crate::llm::LlmClient;
use crate::memory::{Role, SessionStore};

/// worker 未发出终止事件就退出时补发的错误
pub const WORKER_LOST_MESSAGE: &str = "request worker terminated unexpectedly";

/// 管理器参数
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// 单请求绝对截止时间
    pub request_timeout: Duration,
    /// worker -> 泵 的通道容量
    pub event_buffer: usize,
    /// 完成后保留记录的时长
    pub eviction_grace: Duration,
    pub tool_timeout_secs: u64,
    /// 会话清理间隔
    pub sweep_interval: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::from_section(&CopilotSection::default())
    }
}

impl ManagerSettings {
    pub fn from_section(section: &CopilotSection) -> Self {
        Self {
            request_timeout: section.request_timeout(),
            event_buffer: section.event_buffer(),
            eviction_grace: section.eviction_grace(),
            tool_timeout_secs: section.tool_timeout_secs,
            sweep_interval: Duration::from_secs(60),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_eviction_grace(mut self, grace: Duration) -> Self {
        self.eviction_grace = grace;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// 注册表中的一条请求记录
struct RequestRecord {
    session_id: String,
    status: RequestStatus,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    log: Arc<EventLog>,
    cancel: CancellationToken,
}

type Registry = Arc<RwLock<HashMap<String, RequestRecord>>>;

/// 请求注册表 / 异步管理器；显式构造后注入到传输层
pub struct CopilotManager {
    engine: Arc<CopilotEngine>,
    sessions: Arc<SessionStore>,
    requests: Registry,
    settings: ManagerSettings,
    /// 所有请求取消令牌的父令牌，同时停止会话清理任务
    shutdown: CancellationToken,
}

impl CopilotManager {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        sessions: Arc<SessionStore>,
        settings: ManagerSettings,
    ) -> Self {
        let engine = Arc::new(CopilotEngine::new(
            llm,
            sessions.clone(),
            settings.tool_timeout_secs,
        ));
        Self {
            engine,
            sessions,
            requests: Arc::new(RwLock::new(HashMap::new())),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// 按 [copilot] / [memory] 配置段构造
    pub fn from_config(llm: Arc<dyn LlmClient>, config: &AppConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(
            config.memory.session_ttl_secs,
            config.memory.max_sessions,
        ));
        let settings = ManagerSettings::from_section(&config.copilot)
            .with_sweep_interval(Duration::from_secs(config.memory.sweep_interval_secs.max(1)));
        Self::new(llm, sessions, settings)
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// 提交请求；messages 为空时同步返回 InvalidInput，不启动 worker
    pub async fn submit(&self, req: ChatRequest) -> Result<SubmitResponse, CopilotError> {
        if let Err(e) = req.validate() {
            tracing::warn!(error = %e, "rejected copilot request");
            return Err(e);
        }

        let request_id = Uuid::new_v4().to_string();
        let session_id = match req.session_id.as_deref().filter(|s| !s.is_empty()) {
            Some(id) if self.sessions.contains(id).await => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        self.sessions.get_or_create(&session_id).await;

        let cancel = self.shutdown.child_token();
        let log = Arc::new(EventLog::new());
        let (tx, rx) = mpsc::channel(self.settings.event_buffer.max(MIN_EVENT_BUFFER));

        self.requests.write().await.insert(
            request_id.clone(),
            RequestRecord {
                session_id: session_id.clone(),
                status: RequestStatus::Processing,
                started_at: Utc::now(),
                finished_at: None,
                log: log.clone(),
                cancel: cancel.clone(),
            },
        );

        tracing::info!(
            request_id = %request_id,
            session_id = %session_id,
            messages = req.messages.len(),
            document_len = req.document().map(str::len).unwrap_or(0),
            "copilot request submitted"
        );

        let job = Job {
            request_id: request_id.clone(),
            session_id: session_id.clone(),
            request: req,
            guard: RunGuard::new(cancel, self.settings.request_timeout),
        };
        let engine = self.engine.clone();
        let worker = tokio::spawn(async move { engine.run(job, tx).await });

        tokio::spawn(pump(
            self.requests.clone(),
            request_id.clone(),
            log,
            rx,
            worker,
            self.settings.eviction_grace,
        ));

        Ok(SubmitResponse {
            request_id,
            session_id,
            status: RequestStatus::Processing,
        })
    }

    /// 订阅请求事件：先回放已缓冲事件，再接收实时事件；未知或已回收返回 None
    pub async fn subscribe(&self, request_id: &str) -> Option<EventSubscription> {
        self.requests
            .read()
            .await
            .get(request_id)
            .map(|record| record.log.subscribe())
    }

    pub async fn status(&self, request_id: &str) -> Option<RequestInfo> {
        self.requests
            .read()
            .await
            .get(request_id)
            .map(|record| RequestInfo {
                request_id: request_id.to_string(),
                session_id: record.session_id.clone(),
                status: record.status,
                started_at: record.started_at,
                finished_at: record.finished_at,
                events: record.log.len(),
            })
    }

    /// 取消仍在处理中的请求；worker 会在下一个挂起点或阶段边界以 Error 结束
    pub async fn cancel(&self, request_id: &str) -> bool {
        let requests = self.requests.read().await;
        match requests.get(request_id) {
            Some(record) if record.status == RequestStatus::Processing => {
                tracing::info!(request_id = %request_id, "cancelling copilot request");
                record.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// 注册表中的请求数（含已完成、未回收的）
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// 非流式调用：提交后等待终止，返回全部 assistant 回复（以空行连接）
    pub async fn generate(&self, req: ChatRequest) -> Result<String, CopilotError> {
        let submitted = self.submit(req).await?;
        let mut sub = self
            .subscribe(&submitted.request_id)
            .await
            .ok_or_else(|| CopilotError::Aborted("request evicted before completion".into()))?;

        let mut replies: Vec<String> = Vec::new();
        while let Some(event) = sub.next().await {
            match event.event {
                StreamEvent::Chat {
                    role: Role::Assistant,
                    content,
                } => replies.push(content),
                StreamEvent::Error(message) => return Err(CopilotError::Aborted(message)),
                StreamEvent::Done => break,
                _ => {}
            }
        }
        Ok(replies.join("\n\n"))
    }

    /// 启动会话记忆的定期清理，随 shutdown 停止
    pub fn start_session_sweeper(&self) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        let shutdown = self.shutdown.clone();
        let period = self.settings.sweep_interval;
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = timer.tick() => {
                        let expired = sessions.cleanup_expired().await;
                        if expired > 0 {
                            tracing::info!(expired, "cleaned up idle copilot sessions");
                        }
                    }
                }
            }
        })
    }

    /// 取消所有在途请求并停止后台任务
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for CopilotManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn terminal_status(event: &StreamEvent) -> Option<RequestStatus> {
    match event {
        StreamEvent::Done => Some(RequestStatus::Done),
        StreamEvent::Error(_) => Some(RequestStatus::Error),
        _ => None,
    }
}

/// 单请求泵任务：worker 事件 -> EventLog，终止后更新状态、关闭日志并安排回收
async fn pump(
    requests: Registry,
    request_id: String,
    log: Arc<EventLog>,
    mut rx: mpsc::Receiver<StreamEvent>,
    worker: JoinHandle<Phase>,
    eviction_grace: Duration,
) {
    let mut seq = 0usize;
    let mut status = None;

    while let Some(event) = rx.recv().await {
        let terminal = terminal_status(&event);
        log.append(RequestEvent {
            request_id: request_id.clone(),
            seq,
            event,
        });
        seq += 1;
        if terminal.is_some() {
            status = terminal;
            break;
        }
    }
    drop(rx);

    let status = match status {
        Some(status) => status,
        None => {
            if let Err(e) = worker.await {
                tracing::error!(request_id = %request_id, error = %e, "copilot worker aborted");
            }
            log.append(RequestEvent {
                request_id: request_id.clone(),
                seq,
                event: StreamEvent::Error(WORKER_LOST_MESSAGE.to_string()),
            });
            RequestStatus::Error
        }
    };

    {
        let mut map = requests.write().await;
        if let Some(record) = map.get_mut(&request_id) {
            if record.status == RequestStatus::Processing {
                record.status = status;
                record.finished_at = Some(Utc::now());
            }
        }
    }
    log.close();
    tracing::info!(
        request_id = %request_id,
        status = ?status,
        events = log.len(),
        "copilot request finished"
    );

    tokio::spawn(async move {
        tokio::time::sleep(eviction_grace).await;
        if requests.write().await.remove(&request_id).is_some() {
            tracing::debug!(request_id = %request_id, "evicted copilot request");
        }
    });
}
