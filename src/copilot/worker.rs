//! 单请求编排 worker（状态机）
//!
//! Planning -> RespondingOnly -> Done，或 Planning -> ExecutingTools -> Synthesizing -> Done；
//! 请求级失败（规划补全失败、超时、取消）进入 Error。无论如何最后都发出且只发出一个终止事件。

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::copilot::{
    ArtifactUpdate, ChatRequest, Plan, Planner, StreamEvent, Synthesizer, ToolExecutionResult,
};
use crate::core::{CopilotError, RunGuard};
use crate::llm::LlmClient;
use crate::memory::SessionStore;
use crate::tools::{ToolCatalog, ToolContext, ToolExecutor};

/// worker 所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    RespondingOnly,
    ExecutingTools,
    Synthesizing,
    Done,
    Error,
}

/// 一次编排任务
#[derive(Debug, Clone)]
pub struct Job {
    pub request_id: String,
    pub session_id: String,
    pub request: ChatRequest,
    pub guard: RunGuard,
}

/// 四个引擎 + 会话记忆；所有请求共享一份
pub struct CopilotEngine {
    planner: Planner,
    executor: ToolExecutor,
    synthesizer: Synthesizer,
    sessions: Arc<SessionStore>,
}

impl CopilotEngine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        sessions: Arc<SessionStore>,
        tool_timeout_secs: u64,
    ) -> Self {
        let catalog = Arc::new(ToolCatalog::standard(llm.clone()));
        Self {
            planner: Planner::new(llm.clone(), catalog.clone()),
            executor: ToolExecutor::new(catalog, tool_timeout_secs),
            synthesizer: Synthesizer::new(llm),
            sessions,
        }
    }

    /// 运行一个请求直到终止，返回终止阶段
    pub async fn run(&self, job: Job, events: mpsc::Sender<StreamEvent>) -> Phase {
        let mut worker = Worker {
            engine: self,
            job: &job,
            events: &events,
            phase: Phase::Planning,
        };

        let terminal = match worker.drive().await {
            Ok(()) => {
                worker.enter(Phase::Done);
                StreamEvent::Done
            }
            Err(e) => {
                worker.enter(Phase::Error);
                tracing::error!(
                    request_id = %job.request_id,
                    session_id = %job.session_id,
                    error = %e,
                    "copilot request failed"
                );
                StreamEvent::Error(e.to_string())
            }
        };
        if events.send(terminal).await.is_err() {
            tracing::warn!(
                request_id = %job.request_id,
                "event channel closed before terminal event"
            );
        }
        worker.phase
    }
}

struct Worker<'a> {
    engine: &'a CopilotEngine,
    job: &'a Job,
    events: &'a mpsc::Sender<StreamEvent>,
    phase: Phase,
}

impl Worker<'_> {
    fn enter(&mut self, next: Phase) {
        tracing::debug!(
            request_id = %self.job.request_id,
            from = ?self.phase,
            to = ?next,
            "phase transition"
        );
        self.phase = next;
    }

    async fn emit(&self, event: StreamEvent) -> Result<(), CopilotError> {
        self.events
            .send(event)
            .await
            .map_err(|_| CopilotError::Cancelled)
    }

    async fn drive(&mut self) -> Result<(), CopilotError> {
        let job = self.job;
        let engine = self.engine;
        job.guard.check()?;

        engine.sessions.get_or_create(&job.session_id).await;

        let plan: Plan = job.guard.run(engine.planner.create_plan(&job.request)).await??;
        tracing::info!(
            request_id = %job.request_id,
            strategy = ?plan.strategy,
            tools = plan.tools.len(),
            "plan created"
        );
        self.emit(StreamEvent::Plan(plan.clone())).await?;

        if !plan.initial_reply.is_empty() {
            self.emit(StreamEvent::assistant(plan.initial_reply.clone())).await?;
        }

        let mut results: Vec<ToolExecutionResult> = Vec::new();
        if plan.uses_tools() {
            self.enter(Phase::ExecutingTools);
            let ctx = ToolContext::with_model(job.request.model());
            for (i, planned) in plan.tools.iter().enumerate() {
                job.guard.check()?;
                tracing::info!(
                    request_id = %job.request_id,
                    tool = %planned.name,
                    "executing tool {}/{}",
                    i + 1,
                    plan.tools.len()
                );
                self.emit(StreamEvent::Artifact(ArtifactUpdate::starting(planned)))
                    .await?;

                let outcome = job.guard.run(engine.executor.execute(planned, &ctx)).await;
                let (result, interrupted) = match outcome {
                    Ok(Ok(result)) => (result, None),
                    Ok(Err(failure)) => (failure.into_result(), None),
                    Err(e) => {
                        let name = planned.name.clone();
                        let result = ToolExecutionResult::new(name, planned.parameters.clone())
                            .with_error(e.to_string());
                        (result, Some(e))
                    }
                };

                self.emit(StreamEvent::Artifact(ArtifactUpdate::finished(&result)))
                    .await?;
                engine
                    .sessions
                    .append_result(&job.session_id, result.clone())
                    .await;
                results.push(result);

                if let Some(e) = interrupted {
                    return Err(e);
                }
            }
        } else {
            self.enter(Phase::RespondingOnly);
        }

        if !results.is_empty() {
            job.guard.check()?;
            self.enter(Phase::Synthesizing);
            let reply = job
                .guard
                .run(
                    engine
                        .synthesizer
                        .generate_final_response(&job.request, &plan, &results),
                )
                .await?;
            match reply {
                Ok(text) if !text.is_empty() => self.emit(StreamEvent::assistant(text)).await?,
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    request_id = %job.request_id,
                    error = %e,
                    "final response generation failed, closing without summary"
                ),
            }
        }

        engine
            .sessions
            .finish_turn(&job.session_id, job.request.document())
            .await;
        Ok(())
    }
}
