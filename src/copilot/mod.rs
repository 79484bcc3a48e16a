//! 写作助手编排：规划 -> 工具执行 -> 回复合成，事件实时流式推送

pub mod bridge;
pub mod event_log;
pub mod events;
pub mod manager;
pub mod planner;
pub mod synthesis;
pub mod types;
pub mod worker;

pub use bridge::{forward, forward_request, BridgeError, EventSink, ForwardOutcome};
pub use event_log::{EventLog, EventSubscription};
pub use events::{RequestEvent, StreamEvent, WireMessage};
pub use manager::{CopilotManager, ManagerSettings, WORKER_LOST_MESSAGE};
pub use planner::{parse_plan, Planner};
pub use synthesis::Synthesizer;
pub use types::{
    ArtifactStatus, ArtifactUpdate, ChatRequest, Plan, PlannedTool, RequestInfo, RequestStatus,
    Strategy, SubmitResponse, ToolExecutionResult, PARSE_FAILURE_REASONING,
};
pub use worker::{CopilotEngine, Job, Phase};
