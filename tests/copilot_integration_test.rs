//! 编排集成测试：事件顺序、工具结果基数、部分失败、降级、超时、取消、回放与回收

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use quill::copilot::{
    ArtifactStatus, ChatRequest, CopilotManager, ManagerSettings, RequestStatus, Strategy,
    StreamEvent, PARSE_FAILURE_REASONING,
};
use quill::copilot::WORKER_LOST_MESSAGE;
use quill::core::CopilotError;
use quill::llm::{LlmClient, LlmError, MockLlmClient, MockReply};
use quill::memory::{ChatMessage, Role, SessionStore};

fn manager_with(llm: Arc<MockLlmClient>, settings: ManagerSettings) -> CopilotManager {
    CopilotManager::new(llm, Arc::new(SessionStore::default()), settings)
}

fn manager(llm: Arc<MockLlmClient>) -> CopilotManager {
    manager_with(llm, ManagerSettings::default())
}

async fn drain(manager: &CopilotManager, request_id: &str) -> Vec<StreamEvent> {
    let sub = manager.subscribe(request_id).await.expect("request registered");
    tokio::time::timeout(
        Duration::from_secs(5),
        sub.into_stream().map(|e| e.event).collect::<Vec<_>>(),
    )
    .await
    .expect("stream terminates")
}

fn user(text: &str) -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user(text)])
}

fn assert_well_formed(events: &[StreamEvent]) {
    assert!(matches!(events.first(), Some(StreamEvent::Plan(_))), "{events:?}");
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1);
    assert!(events.last().map(StreamEvent::is_terminal).unwrap_or(false));
}

#[tokio::test]
async fn test_partial_failure_keeps_sequence_and_reaches_done() {
    let plan = r#"{
        "strategy": "use_tools",
        "reasoning": "user wants an illustration, a fix and feedback",
        "tools": [
            {"name": "generate_image_prompt",
             "parameters": {"content": "A post about lighthouses"},
             "message": "Creating image prompt..."},
            {"name": "edit_text",
             "parameters": {"original_text": "lighthose"},
             "message": "Editing: title"},
            {"name": "analyze_document",
             "parameters": {"user_request": "is this boring?"},
             "message": "Analyzing content..."}
        ],
        "response_msg": "On it."
    }"#;
    let llm = Arc::new(MockLlmClient::with_replies([
        MockReply::Text(plan.into()),
        MockReply::Text("A lighthouse in a storm, oil painting".into()),
        MockReply::Text("Here is what I changed and some ideas.".into()),
    ]));
    let manager = manager(llm.clone());
    let request = user("illustrate, fix and review")
        .with_document("# Lighthose\nA post about lighthouses");
    let submitted = manager
        .submit(request)
        .await
        .unwrap();
    assert_eq!(submitted.status, RequestStatus::Processing);

    let events = drain(&manager, &submitted.request_id).await;
    assert_well_formed(&events);
    assert_eq!(events.len(), 10);
    assert_eq!(events[1], StreamEvent::assistant("On it."));

    let artifacts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Artifact(a) => Some((a.tool_name.as_str(), a.status)),
            _ => None,
        })
        .collect();
    assert_eq!(
        artifacts,
        vec![
            ("generate_image_prompt", ArtifactStatus::Starting),
            ("generate_image_prompt", ArtifactStatus::Completed),
            ("edit_text", ArtifactStatus::Starting),
            ("edit_text", ArtifactStatus::Error),
            ("analyze_document", ArtifactStatus::Starting),
            ("analyze_document", ArtifactStatus::Completed),
        ]
    );
    assert_eq!(events[8], StreamEvent::assistant("Here is what I changed and some ideas."));
    assert_eq!(events[9], StreamEvent::Done);

    let synthesis = &llm.calls()[2].messages[0].content;
    assert!(synthesis.contains("- edit_text: ERROR - new_text parameter is required"));
    assert!(synthesis
        .contains("Image prompt has been generated: A lighthouse in a storm, oil painting"));
    assert!(synthesis.contains("- Focus area: engagement"));

    let info = manager.status(&submitted.request_id).await.unwrap();
    assert_eq!(info.status, RequestStatus::Done);
    assert!(info.finished_at.is_some());

    let memory = manager.sessions().get(&submitted.session_id).await.unwrap();
    assert_eq!(memory.tool_results.len(), 3);
    assert!(memory.tool_results[1].error.is_some());
    assert_eq!(memory.last_document(), Some("# Lighthose\nA post about lighthouses"));
}

#[tokio::test]
async fn test_fix_typo_scenario() {
    let plan = r#"```json
{"strategy":"use_tools","reasoning":"typo fix","tools":[
  {"name":"edit_text",
   "parameters":{"original_text":"recieve","new_text":"receive","reason":"spelling"},
   "message":"Editing: paragraph 2"}
],"response_msg":"Let me fix that text."}
```"#;
    let llm = Arc::new(MockLlmClient::with_replies([
        MockReply::Text(plan.into()),
        MockReply::Text("I corrected \"recieve\" to \"receive\" in paragraph 2.".into()),
    ]));
    let manager = manager(llm);
    let submitted = manager
        .submit(user("Fix the typo in paragraph 2").with_document("Intro.\n\nYou will recieve it."))
        .await
        .unwrap();
    let events = drain(&manager, &submitted.request_id).await;
    assert_well_formed(&events);

    match &events[0] {
        StreamEvent::Plan(plan) => {
            assert_eq!(plan.strategy, Strategy::UseTools);
            assert_eq!(plan.tools.len(), 1);
            assert_eq!(plan.tools[0].name, "edit_text");
            assert!(plan.tools[0].parameters.contains_key("original_text"));
            assert!(plan.tools[0].parameters.contains_key("new_text"));
        }
        other => panic!("expected plan, got {other:?}"),
    }
    let completed = events.iter().find_map(|e| match e {
        StreamEvent::Artifact(a) if a.status == ArtifactStatus::Completed => Some(a.clone()),
        _ => None,
    });
    let completed = completed.expect("completed artifact");
    let result = completed.result.expect("edit result");
    assert_eq!(result["original_text"], "recieve");
    assert_eq!(result["new_text"], "receive");
    assert_eq!(result["edit_type"], "replace");

    match &events[events.len() - 2] {
        StreamEvent::Chat { role, content } => {
            assert_eq!(*role, Role::Assistant);
            assert!(content.contains("receive"));
        }
        other => panic!("expected closing chat, got {other:?}"),
    }
}

#[tokio::test]
async fn test_respond_only_hook_uses_single_completion() {
    let plan = r#"{"strategy":"respond_only","reasoning":"advice","tools":[],
        "response_msg":"Open with a question your reader can't ignore."}"#;
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Text(plan.into())]));
    let manager = manager(llm.clone());
    let submitted = manager
        .submit(user("What's a good hook for this post?"))
        .await
        .unwrap();
    let events = drain(&manager, &submitted.request_id).await;

    assert_well_formed(&events);
    assert_eq!(events.len(), 3);
    match &events[0] {
        StreamEvent::Plan(plan) => assert_eq!(plan.strategy, Strategy::RespondOnly),
        other => panic!("expected plan, got {other:?}"),
    }
    assert_eq!(
        events[1],
        StreamEvent::assistant("Open with a question your reader can't ignore.")
    );
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_unparseable_plan_degrades_without_error() {
    let raw = "Sure! Your intro is strong, maybe tighten the last sentence.";
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Text(raw.into())]));
    let manager = manager(llm.clone());
    let submitted = manager.submit(user("thoughts?")).await.unwrap();
    let events = drain(&manager, &submitted.request_id).await;

    match &events[0] {
        StreamEvent::Plan(plan) => {
            assert_eq!(plan.strategy, Strategy::RespondOnly);
            assert_eq!(plan.reasoning, PARSE_FAILURE_REASONING);
            assert!(plan.tools.is_empty());
            assert_eq!(plan.initial_reply, raw);
        }
        other => panic!("expected plan, got {other:?}"),
    }
    assert_eq!(events[1], StreamEvent::assistant(raw));
    assert_eq!(events[2], StreamEvent::Done);
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error(_))));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_planning_failure_terminates_with_error() {
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Fail("upstream 503".into())]));
    let manager = manager(llm.clone());
    let submitted = manager.submit(user("rewrite this")).await.unwrap();
    let events = drain(&manager, &submitted.request_id).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(msg) => assert!(msg.starts_with("Planning failed")),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(llm.call_count(), 1);
    let info = manager.status(&submitted.request_id).await.unwrap();
    assert_eq!(info.status, RequestStatus::Error);
}

#[tokio::test]
async fn test_synthesis_failure_still_reaches_done() {
    let plan = r##"{"strategy":"use_tools","reasoning":"r","tools":[
        {"name":"rewrite_document",
         "parameters":{"new_content":"# v2","reason":"shorter"},
         "message":"Rewriting document..."}
    ],"response_msg":"I'll rewrite that for you."}"##;
    let llm = Arc::new(MockLlmClient::with_replies([
        MockReply::Text(plan.into()),
        MockReply::Fail("rate limited".into()),
    ]));
    let manager = manager(llm);
    let submitted = manager.submit(user("rewrite")).await.unwrap();
    let events = drain(&manager, &submitted.request_id).await;

    assert_well_formed(&events);
    assert_eq!(events.len(), 5);
    assert!(matches!(
        &events[3],
        StreamEvent::Artifact(a) if a.status == ArtifactStatus::Completed
    ));
    assert_eq!(events[4], StreamEvent::Done);
}

#[tokio::test]
async fn test_planning_timeout_closes_with_error() {
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Hang]));
    let manager = manager_with(
        llm,
        ManagerSettings::default().with_request_timeout(Duration::from_millis(100)),
    );
    let submitted = manager.submit(user("anything")).await.unwrap();
    let events = drain(&manager, &submitted.request_id).await;

    assert_eq!(events, vec![StreamEvent::Error("request timed out".into())]);
    assert_eq!(
        manager.status(&submitted.request_id).await.unwrap().status,
        RequestStatus::Error
    );
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Hang]));
    let manager = manager(llm);
    let submitted = manager.submit(user("anything")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(manager.cancel(&submitted.request_id).await);

    let events = drain(&manager, &submitted.request_id).await;
    assert_eq!(events, vec![StreamEvent::Error("request cancelled".into())]);
    assert!(!manager.cancel(&submitted.request_id).await);
    assert!(!manager.cancel("no-such-request").await);
}

#[tokio::test]
async fn test_empty_messages_rejected_synchronously() {
    let llm = Arc::new(MockLlmClient::new());
    let manager = manager(llm.clone());
    let err = manager.submit(ChatRequest::default()).await.unwrap_err();
    assert!(matches!(err, CopilotError::InvalidInput(_)));
    assert_eq!(manager.request_count().await, 0);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_late_subscribers_replay_full_sequence() {
    let plan =
        r#"{"strategy":"respond_only","reasoning":"q","tools":[],"response_msg":"Hi there."}"#;
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Text(plan.into())]));
    let manager = manager(llm);
    let submitted = manager.submit(user("hello")).await.unwrap();

    let first = drain(&manager, &submitted.request_id).await;
    let second = drain(&manager, &submitted.request_id).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);

    let sub = manager.subscribe(&submitted.request_id).await.unwrap();
    let stamped: Vec<_> = sub.into_stream().collect().await;
    assert!(stamped.iter().all(|e| e.request_id == submitted.request_id));
    assert_eq!(stamped.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_concurrent_subscribers_see_identical_streams() {
    let plan = r#"{"strategy":"use_tools","reasoning":"r","tools":[
        {"name":"analyze_document","parameters":{"user_request":"is it clear?"},
         "message":"Analyzing"}
    ],"response_msg":""}"#;
    let llm = Arc::new(MockLlmClient::with_replies([
        MockReply::Delayed(Duration::from_millis(50), plan.into()),
        MockReply::Delayed(Duration::from_millis(50), "1. Shorten the intro.".into()),
    ]));
    let manager = Arc::new(manager(llm));
    let submitted = manager.submit(user("is it clear?").with_document("Text")).await.unwrap();

    let a = {
        let m = manager.clone();
        let id = submitted.request_id.clone();
        tokio::spawn(async move { drain(&m, &id).await })
    };
    let b = {
        let m = manager.clone();
        let id = submitted.request_id.clone();
        tokio::spawn(async move { drain(&m, &id).await })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a, b);
    assert_well_formed(&a);
    assert_eq!(a.len(), 5);
}

#[tokio::test]
async fn test_finished_request_is_evicted_after_grace() {
    let plan = r#"{"strategy":"respond_only","reasoning":"q","tools":[],"response_msg":"ok"}"#;
    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Text(plan.into())]));
    let manager = manager_with(
        llm,
        ManagerSettings::default().with_eviction_grace(Duration::from_millis(50)),
    );
    let submitted = manager.submit(user("hi")).await.unwrap();
    drain(&manager, &submitted.request_id).await;
    assert!(manager.status(&submitted.request_id).await.is_some());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(manager.subscribe(&submitted.request_id).await.is_none());
    assert!(manager.status(&submitted.request_id).await.is_none());
    assert_eq!(manager.request_count().await, 0);
}

#[tokio::test]
async fn test_session_reused_when_known() {
    let llm = Arc::new(MockLlmClient::new());
    let manager = manager(llm);
    let first = manager
        .submit(user("first").with_document("draft one"))
        .await
        .unwrap();
    drain(&manager, &first.request_id).await;

    let second = manager
        .submit(user("second").with_session(first.session_id.clone()))
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);
    assert_ne!(second.request_id, first.request_id);
    drain(&manager, &second.request_id).await;

    let memory = manager.sessions().get(&first.session_id).await.unwrap();
    assert_eq!(memory.last_document(), Some("draft one"));

    let third = manager
        .submit(user("third").with_session("never-seen"))
        .await
        .unwrap();
    assert_ne!(third.session_id, "never-seen");
}

#[tokio::test]
async fn test_generate_collects_assistant_replies() {
    let plan = r#"{"strategy":"use_tools","reasoning":"r","tools":[
        {"name":"edit_text","parameters":{"original_text":"a","new_text":"b"},"message":"Editing"}
    ],"response_msg":"Let me fix that."}"#;
    let llm = Arc::new(MockLlmClient::with_replies([
        MockReply::Text(plan.into()),
        MockReply::Text("Replaced a with b.".into()),
    ]));
    let manager = manager(llm);
    let reply = manager.generate(user("fix")).await.unwrap();
    assert_eq!(reply, "Let me fix that.\n\nReplaced a with b.");

    let llm = Arc::new(MockLlmClient::with_replies([MockReply::Fail("down".into())]));
    let manager = manager_with(llm, ManagerSettings::default());
    let err = manager.generate(user("fix")).await.unwrap_err();
    assert!(matches!(err, CopilotError::Aborted(msg) if msg.starts_with("Planning failed")));
}

/// 补全时直接 panic 的客户端
struct PanickingLlm;

#[async_trait::async_trait]
impl LlmClient for PanickingLlm {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _model: Option<&str>,
    ) -> Result<String, LlmError> {
        panic!("completion blew up");
    }
}

#[tokio::test]
async fn test_panicking_worker_still_ends_in_error() {
    let manager = CopilotManager::new(
        Arc::new(PanickingLlm),
        Arc::new(SessionStore::default()),
        ManagerSettings::default(),
    );
    let submitted = manager.submit(user("hi")).await.unwrap();

    let events = drain(&manager, &submitted.request_id).await;
    assert_eq!(events, vec![StreamEvent::Error(WORKER_LOST_MESSAGE.into())]);
    let info = manager.status(&submitted.request_id).await.unwrap();
    assert_eq!(info.status, RequestStatus::Error);
    assert_eq!(info.events, 1);
}
