//! Integration tests for the query endpoint
//!
//! The router runs against a scripted assistant backend and the real tool
//! dispatcher.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use navigator_core::testing::ScriptedBackend;
use navigator_core::{
    Backoff, ConversationSession, MessagePart, PollPolicy, RunSnapshot, RunState, ThreadMessage,
    ToolCallRequest,
};
use navigator_gateway::{router, AppState, Backend};
use navigator_tools::Dispatcher;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        backoff: Backoff::Fixed,
        max_polls: 5,
        deadline: None,
        transport_retries: 1,
    }
}

// Default conversation plus two keyed ones
const MAX_CONVERSATIONS: usize = 3;

fn create_test_app(backend: Arc<ScriptedBackend>) -> Router {
    let session = ConversationSession {
        assistant_id: "asst_1".into(),
        thread_id: "thread_default".into(),
    };
    let backend: Backend = backend;
    let tools = Arc::new(Dispatcher::builtin().unwrap());
    router(AppState::new(backend, tools, session, policy(), MAX_CONVERSATIONS))
}

fn post_query(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/ai")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_missing_query_is_rejected_without_remote_calls() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = create_test_app(backend.clone());

    let response = app.oneshot(post_query(r#"{"text":"hi"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "message": "query is required" }));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_empty_or_unparsable_body_is_rejected() {
    let backend = Arc::new(ScriptedBackend::new());

    for body in [r#"{"query":""}"#, "not json", r#"{"query":42}"#] {
        let response = create_test_app(backend.clone())
            .oneshot(post_query(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_dark_mode_query_runs_tool_and_returns_text() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_status(
        RunSnapshot::new("run_1", RunState::RequiresAction).with_tool_calls(vec![
            ToolCallRequest::from_raw_arguments("call_theme", "updateUserPreferences", r#"{"theme":"dark"}"#),
        ]),
    );
    backend.push_status(RunSnapshot::new("run_1", RunState::InProgress));
    backend.push_status(RunSnapshot::new("run_1", RunState::Completed));
    backend.push_message(ThreadMessage {
        id: "msg_1".into(),
        role: "assistant".into(),
        parts: vec![MessagePart::Text(
            r#"{"action":"MODIFY_SETTINGS","parameters":{"theme":"dark"}}"#.into(),
        )],
    });

    let app = create_test_app(backend.clone());
    let response = app
        .oneshot(post_query(r#"{"query":"Switch to dark mode"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    let text = reply.as_str().expect("reply should be a bare JSON string");
    assert!(text.contains("MODIFY_SETTINGS"));

    assert_eq!(backend.user_messages(), ["Switch to dark mode"]);
    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].len(), 1);
    assert_eq!(submissions[0][0].call_id, "call_theme");
    let output: Value = serde_json::from_str(&submissions[0][0].output).unwrap();
    assert_eq!(output["success"], true);
    assert!(output["message"].as_str().unwrap().contains("dark"));
}

#[tokio::test]
async fn test_mixed_batch_keeps_every_call_id() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_status(
        RunSnapshot::new("run_1", RunState::RequiresAction).with_tool_calls(vec![
            ToolCallRequest::new("abc123", "navigateTo", json!({ "route": "/contents" })),
            ToolCallRequest::new("unk1", "launchRockets", json!({})),
            ToolCallRequest::from_raw_arguments("bad1", "navigateTo", "{route"),
        ]),
    );
    backend.push_status(RunSnapshot::new("run_1", RunState::Completed));
    backend.push_message(ThreadMessage {
        id: "msg_1".into(),
        role: "assistant".into(),
        parts: vec![MessagePart::Text("Opened your content list.".into())],
    });

    let response = create_test_app(backend.clone())
        .oneshot(post_query(r#"{"query":"show my posts"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let batch = &backend.submissions()[0];
    let ids: Vec<_> = batch.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, ["abc123", "unk1", "bad1"]);
    assert_eq!(batch[0].output, "Navigated to /contents");
    assert_eq!(
        serde_json::from_str::<Value>(&batch[1].output).unwrap(),
        json!({ "success": false, "message": "Unknown tool" })
    );
    assert!(batch[2].output.contains("Invalid arguments"));
}

#[tokio::test]
async fn test_conversation_key_opens_separate_thread() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.repeat_status(RunSnapshot::new("run_1", RunState::Completed));
    backend.push_message(ThreadMessage {
        id: "msg_1".into(),
        role: "assistant".into(),
        parts: vec![MessagePart::Text("hi".into())],
    });

    let app = create_test_app(backend.clone());
    let response = app
        .clone()
        .oneshot(post_query(r#"{"query":"hello","conversation":"tab-1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.thread_calls(), 1);

    let response = app
        .oneshot(post_query(r#"{"query":"hello again","conversation":"tab-1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.thread_calls(), 1);
}

#[tokio::test]
async fn test_conversation_limit_maps_to_too_many_requests() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.repeat_status(RunSnapshot::new("run_1", RunState::Completed));
    backend.push_message(ThreadMessage {
        id: "msg_1".into(),
        role: "assistant".into(),
        parts: vec![MessagePart::Text("hi".into())],
    });

    let app = create_test_app(backend.clone());
    for key in ["tab-1", "tab-2"] {
        let body = json!({ "query": "hello", "conversation": key }).to_string();
        let response = app.clone().oneshot(post_query(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "conversation: {key}");
    }

    let response = app
        .clone()
        .oneshot(post_query(r#"{"query":"hello","conversation":"tab-3"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("conversation limit"));
    assert_eq!(backend.thread_calls(), 2);

    // Existing conversations keep working
    let response = app
        .oneshot(post_query(r#"{"query":"still here","conversation":"tab-1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stalled_run_maps_to_gateway_timeout() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.repeat_status(RunSnapshot::new("run_1", RunState::InProgress));

    let response = create_test_app(backend.clone())
        .oneshot(post_query(r#"{"query":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("did not complete"));
    assert_eq!(backend.retrieve_calls(), 5);
    // The stalled run is cancelled so the thread accepts the next query
    assert_eq!(backend.cancelled_runs(), ["run_1"]);
}

#[tokio::test]
async fn test_image_only_reply_maps_to_bad_gateway() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_status(RunSnapshot::new("run_1", RunState::Completed));
    backend.push_message(ThreadMessage {
        id: "msg_img".into(),
        role: "assistant".into(),
        parts: vec![MessagePart::NonText("image_file".into())],
    });

    let response = create_test_app(backend)
        .oneshot(post_query(r#"{"query":"draw me a chart"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("no text content"));
}

#[tokio::test]
async fn test_greeting_and_health() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = create_test_app(backend);

    for uri in ["/api", "/health"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
    }
}
