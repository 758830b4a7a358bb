//! End-to-end exchanges against the simulated tools with a scripted model

use std::sync::Arc;
use std::time::Duration;

use astria_core::{
    AgentError, ConversationClient, ConversationStore, FALLBACK_REPLY, Message, MessagePatch,
    ToolProgress, ToolStatus,
    provider::{ModelReply, Part},
    testing::{ScriptedProvider, args},
    tool::ToolInvocation,
};
use astria_tools::{WELCOME_MESSAGE, registry, simulate::SIMULATED_LATENCY};
use serde_json::json;
use tokio::sync::mpsc;

fn client(provider: ScriptedProvider) -> (ConversationClient, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    let client = ConversationClient::with_defaults(provider.clone(), Arc::new(registry()));
    (client, provider)
}

#[tokio::test(start_paused = true)]
async fn weather_in_paris() {
    let script = ScriptedProvider::new()
        .tool_calls(vec![ToolInvocation::new("get_weather", args(json!({"location": "Paris"})))])
        .reply(ModelReply::text("It is mild in Paris today."));
    let (mut client, provider) = client(script);

    let reply = client.send("What's the weather in Paris?").await.unwrap();

    assert!(!reply.text.is_empty());
    assert_eq!(reply.tool_calls.len(), 1);
    let record = &reply.tool_calls[0];
    assert_eq!(record.status(), ToolStatus::Success);
    assert_eq!(record.result().unwrap()["location"], "Paris");

    // Every declaration is advertised with each request
    let requests = provider.requests();
    assert_eq!(
        requests[0].tool_names,
        vec!["send_email", "schedule_meeting", "save_note", "get_weather"]
    );
    match &requests[1].last_turn().unwrap().parts[0] {
        Part::FunctionResponse { name, response, .. } => {
            assert_eq!(name, "get_weather");
            assert_eq!(response["location"], "Paris");
        }
        other => panic!("unexpected part: {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_resolves_placeholder_with_apology() {
    let (mut client, _) = client(ScriptedProvider::new().transport_error("connection refused"));
    let mut store = ConversationStore::new(WELCOME_MESSAGE);

    store.append(Message::user("Hello?"));
    let placeholder = Message::thinking();
    let id = placeholder.id.clone();
    store.append(placeholder);

    let patch = match client.send("Hello?").await {
        Ok(reply) => MessagePatch::resolved(reply),
        Err(e) => {
            assert!(matches!(e, AgentError::Transport(_)));
            MessagePatch::failed(&e)
        }
    };
    store.update(&id, patch);

    let msg = store.get(&id).unwrap();
    assert_eq!(msg.text(), FALLBACK_REPLY);
    assert!(!msg.is_thinking);
    assert_eq!(store.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn two_tools_take_one_delay() {
    let script = ScriptedProvider::new()
        .tool_calls(vec![
            ToolInvocation::new(
                "send_email",
                args(json!({
                    "recipient": "sam@example.com",
                    "subject": "Forecast",
                    "body": "See below"
                })),
            ),
            ToolInvocation::new("get_weather", args(json!({"location": "Oslo"}))),
        ])
        .reply(ModelReply::text("Email sent and weather fetched."));
    let (mut client, _) = client(script);

    let started = tokio::time::Instant::now();
    let reply = client.send("Email Sam the Oslo weather").await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= SIMULATED_LATENCY);
    assert!(elapsed < SIMULATED_LATENCY * 2 - Duration::from_millis(100));
    assert_eq!(reply.tool_calls.len(), 2);
    assert_eq!(reply.tool_calls[0].name(), "send_email");
    assert_eq!(reply.tool_calls[1].name(), "get_weather");
    assert!(reply.tool_calls.iter().all(|r| r.status() == ToolStatus::Success));
}

#[tokio::test(start_paused = true)]
async fn invalid_arguments_fail_only_that_call() {
    let script = ScriptedProvider::new()
        .tool_calls(vec![
            ToolInvocation::new("save_note", args(json!({"title": "No body"}))),
            ToolInvocation::new("get_weather", args(json!({"location": "Lima"}))),
            ToolInvocation::new("launch_rocket", args(json!({}))),
        ])
        .reply(ModelReply::text("Partially done."));
    let (mut client, _) = client(script);

    let reply = client.send("Do three things").await.unwrap();

    assert_eq!(reply.tool_calls[0].status(), ToolStatus::Error);
    assert!(reply.tool_calls[0].error_message().unwrap().contains("content"));
    assert_eq!(reply.tool_calls[1].status(), ToolStatus::Success);
    // Unknown tools produce a structured result instead of failing
    assert_eq!(reply.tool_calls[2].status(), ToolStatus::Success);
    assert_eq!(
        reply.tool_calls[2].result().unwrap()["error"],
        "Tool launch_rocket not found locally."
    );
}

#[tokio::test(start_paused = true)]
async fn placeholder_follows_progress_snapshots() {
    let script = ScriptedProvider::new()
        .tool_calls(vec![ToolInvocation::new("get_weather", args(json!({"location": "Rome"})))])
        .reply(ModelReply::text("Rome looks fine."));
    let (mut client, _) = client(script);
    let mut store = ConversationStore::new(WELCOME_MESSAGE);
    let placeholder = Message::thinking();
    let id = placeholder.id.clone();
    store.append(placeholder);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let reply = client.send_with_progress("Rome?", &tx).await.unwrap();

    let started = rx.try_recv().unwrap();
    assert!(matches!(started, ToolProgress::Started(_)));
    store.update(&id, MessagePatch::progress(started));
    assert_eq!(store.get(&id).unwrap().tool_calls()[0].status(), ToolStatus::Pending);
    assert!(store.get(&id).unwrap().is_thinking);

    let completed = rx.try_recv().unwrap();
    store.update(&id, MessagePatch::progress(completed));
    store.update(&id, MessagePatch::resolved(reply));

    let msg = store.get(&id).unwrap();
    assert!(!msg.is_thinking);
    assert_eq!(msg.text(), "Rome looks fine.");
    assert_eq!(msg.tool_calls()[0].status(), ToolStatus::Success);
}
