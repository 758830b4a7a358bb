//! Conversation Client
//!
//! Runs one exchange per user message: send the text, execute any tools the
//! model asks for, hand the results back, and return the final reply.
//!
//! ```text
//!  user text ──▶ model ──▶ tool calls? ──no──▶ reply
//!                              │
//!                             yes
//!                              ▼
//!                  Started ─▶ run all tools ─▶ Completed
//!                              │
//!                              ▼
//!                  tool results ──▶ model ──▶ reply
//! ```

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{AgentError, Result};
use crate::message::Citation;
use crate::provider::{GenerationOptions, LlmProvider, Part, Turn, TurnRole};
use crate::session::{ConversationSession, SessionId, TurnContext};
use crate::tool::{ToolCallRecord, ToolRegistry};

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. \
Use the available tools when a request needs an external action or data. \
If required input is missing, ask for it. Be concise.";

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// System instruction sent with every turn
    pub system_instruction: String,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.into(),
            generation: GenerationOptions::default(),
        }
    }
}

/// Tool-call snapshots emitted during an exchange
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "tool_calls", rename_all = "snake_case")]
pub enum ToolProgress {
    /// Every record pending, before any tool runs
    Started(Vec<ToolCallRecord>),
    /// Every record terminal, before results go back to the model
    Completed(Vec<ToolCallRecord>),
}

impl ToolProgress {
    pub fn records(&self) -> &[ToolCallRecord] {
        match self {
            Self::Started(records) | Self::Completed(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<ToolCallRecord> {
        match self {
            Self::Started(records) | Self::Completed(records) => records,
        }
    }
}

/// Sending half of a progress stream
pub type ProgressSender = mpsc::UnboundedSender<ToolProgress>;

/// Final result of an exchange
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

/// Owns one conversation session and drives exchanges on it
pub struct ConversationClient {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: ClientConfig,
    session: Option<ConversationSession>,
}

impl ConversationClient {
    /// Create a new client; the session is established on first send
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: ClientConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            session: None,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, ClientConfig::default())
    }

    /// Send a message without observing tool progress
    pub async fn send(&mut self, text: &str) -> Result<ChatReply> {
        self.exchange(text, None).await
    }

    /// Send a message, emitting `Started` and `Completed` snapshots when
    /// the model requests tools
    pub async fn send_with_progress(
        &mut self,
        text: &str,
        progress: &ProgressSender,
    ) -> Result<ChatReply> {
        self.exchange(text, Some(progress)).await
    }

    /// Abandon the current session; the next send starts a fresh one
    pub fn reset(&mut self) {
        if let Some(old) = self.session.take() {
            tracing::info!(session = %old.id, turns = old.len(), "Session abandoned");
        }
    }

    /// Current session, if one has been established
    pub const fn session(&self) -> Option<&ConversationSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|s| &s.id)
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn exchange(
        &mut self,
        text: &str,
        progress: Option<&ProgressSender>,
    ) -> Result<ChatReply> {
        if self.session.is_none() {
            self.provider.check_credentials()?;
            let session = ConversationSession::new();
            tracing::info!(
                session = %session.id,
                provider = self.provider.name(),
                "Session established"
            );
            self.session = Some(session);
        }

        let declarations = self.tools.declarations();
        let context = TurnContext {
            system_instruction: &self.config.system_instruction,
            tools: &declarations,
            options: &self.config.generation,
        };
        let session = self.session.get_or_insert_with(ConversationSession::new);
        let checkpoint = session.len();

        let provider = self.provider.as_ref();
        let result = run_exchange(session, provider, &self.tools, context, text, progress).await;

        if let Err(e) = &result {
            tracing::error!(session = %session.id, error = %e, "Exchange failed");
            session.rollback(checkpoint);
        }
        result
    }
}

async fn run_exchange(
    session: &mut ConversationSession,
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    context: TurnContext<'_>,
    text: &str,
    progress: Option<&ProgressSender>,
) -> Result<ChatReply> {
    let reply = session.send(provider, context, Turn::user_text(text)).await?;

    let invocations = reply.content.invocations();
    if invocations.is_empty() {
        return Ok(ChatReply {
            text: reply.content.text(),
            tool_calls: Vec::new(),
            citations: reply.citations,
        });
    }

    let stamp = Utc::now().timestamp_millis();
    let mut records: Vec<ToolCallRecord> = invocations
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let id = call.id.clone().unwrap_or_else(|| format!("call_{index}_{stamp}"));
            ToolCallRecord::pending(id, call)
        })
        .collect();

    emit(progress, ToolProgress::Started(records.clone()));
    dispatch_all(tools, &mut records).await;
    emit(progress, ToolProgress::Completed(records.clone()));

    let responses = Turn {
        role: TurnRole::User,
        parts: records
            .iter()
            .zip(&invocations)
            .map(|(record, call)| Part::FunctionResponse {
                id: call.id.clone(),
                name: record.name().to_string(),
                response: record.result().cloned().unwrap_or(Value::Null),
            })
            .collect(),
    };

    // One dispatch round per exchange
    let follow_up = session.send(provider, context, responses).await?;
    let ignored = follow_up.content.invocations().len();
    if ignored > 0 {
        tracing::warn!(
            session = %session.id,
            ignored,
            "Follow-up turn requested more tools; ignoring"
        );
        session.discard_unanswered_calls();
    }

    Ok(ChatReply {
        text: follow_up.content.text(),
        tool_calls: records,
        citations: follow_up.citations,
    })
}

/// Run every call concurrently; each settles its own record
async fn dispatch_all(tools: &ToolRegistry, records: &mut [ToolCallRecord]) {
    let outcomes = join_all(records.iter().map(|record| {
        tracing::debug!(tool = %record.name(), id = %record.id(), "Executing tool");
        tools.execute(record.name(), record.args())
    }))
    .await;

    for (record, outcome) in records.iter_mut().zip(outcomes) {
        let settled = match outcome {
            Ok(result) => record.succeed(result),
            Err(e) => {
                tracing::warn!(tool = %record.name(), id = %record.id(), error = %e, "Tool failed");
                record.fail(e.to_string())
            }
        };
        if let Err(e) = settled {
            tracing::warn!(id = %record.id(), error = %e, "Tool call settled twice");
        }
    }
}

fn emit(progress: Option<&ProgressSender>, event: ToolProgress) {
    if let Some(tx) = progress {
        if tx.send(event).is_err() {
            tracing::debug!("Progress receiver dropped");
        }
    }
}

/// Builder for client configuration
pub struct ConversationClientBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: ClientConfig,
}

impl Default for ConversationClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationClientBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: ClientConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = instruction.into();
        self
    }

    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn build(self) -> Result<ConversationClient> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(ConversationClient::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ModelReply;
    use crate::testing::{ScriptedProvider, args};
    use crate::tool::{
        ParamType, ParameterSchema, Tool, ToolArgs, ToolDeclaration, ToolInvocation, ToolStatus,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct SlowTool {
        name: &'static str,
        delay_ms: u64,
        fail: bool,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration {
                name: self.name.into(),
                description: "test tool".into(),
                parameters: vec![ParameterSchema::optional("input", ParamType::String, "input")],
            }
        }

        async fn execute(&self, args: &ToolArgs) -> Result<Value> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.fail {
                return Err(AgentError::ToolExecution(format!("{} is down", self.name)));
            }
            Ok(json!({ "tool": self.name, "input": args.get("input") }))
        }
    }

    fn client(
        provider: ScriptedProvider,
        tools: Vec<SlowTool>,
    ) -> (ConversationClient, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        let client = ConversationClient::with_defaults(provider.clone(), Arc::new(registry));
        (client, provider)
    }

    fn tool(name: &'static str, delay_ms: u64, fail: bool) -> SlowTool {
        SlowTool { name, delay_ms, fail }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ToolProgress>) -> Vec<ToolProgress> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_text_only_reply_emits_no_progress() {
        let script = ScriptedProvider::new().reply(ModelReply::text("Hello there"));
        let (mut client, provider) = client(script, vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let reply = client.send_with_progress("Hi", &tx).await.unwrap();

        assert_eq!(reply.text, "Hello there");
        assert!(reply.tool_calls.is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_records_keep_request_order() {
        let script = ScriptedProvider::new()
            .tool_calls(vec![
                ToolInvocation::new("slow", args(json!({"input": "a"}))),
                ToolInvocation::new("fast", args(json!({"input": "b"}))),
                ToolInvocation::new("slow", args(json!({"input": "c"}))),
            ])
            .reply(ModelReply::text("Done"));
        let (mut client, _) = client(script, vec![tool("slow", 30, false), tool("fast", 1, false)]);

        let reply = client.send("go").await.unwrap();

        let names: Vec<&str> = reply.tool_calls.iter().map(ToolCallRecord::name).collect();
        assert_eq!(names, vec!["slow", "fast", "slow"]);
        assert!(reply.tool_calls.iter().all(|r| r.status() == ToolStatus::Success));
        assert_eq!(reply.tool_calls[2].result().unwrap()["input"], "c");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let script = ScriptedProvider::new()
            .tool_calls(vec![
                ToolInvocation::new("broken", ToolArgs::new()),
                ToolInvocation::new("working", ToolArgs::new()),
            ])
            .reply(ModelReply::text("One of them failed"));
        let (mut client, provider) =
            client(script, vec![tool("broken", 5, true), tool("working", 10, false)]);

        let reply = client.send("both").await.unwrap();

        assert_eq!(reply.tool_calls[0].status(), ToolStatus::Error);
        assert_eq!(
            reply.tool_calls[0].error_message(),
            Some("Tool execution error: broken is down")
        );
        assert_eq!(reply.tool_calls[1].status(), ToolStatus::Success);
        assert_eq!(reply.text, "One of them failed");

        // Both outcomes go back to the model in one follow-up turn
        let requests = provider.requests();
        let follow_up = requests[1].last_turn().unwrap();
        assert_eq!(follow_up.role, TurnRole::User);
        assert_eq!(follow_up.parts.len(), 2);
        match &follow_up.parts[0] {
            Part::FunctionResponse { name, response, .. } => {
                assert_eq!(name, "broken");
                assert!(response.get("error").is_some());
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_started_precedes_completed() {
        let script = ScriptedProvider::new()
            .tool_calls(vec![
                ToolInvocation::new("a", ToolArgs::new()).with_id("fc-1"),
                ToolInvocation::new("b", ToolArgs::new()),
            ])
            .reply(ModelReply::text("ok"));
        let (mut client, _) = client(script, vec![tool("a", 1, false), tool("b", 1, true)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        client.send_with_progress("run", &tx).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        let ToolProgress::Started(started) = &events[0] else {
            panic!("expected Started first");
        };
        let ToolProgress::Completed(completed) = &events[1] else {
            panic!("expected Completed second");
        };
        assert!(started.iter().all(|r| r.status() == ToolStatus::Pending));
        assert!(completed.iter().all(ToolCallRecord::is_terminal));
        assert_eq!(started[0].id(), "fc-1");
        assert!(started[1].id().starts_with("call_1_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tools_run_concurrently() {
        let script = ScriptedProvider::new()
            .tool_calls(vec![
                ToolInvocation::new("a", ToolArgs::new()),
                ToolInvocation::new("b", ToolArgs::new()),
            ])
            .reply(ModelReply::text("ok"));
        let (mut client, _) = client(script, vec![tool("a", 1500, false), tool("b", 1500, false)]);

        let started = tokio::time::Instant::now();
        client.send("both").await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_transport_failure_rolls_back_session() {
        let script = ScriptedProvider::new()
            .tool_calls(vec![ToolInvocation::new("a", ToolArgs::new())])
            .transport_error("503 Service Unavailable")
            .reply(ModelReply::text("recovered"));
        let (mut client, provider) = client(script, vec![tool("a", 1, false)]);

        let err = client.send("first").await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
        assert_eq!(client.session().map(ConversationSession::len), Some(0));

        let reply = client.send("second").await.unwrap();
        assert_eq!(reply.text, "recovered");
        let last = provider.requests().pop().unwrap();
        assert_eq!(last.history.len(), 1);
    }

    #[tokio::test]
    async fn test_second_round_of_calls_not_replayed() {
        let script = ScriptedProvider::new()
            .tool_calls(vec![ToolInvocation::new("a", ToolArgs::new())])
            .tool_calls(vec![ToolInvocation::new("b", ToolArgs::new())])
            .reply(ModelReply::text("next"));
        let (mut client, provider) = client(script, vec![tool("a", 1, false), tool("b", 1, false)]);

        let reply = client.send("first").await.unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name(), "a");

        client.send("second").await.unwrap();

        // user, model(call a), user(response a), then the new user turn
        let history = provider.requests().pop().unwrap().history;
        assert_eq!(history.len(), 4);
        let unanswered: Vec<String> = history
            .iter()
            .flat_map(Turn::invocations)
            .map(|call| call.name)
            .collect();
        assert_eq!(unanswered, vec!["a"]);
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let (mut client, provider) = client(ScriptedProvider::new().without_credentials(), vec![]);

        let err = client.send("Hi").await.unwrap_err();

        assert!(matches!(err, AgentError::Config(_)));
        assert!(client.session().is_none());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reset_starts_new_session() {
        let script = ScriptedProvider::new()
            .reply(ModelReply::text("one"))
            .reply(ModelReply::text("two"));
        let (mut client, provider) = client(script, vec![]);

        client.send("a").await.unwrap();
        let first = client.session_id().cloned().unwrap();
        client.reset();
        assert!(client.session().is_none());

        client.send("b").await.unwrap();
        assert_ne!(client.session_id().cloned().unwrap(), first);
        assert_eq!(provider.requests()[1].history.len(), 1);
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(
            ConversationClientBuilder::new().build(),
            Err(AgentError::Config(_))
        ));
    }
}
