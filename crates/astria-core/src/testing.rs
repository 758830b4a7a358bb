//! Scripted provider for tests
//!
//! Replays a fixed queue of replies and records every request it receives.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::provider::{LlmProvider, ModelReply, ModelRequest, Part, Turn, TurnRole};
use crate::tool::{ToolArgs, ToolInvocation};

/// A request as seen by the scripted provider
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub system_instruction: String,
    pub history: Vec<Turn>,
    pub tool_names: Vec<String>,
}

impl RecordedRequest {
    /// The turn the model was asked to answer
    pub fn last_turn(&self) -> Option<&Turn> {
        self.history.last()
    }
}

enum Step {
    Reply(ModelReply),
    Fail(String),
}

/// In-memory provider driven by a script
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RecordedRequest>>,
    credentials: bool,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            credentials: true,
        }
    }

    /// Queue a reply
    pub fn reply(self, reply: ModelReply) -> Self {
        self.push(Step::Reply(reply));
        self
    }

    /// Queue a model turn that requests the given tool calls
    pub fn tool_calls(self, calls: Vec<ToolInvocation>) -> Self {
        let content = Turn {
            role: TurnRole::Model,
            parts: calls.into_iter().map(Part::call).collect(),
        };
        self.reply(ModelReply {
            content,
            citations: Vec::new(),
            finish_reason: Some(crate::provider::FinishReason::ToolUse),
            usage: None,
        })
    }

    /// Queue a transport failure
    pub fn transport_error(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()));
        self
    }

    /// Report missing credentials from `check_credentials`
    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, step: Step) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn check_credentials(&self) -> Result<()> {
        if self.credentials {
            Ok(())
        } else {
            Err(AgentError::Config("API key not found".into()))
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelReply> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                system_instruction: request.system_instruction.to_string(),
                history: request.history.to_vec(),
                tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            });

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(message)) => Err(AgentError::Transport(message)),
            None => Err(AgentError::Transport("script exhausted".into())),
        }
    }
}

/// Build an argument map from a JSON object literal
pub fn args(value: serde_json::Value) -> ToolArgs {
    match value {
        serde_json::Value::Object(map) => map,
        _ => ToolArgs::new(),
    }
}
