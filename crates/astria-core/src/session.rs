//! Session Management
//!
//! A conversation session holds the dialogue history sent to the provider
//! with each turn. It is owned by the conversation client and replaced, not
//! closed, when the conversation is reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::provider::{
    FinishReason, GenerationOptions, LlmProvider, ModelReply, ModelRequest, Part, Turn, TurnRole,
};
use crate::tool::ToolDeclaration;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed request context sent with every turn
#[derive(Clone, Copy, Debug)]
pub struct TurnContext<'a> {
    pub system_instruction: &'a str,
    pub tools: &'a [ToolDeclaration],
    pub options: &'a GenerationOptions,
}

/// Dialogue history with one provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Unique identifier
    pub id: SessionId,

    history: Vec<Turn>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create a new, empty session
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Turns exchanged so far
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Number of turns in the history
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Submit a turn and record the model's reply.
    ///
    /// On failure the submitted turn is removed again, leaving the history
    /// as it was before the call.
    pub async fn send(
        &mut self,
        provider: &dyn LlmProvider,
        context: TurnContext<'_>,
        turn: Turn,
    ) -> Result<ModelReply> {
        self.history.push(turn);

        let request = ModelRequest {
            system_instruction: context.system_instruction,
            history: &self.history,
            tools: context.tools,
            options: context.options,
        };

        match provider.complete(request).await {
            Ok(reply) => {
                if let Some(usage) = &reply.usage {
                    tracing::debug!(
                        session = %self.id,
                        prompt = usage.prompt_tokens,
                        completion = usage.completion_tokens,
                        total = usage.total_tokens,
                        "Token usage"
                    );
                }
                if reply.finish_reason == Some(FinishReason::ContentFilter) {
                    tracing::warn!(session = %self.id, "Reply stopped by content filter");
                }
                self.history.push(reply.content.clone());
                self.touch();
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Drop every turn after the first `len`
    pub fn rollback(&mut self, len: usize) {
        if len < self.history.len() {
            tracing::debug!(
                session = %self.id,
                from = self.history.len(),
                to = len,
                "Rolling back session history"
            );
            self.history.truncate(len);
            self.touch();
        }
    }

    /// Strip function calls from a trailing model turn. Those calls will
    /// never be answered, and a call without a response must not be
    /// replayed. A turn left with no parts is removed.
    pub fn discard_unanswered_calls(&mut self) {
        let Some(last) = self.history.last_mut() else {
            return;
        };
        if last.role != TurnRole::Model {
            return;
        }
        last.parts.retain(|part| !matches!(part, Part::FunctionCall { .. }));
        if last.parts.is_empty() {
            self.history.pop();
        }
        self.touch();
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
