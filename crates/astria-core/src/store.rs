//! Conversation State Store
//!
//! Append-only message log owned by the presentation layer. Messages are
//! updated in place by ID as asynchronous results arrive.

use serde::{Deserialize, Serialize};

use crate::client::{ChatReply, ToolProgress};
use crate::error::{AgentError, FALLBACK_REPLY};
use crate::message::{Citation, Message};
use crate::tool::ToolCallRecord;

/// ID of the seeded welcome message
pub const WELCOME_ID: &str = "welcome";

/// Partial update for a message; unset fields are left untouched
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRecord>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
}

impl MessagePatch {
    /// Replace the tool-call snapshot
    pub fn tool_calls(records: Vec<ToolCallRecord>) -> Self {
        Self {
            tool_calls: Some(records),
            ..Self::default()
        }
    }

    /// Apply a progress snapshot
    pub fn progress(progress: ToolProgress) -> Self {
        Self::tool_calls(progress.into_records())
    }

    /// Resolve a placeholder with the final reply
    pub fn resolved(reply: ChatReply) -> Self {
        Self {
            text: Some(reply.text),
            tool_calls: (!reply.tool_calls.is_empty()).then_some(reply.tool_calls),
            citations: Some(reply.citations),
            is_thinking: Some(false),
        }
    }

    /// Resolve a placeholder after a failed exchange
    pub fn failed(error: &AgentError) -> Self {
        tracing::debug!(error = %error, "Resolving placeholder with fallback reply");
        Self {
            text: Some(FALLBACK_REPLY.into()),
            is_thinking: Some(false),
            ..Self::default()
        }
    }

    fn apply(self, message: &mut Message) {
        if let Some(text) = self.text {
            message.text = Some(text);
        }
        if let Some(tool_calls) = self.tool_calls {
            message.tool_calls = Some(tool_calls);
        }
        if let Some(citations) = self.citations {
            message.citations = citations;
        }
        if let Some(is_thinking) = self.is_thinking {
            message.is_thinking = is_thinking;
        }
    }
}

/// Ordered message log seeded with a welcome message
#[derive(Clone, Debug)]
pub struct ConversationStore {
    messages: Vec<Message>,
    welcome: String,
}

impl ConversationStore {
    /// Create a store seeded with the given welcome text
    pub fn new(welcome: impl Into<String>) -> Self {
        let mut store = Self {
            messages: Vec::new(),
            welcome: welcome.into(),
        };
        store.reset();
        store
    }

    /// Add a message to the end of the log
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Merge a patch onto a message. Returns `false` (and changes nothing)
    /// when no message has this ID.
    pub fn update(&mut self, id: &str, patch: MessagePatch) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                patch.apply(message);
                true
            }
            None => {
                tracing::debug!(id, "Update for unknown message ignored");
                false
            }
        }
    }

    /// Discard the log and re-seed the welcome message
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::model(self.welcome.clone()).with_id(WELCOME_ID));
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get a message by ID
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
