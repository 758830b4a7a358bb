//! Conversation Messages
//!
//! The message log shown to the user. Each message may carry tool-call
//! records and citations, and a transient "thinking" flag while its reply
//! is still in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolCallRecord;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input
    User,
    /// Model (assistant) response
    Model,
    /// System notice
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Source reference attached to a reply
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Citation {
    pub fn new(uri: impl Into<String>, title: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            title,
        }
    }

    /// Title if present, otherwise the URI
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.uri)
    }
}

/// A single message in the conversation log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, opaque identifier
    pub id: String,

    /// Message role
    pub role: Role,

    /// Display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Tool calls made while producing this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRecord>>,

    /// Grounding sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Set on the placeholder while a reply is in flight
    #[serde(default)]
    pub is_thinking: bool,
}

impl Message {
    /// Create a new message with a fresh ID
    pub fn new(role: Role, text: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text,
            tool_calls: None,
            citations: Vec::new(),
            timestamp: Utc::now(),
            is_thinking: false,
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Some(text.into()))
    }

    /// Create a model message
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, Some(text.into()))
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Some(text.into()))
    }

    /// Placeholder model message shown while a reply is pending
    pub fn thinking() -> Self {
        let mut msg = Self::new(Role::Model, None);
        msg.is_thinking = true;
        msg
    }

    /// Replace the generated ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Text or an empty string
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Tool calls or an empty slice
    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}
