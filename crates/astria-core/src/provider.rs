//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for hosted chat-completion backends. The
//! client speaks in provider-neutral [`Turn`]s; each provider owns its
//! wire format.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use astria_core::provider::{LlmProvider, ModelRequest};
//!
//! let reply = provider.complete(ModelRequest {
//!     system_instruction: &prompt,
//!     history: session.history(),
//!     tools: &declarations,
//!     options: &options,
//! }).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::message::Citation;
use crate::tool::{ToolDeclaration, ToolInvocation};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Let the provider ground replies with web search
    #[serde(default = "default_search")]
    pub enable_search: bool,
}

fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2048 }
fn default_top_p() -> f32 { 0.95 }
fn default_search() -> bool { true }

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            enable_search: default_search(),
        }
    }
}

/// Author of a turn in the provider history
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A piece of turn content.
///
/// Model parts may carry an opaque provider `signature` (Gemini's
/// `thoughtSignature`). It must be replayed unchanged with the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    FunctionCall {
        call: ToolInvocation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    FunctionResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        response: Value,
    },
}

impl Part {
    /// Unsigned text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            signature: None,
        }
    }

    /// Unsigned function call part
    pub const fn call(call: ToolInvocation) -> Self {
        Self::FunctionCall { call, signature: None }
    }
}

/// One entry of the dialogue history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    /// User turn with a single text part
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Model turn with a single text part
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Function calls, in the order the model issued them
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall { call, .. } => Some(call.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Other,
}

/// Everything a provider needs to produce the next model turn
#[derive(Clone, Copy, Debug)]
pub struct ModelRequest<'a> {
    pub system_instruction: &'a str,
    /// Prior turns, ending with the turn to answer
    pub history: &'a [Turn],
    pub tools: &'a [ToolDeclaration],
    pub options: &'a GenerationOptions,
}

/// Response from the model
#[derive(Clone, Debug)]
pub struct ModelReply {
    /// The model turn, recorded into the session history verbatim
    pub content: Turn,

    /// Grounding sources attached to the turn
    pub citations: Vec<Citation>,

    pub finish_reason: Option<FinishReason>,

    pub usage: Option<TokenUsage>,
}

impl ModelReply {
    /// Plain text reply with no tool calls
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Turn::model_text(text),
            citations: Vec::new(),
            finish_reason: Some(FinishReason::Stop),
            usage: None,
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new backends. The conversation
/// client works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Fail with `AgentError::Config` if no usable credential is configured
    fn check_credentials(&self) -> Result<()> {
        Ok(())
    }

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Produce the next model turn
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelReply>;
}
