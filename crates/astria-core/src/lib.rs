//! # astria-core
//!
//! Conversation orchestration for a tool-calling chat agent.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ConversationClient                        │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Conversation│  │    Tool     │  │    LlmProvider      │  │
//! │  │   Session   │──│  Registry   │──│    (Strategy)       │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!            │ ToolProgress / ChatReply
//!            ▼
//!   ConversationStore (message log owned by the presentation layer)
//! ```
//!
//! The `LlmProvider` trait keeps the client independent of any one
//! hosted model API.

pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod store;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{
    ChatReply, ClientConfig, ConversationClient, ConversationClientBuilder, ToolProgress,
};
pub use error::{AgentError, FALLBACK_REPLY, Result};
pub use message::{Citation, Message, Role};
pub use provider::LlmProvider;
pub use session::ConversationSession;
pub use store::{ConversationStore, MessagePatch};
pub use tool::{Tool, ToolCallRecord, ToolDeclaration, ToolInvocation, ToolRegistry, ToolStatus};
