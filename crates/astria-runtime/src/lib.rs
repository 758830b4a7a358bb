//! # astria-runtime
//!
//! Runtime providers for the ASTRIA agent.
//!
//! ## Providers
//!
//! - **Gemini** (default): Google Gemini `generateContent` over HTTPS,
//!   with native function calling and optional search grounding
//!
//! ## Usage
//!
//! ```rust,ignore
//! use astria_runtime::GeminiProvider;
//!
//! let provider = GeminiProvider::from_env()?;
//! let client = ConversationClientBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tools(astria_tools::registry())
//!     .build()?;
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

// Re-export core types for convenience
pub use astria_core::{
    AgentError, ChatReply, ConversationClient, LlmProvider, Message, Result, Role, ToolRegistry,
};
