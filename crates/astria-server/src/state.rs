//! Application State

use std::sync::Arc;

use astria_core::{ClientConfig, ConversationClient, LlmProvider, ToolRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Model provider (Gemini, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Tool registry with all available tools
    pub tools: Arc<ToolRegistry>,

    /// Client configuration applied to every new conversation
    pub config: ClientConfig,
}

impl AppState {
    /// A fresh client with no session yet
    pub fn client(&self) -> ConversationClient {
        ConversationClient::new(self.provider.clone(), self.tools.clone(), self.config.clone())
    }
}
