//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt, future};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use astria_core::{AgentError, ChatReply, ToolDeclaration};
use astria_tools::WELCOME_MESSAGE;

use crate::state::AppState;
use crate::tab::{self, ServerEvent};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub credentials_configured: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub reply: ChatReply,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
        credentials_configured: state.provider.check_credentials().is_ok(),
        tools: state.tools.names(),
    })
}

/// Declarations of every registered tool
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDeclaration>> {
    Json(state.tools.declarations())
}

/// One-shot chat: a fresh session answers a single message
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message is empty", "EMPTY_MESSAGE"));
    }

    let mut client = state.client();
    let reply = client.send(&payload.message).await.map_err(|e| {
        tracing::error!("Chat error: {}", e);
        let (status, code) = match e {
            AgentError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "CONFIG_ERROR"),
            AgentError::Transport(_) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
        };
        api_error(status, e.user_message(), code)
    })?;

    Ok(Json(ChatResponse {
        reply,
        model: state.config.generation.model.clone(),
    }))
}

/// WebSocket chat window
pub async fn chat_stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Event encoding failed: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let frames = receiver
        .take_while(|msg| {
            future::ready(match msg {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    false
                }
            })
        })
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                _ => None,
            })
        });

    tracing::debug!("Chat window connected");
    tab::serve(frames, state.client(), WELCOME_MESSAGE, &out_tx).await;

    drop(out_tx);
    let _ = writer.await;
    tracing::debug!("Chat window disconnected");
}
