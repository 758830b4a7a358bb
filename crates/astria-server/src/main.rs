//! ASTRIA HTTP Server
//!
//! Axum-based server providing REST API and WebSocket endpoints.
//!
//! Every WebSocket connection is one chat window with its own session and
//! message log. The static directory serves the WASM frontend.

mod handlers;
mod state;
mod tab;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use astria_core::{ClientConfig, LlmProvider, provider::GenerationOptions};
use astria_runtime::GeminiProvider;
use astria_tools::ASTRIA_SYSTEM_PROMPT;

use crate::handlers::{chat_handler, chat_stream_handler, health_check, list_tools};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize LLM provider
    let provider = Arc::new(GeminiProvider::from_env()?);

    if provider.check_credentials().is_err() {
        tracing::warn!("⚠ No Gemini API key - every message will get the fallback reply");
        tracing::warn!("  Set GEMINI_API_KEY in .env");
    } else {
        match provider.health_check().await {
            Ok(true) => tracing::info!("✓ Connected to Gemini"),
            Ok(false) | Err(_) => tracing::warn!("⚠ Gemini not reachable - requests may fail"),
        }
    }

    let generation = generation_from_env();
    tracing::info!(
        model = %generation.model,
        search = generation.enable_search,
        "Generation options"
    );

    // Initialize tools
    let tools = astria_tools::registry();
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Build application state
    let state = AppState {
        provider,
        tools: Arc::new(tools),
        config: ClientConfig {
            system_instruction: ASTRIA_SYSTEM_PROMPT.into(),
            generation,
        },
    };

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 ASTRIA server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /api/tools       - List tool declarations");
    tracing::info!("  POST /api/chat        - One-shot message");
    tracing::info!("  GET  /api/chat/stream - WebSocket chat window");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Build the router
fn app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", get(chat_stream_handler))
        // Static files (WASM frontend)
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GEMINI_MODEL` and `ASTRIA_ENABLE_SEARCH` over the defaults
fn generation_from_env() -> GenerationOptions {
    let mut options = GenerationOptions::default();
    if let Ok(model) = std::env::var("GEMINI_MODEL") {
        if !model.trim().is_empty() {
            options.model = model;
        }
    }
    if let Ok(flag) = std::env::var("ASTRIA_ENABLE_SEARCH") {
        options.enable_search = parse_flag(&flag).unwrap_or(options.enable_search);
    }
    options
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
