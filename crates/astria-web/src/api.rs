//! API Client
//!
//! Wire types mirror what the server serializes; the socket carries
//! `ClientCommand`s up and `ServerEvent`s down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wasm_bindgen::{JsCast, prelude::Closure};
use web_sys::{MessageEvent, WebSocket};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Success,
    Error,
}

impl ToolStatus {
    /// Badge text on a tool card
    pub const fn badge(self) -> &'static str {
        match self {
            Self::Pending => "RUNNING",
            Self::Success => "DONE",
            Self::Error => "FAILED",
        }
    }

    pub const fn class(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub result: Option<Value>,
    pub status: ToolStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Citation {
    pub fn label(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(&self.uri)
    }
}

/// Chat message for display
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_thinking: bool,
}

impl ChatMessage {
    /// Changes whenever anything the bubble renders changes
    pub fn render_key(&self) -> String {
        let statuses: String = self
            .tool_calls
            .iter()
            .flatten()
            .map(|call| call.status.class())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}|{}|{}|{}|{}",
            self.id,
            self.is_thinking,
            self.text.as_deref().map_or(0, str::len),
            statuses,
            self.citations.len()
        )
    }
}

/// Pushed by the server
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Snapshot { messages: Vec<ChatMessage>, busy: bool },
    Error { error: String },
}

/// Sent to the server
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Send { text: String },
    Reset,
}

/// Capability advertised by the server
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

fn location() -> Result<web_sys::Location, String> {
    web_sys::window()
        .map(|w| w.location())
        .ok_or_else(|| "No window".to_string())
}

fn origin() -> String {
    location()
        .and_then(|l| l.origin().map_err(|_| "No origin".to_string()))
        .unwrap_or_else(|_| "http://localhost:3000".into())
}

/// `ws://` or `wss://` URL of the chat stream on the serving host
fn stream_url() -> Result<String, String> {
    let location = location()?;
    let protocol = location.protocol().map_err(|_| "No protocol".to_string())?;
    let host = location.host().map_err(|_| "No host".to_string())?;
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    Ok(format!("{scheme}://{host}/api/chat/stream"))
}

/// Open the chat socket. Undecodable frames surface as `ServerEvent::Error`.
pub fn connect(
    mut on_event: impl FnMut(ServerEvent) + 'static,
    mut on_close: impl FnMut() + 'static,
) -> Result<WebSocket, String> {
    let ws = WebSocket::new(&stream_url()?).map_err(|_| "Could not open connection".to_string())?;

    let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
        let Some(text) = ev.data().as_string() else {
            return;
        };
        match serde_json::from_str::<ServerEvent>(&text) {
            Ok(event) => on_event(event),
            Err(e) => on_event(ServerEvent::Error { error: e.to_string() }),
        }
    });
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    let onclose = Closure::<dyn FnMut()>::new(move || on_close());
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    Ok(ws)
}

pub fn send_command(ws: &WebSocket, command: &ClientCommand) -> Result<(), String> {
    if ws.ready_state() != WebSocket::OPEN {
        return Err("Not connected".into());
    }
    let text = serde_json::to_string(command).map_err(|e| e.to_string())?;
    ws.send_with_str(&text).map_err(|_| "Send failed".to_string())
}

/// Fetch the tool declarations
pub async fn fetch_tools() -> Result<Vec<ToolInfo>, String> {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/tools", origin()))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        Err("Failed to load tools".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_decodes() {
        let raw = r#"{
            "type": "snapshot",
            "busy": true,
            "messages": [
                {"id": "welcome", "role": "model", "text": "Hi", "timestamp": "2024-05-01T10:00:00Z", "is_thinking": false},
                {"id": "m2", "role": "model", "timestamp": "2024-05-01T10:00:01Z", "is_thinking": true,
                 "tool_calls": [{"id": "call_0_1", "name": "get_weather", "args": {"location": "Paris"}, "status": "pending"}]}
            ]
        }"#;

        let ServerEvent::Snapshot { messages, busy } = serde_json::from_str(raw).unwrap() else {
            panic!("expected snapshot");
        };
        assert!(busy);
        assert_eq!(messages.len(), 2);
        let calls = messages[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].status.badge(), "RUNNING");
        assert!(calls[0].result.is_none());
    }

    #[test]
    fn test_render_key_tracks_status() {
        let mut message: ChatMessage = serde_json::from_value(serde_json::json!({
            "id": "m1", "role": "model", "timestamp": "2024-05-01T10:00:00Z",
            "tool_calls": [{"id": "c", "name": "save_note", "args": {}, "status": "pending"}]
        }))
        .unwrap();
        let before = message.render_key();

        if let Some(calls) = message.tool_calls.as_mut() {
            calls[0].status = ToolStatus::Success;
        }
        assert_ne!(before, message.render_key());
    }

    #[test]
    fn test_command_encoding() {
        let send = serde_json::to_value(ClientCommand::Send { text: "hi".into() }).unwrap();
        assert_eq!(send, serde_json::json!({"type": "send", "text": "hi"}));
        let reset = serde_json::to_value(ClientCommand::Reset).unwrap();
        assert_eq!(reset, serde_json::json!({"type": "reset"}));
    }

    #[test]
    fn test_citation_label() {
        let bare = Citation { uri: "https://a.example".into(), title: None };
        assert_eq!(bare.label(), "https://a.example");
    }
}
