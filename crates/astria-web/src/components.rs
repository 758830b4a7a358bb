//! UI Components

use leptos::prelude::*;

use crate::api::{ChatMessage, Citation, ToolCall};

/// Message bubble component
#[component]
pub fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let class = format!("message message-{}", message.role);
    let time = message.timestamp.format("%H:%M").to_string();
    let text = message.text.clone().filter(|t| !t.is_empty());
    let calls = message.tool_calls.clone().unwrap_or_default();
    let thinking = message.is_thinking && calls.is_empty();
    let citations = message.citations.clone();

    view! {
        <div class=class>
            <span class="role">{message.role.clone()}</span>
            {text.map(|t| view! { <p class="content">{t}</p> })}
            {thinking.then(|| view! { <p class="content thinking">"Thinking..."</p> })}
            <div class="tool-calls">
                {calls.into_iter().map(|call| view! { <ToolCard call=call /> }).collect_view()}
            </div>
            {(!citations.is_empty()).then(|| view! { <Sources citations=citations /> })}
            <span class="time">{time}</span>
        </div>
    }
}

/// Tool call card: name, status badge, arguments and result
#[component]
pub fn ToolCard(call: ToolCall) -> impl IntoView {
    let class = format!("tool-card tool-{}", call.status.class());
    let args = serde_json::to_string_pretty(&call.args).unwrap_or_default();
    let result = call
        .result
        .as_ref()
        .map(|r| serde_json::to_string_pretty(r).unwrap_or_default());

    view! {
        <div class=class data-call-id=call.id.clone()>
            <div class="tool-header">
                <span class="tool-name">{call.name.clone()}</span>
                <span class="tool-status">{call.status.badge()}</span>
            </div>
            <pre class="tool-args">{args}</pre>
            {result.map(|r| view! { <pre class="tool-result">{r}</pre> })}
        </div>
    }
}

#[component]
fn Sources(citations: Vec<Citation>) -> impl IntoView {
    view! {
        <ul class="citations">
            {citations
                .into_iter()
                .map(|c| {
                    let label = c.label().to_string();
                    view! {
                        <li>
                            <a href=c.uri target="_blank" rel="noopener noreferrer">{label}</a>
                        </li>
                    }
                })
                .collect_view()}
        </ul>
    }
}
