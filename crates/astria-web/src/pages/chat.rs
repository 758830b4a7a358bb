//! Chat Page

use leptos::prelude::*;

use crate::api::{self, ClientCommand, ServerEvent};
use crate::components::MessageBubble;

#[component]
pub fn ChatPage() -> impl IntoView {
    let (messages, set_messages) = signal(Vec::<api::ChatMessage>::new());
    let (input, set_input) = signal(String::new());
    let (busy, set_busy) = signal(false);
    let (connected, set_connected) = signal(false);
    let (error, set_error) = signal(None::<String>);
    let (tools, set_tools) = signal(Vec::<api::ToolInfo>::new());

    let socket = api::connect(
        move |event| match event {
            ServerEvent::Snapshot { messages, busy } => {
                set_messages.set(messages);
                set_busy.set(busy);
                set_connected.set(true);
            }
            ServerEvent::Error { error } => set_error.set(Some(error)),
        },
        move || {
            set_connected.set(false);
            set_busy.set(false);
        },
    );
    let socket = StoredValue::new_local(match socket {
        Ok(ws) => Some(ws),
        Err(e) => {
            set_error.set(Some(e));
            None
        }
    });

    leptos::task::spawn_local(async move {
        match api::fetch_tools().await {
            Ok(list) => set_tools.set(list),
            Err(e) => set_error.set(Some(e)),
        }
    });

    let dispatch = move |command: ClientCommand| {
        let result = socket.with_value(|ws| match ws {
            Some(ws) => api::send_command(ws, &command),
            None => Err("Not connected".into()),
        });
        match result {
            Ok(()) => {
                set_error.set(None);
                true
            }
            Err(e) => {
                set_error.set(Some(e));
                false
            }
        }
    };

    let send = move || {
        let text = input.get();
        if text.trim().is_empty() || busy.get() {
            return;
        }
        if dispatch(ClientCommand::Send { text }) {
            set_input.set(String::new());
        }
    };

    let reset = move |_| {
        dispatch(ClientCommand::Reset);
    };

    view! {
        <div class="chat">
            <aside class="sidebar">
                <h1>"ASTRIA"</h1>
                <p class="status">
                    {move || if connected.get() { "● Online" } else { "○ Offline" }}
                </p>
                <button class="btn" on:click=reset disabled=move || busy.get()>
                    "New Session"
                </button>

                <h2>"Capabilities"</h2>
                <ul class="capabilities">
                    <For
                        each=move || tools.get()
                        key=|tool| tool.name.clone()
                        children=move |tool| {
                            view! {
                                <li>
                                    <strong>{tool.name}</strong>
                                    <span>{tool.description}</span>
                                </li>
                            }
                        }
                    />
                    <li>
                        <strong>"web_search"</strong>
                        <span>"Grounded answers with cited sources"</span>
                    </li>
                </ul>
            </aside>

            <main class="chat-main">
                <div class="messages">
                    <For
                        each=move || messages.get()
                        key=api::ChatMessage::render_key
                        children=move |msg| view! { <MessageBubble message=msg /> }
                    />
                </div>

                {move || error.get().map(|e| view! { <div class="error">{e}</div> })}

                <div class="input-area">
                    <textarea
                        placeholder="Ask ASTRIA to email, schedule, note or look something up..."
                        prop:value=move || input.get()
                        disabled=move || busy.get()
                        on:input=move |ev| set_input.set(event_target_value(&ev))
                        on:keydown=move |ev| {
                            if ev.key() == "Enter" && !ev.shift_key() {
                                ev.prevent_default();
                                send();
                            }
                        }
                    />
                    <button
                        on:click=move |_| send()
                        disabled=move || busy.get() || input.get().trim().is_empty()
                    >
                        {move || if busy.get() { "..." } else { "Send" }}
                    </button>
                </div>
            </main>
        </div>
    }
}
