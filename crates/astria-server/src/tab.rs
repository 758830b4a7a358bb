//! Chat Tab
//!
//! One connected chat window: a conversation client and the message log it
//! renders. A turn appends the user message and a thinking placeholder,
//! then reconciles the placeholder as tool snapshots and the final reply
//! arrive. Every change is published as a full snapshot.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use astria_core::{ConversationClient, ConversationStore, Message, MessagePatch};

/// Commands sent by the browser
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Send { text: String },
    Reset,
}

/// Events pushed to the browser
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Snapshot { messages: Vec<Message>, busy: bool },
    Error { error: String },
}

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

pub struct ChatTab {
    client: ConversationClient,
    store: ConversationStore,
}

impl ChatTab {
    pub fn new(client: ConversationClient, welcome: &str) -> Self {
        Self {
            client,
            store: ConversationStore::new(welcome),
        }
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Push the current log
    pub fn publish(&self, out: &EventSender, busy: bool) {
        publish(&self.store, out, busy);
    }

    /// Start over: new session, log back to the welcome message
    pub fn reset(&mut self, out: &EventSender) {
        self.client.reset();
        self.store.reset();
        self.publish(out, false);
    }

    /// Run one user turn to completion. Blank input is ignored.
    pub async fn run_turn(&mut self, text: &str, out: &EventSender) {
        if text.trim().is_empty() {
            return;
        }

        let Self { client, store } = self;

        store.append(Message::user(text));
        let placeholder = Message::thinking();
        let id = placeholder.id.clone();
        store.append(placeholder);
        publish(store, out, true);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = {
            let exchange = client.send_with_progress(text, &tx);
            tokio::pin!(exchange);

            loop {
                tokio::select! {
                    biased;
                    Some(progress) = rx.recv() => {
                        store.update(&id, MessagePatch::progress(progress));
                        publish(store, out, true);
                    }
                    outcome = &mut exchange => break outcome,
                }
            }
        };

        while let Ok(progress) = rx.try_recv() {
            store.update(&id, MessagePatch::progress(progress));
        }

        let patch = match outcome {
            Ok(reply) => MessagePatch::resolved(reply),
            Err(e) => {
                tracing::warn!(error = %e, "Turn failed");
                MessagePatch::failed(&e)
            }
        };
        store.update(&id, patch);
        publish(store, out, false);
    }
}

/// Drive one chat window from its incoming text frames until they end.
///
/// The welcome snapshot goes out first. Each frame is one command; a frame
/// that is not a valid command gets an error event. The next frame is not
/// read until the current turn finishes.
pub async fn serve<S>(frames: S, client: ConversationClient, welcome: &str, out: &EventSender)
where
    S: Stream<Item = String>,
{
    let mut tab = ChatTab::new(client, welcome);
    tab.publish(out, false);

    futures::pin_mut!(frames);
    while let Some(frame) = frames.next().await {
        match serde_json::from_str::<ClientCommand>(&frame) {
            Ok(ClientCommand::Send { text }) => tab.run_turn(&text, out).await,
            Ok(ClientCommand::Reset) => tab.reset(out),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected command");
                if out.send(ServerEvent::Error { error: e.to_string() }).is_err() {
                    break;
                }
            }
        }
    }
}

fn publish(store: &ConversationStore, out: &EventSender, busy: bool) {
    let event = ServerEvent::Snapshot {
        messages: store.messages().to_vec(),
        busy,
    };
    if out.send(event).is_err() {
        tracing::debug!("Snapshot dropped; connection closed");
    }
}
