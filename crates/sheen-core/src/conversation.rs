//! Ordered, append-only transcript of a session.
//!
//! Three windows read from the same log and must stay independent:
//! [`CONTEXT_WINDOW`] entries go upstream with each chat turn, [`REPLAY_WINDOW`]
//! entries are shown when a session is restored, and [`RETENTION_LIMIT`] entries
//! survive a save.

use serde::{Deserialize, Serialize};

use crate::model::{ChatMessage, Message, MessageContext};

/// History entries sent upstream alongside a new chat turn.
pub const CONTEXT_WINDOW: usize = 8;
/// Entries replayed on screen when a session is restored.
pub const REPLAY_WINDOW: usize = 10;
/// Entries kept in the durable snapshot.
pub const RETENTION_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// History for an outbound chat request: role/content only.
    pub fn context_window(&self) -> Vec<ChatMessage> {
        self.recent(CONTEXT_WINDOW)
            .iter()
            .map(Message::to_chat)
            .collect()
    }

    /// Entries to show when a session is restored. Name introductions are
    /// bookkeeping and never replayed.
    pub fn replay(&self) -> Vec<&Message> {
        self.recent(REPLAY_WINDOW)
            .iter()
            .filter(|m| m.context != MessageContext::NameIntroduction)
            .collect()
    }

    /// The slice that a save writes out.
    pub fn retained(&self) -> &[Message] {
        self.recent(RETENTION_LIMIT)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
