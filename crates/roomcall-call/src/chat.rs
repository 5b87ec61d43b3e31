//! In-call chat history.
//!
//! Messages live in a bounded ring buffer so memory usage stays predictable
//! over a long call.

use std::collections::VecDeque;

use roomcall_common::new_id;
use serde::{Deserialize, Serialize};

use crate::protocol::ChatPayload;

/// Sender name used when echoing the local participant's own messages.
pub const LOCAL_SENDER: &str = "You";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub content: String,
    /// `true` for the local echo of a message we sent.
    pub local: bool,
}

impl ChatMessage {
    /// Local echo of an outgoing message.
    pub fn outgoing(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            sender: LOCAL_SENDER.to_string(),
            content: content.into(),
            local: true,
        }
    }

    /// A message received from another participant.
    pub fn incoming(payload: ChatPayload) -> Self {
        Self {
            id: new_id(),
            sender: payload.sender,
            content: payload.message,
            local: false,
        }
    }
}

/// Configuration for chat history storage.
#[derive(Debug, Clone)]
pub struct ChatHistoryConfig {
    /// Maximum messages to retain.
    pub max_messages: usize,
}

impl Default for ChatHistoryConfig {
    fn default() -> Self {
        Self { max_messages: 500 }
    }
}

/// In-memory chat history for one call.
#[derive(Debug)]
pub struct ChatHistory {
    config: ChatHistoryConfig,
    messages: VecDeque<ChatMessage>,
}

impl ChatHistory {
    pub fn new(config: ChatHistoryConfig) -> Self {
        Self {
            config,
            messages: VecDeque::new(),
        }
    }

    /// Push a message. The oldest message is evicted when the buffer is full.
    pub fn push(&mut self, msg: ChatMessage) {
        if self.config.max_messages == 0 {
            return;
        }
        if self.messages.len() >= self.config.max_messages {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    /// The most recent `limit` messages (oldest first).
    pub fn recent(&self, limit: usize) -> Vec<&ChatMessage> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip).collect()
    }

    pub fn all(&self) -> Vec<&ChatMessage> {
        self.messages.iter().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(ChatHistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> ChatMessage {
        ChatMessage::incoming(ChatPayload {
            sender: "Ana".into(),
            message: content.into(),
        })
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = ChatHistory::new(ChatHistoryConfig { max_messages: 3 });
        for i in 0..5 {
            history.push(msg(&format!("m{i}")));
        }
        let contents: Vec<_> = history.all().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m2", "m3", "m4"]);
    }

    #[test]
    fn recent_returns_tail_oldest_first() {
        let mut history = ChatHistory::default();
        for i in 0..4 {
            history.push(msg(&format!("m{i}")));
        }
        let recent: Vec<_> = history.recent(2).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, ["m2", "m3"]);
        assert_eq!(history.recent(10).len(), 4);
    }

    #[test]
    fn outgoing_is_echoed_as_you() {
        let m = ChatMessage::outgoing("hello");
        assert_eq!(m.sender, "You");
        assert!(m.local);
    }

    #[test]
    fn incoming_keeps_remote_sender() {
        let m = msg("hi");
        assert_eq!(m.sender, "Ana");
        assert_eq!(m.content, "hi");
        assert!(!m.local);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ChatHistory::default();
        history.push(msg("x"));
        assert_eq!(history.len(), 1);
        history.clear();
        assert!(history.is_empty());
    }
}
