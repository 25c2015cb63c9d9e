//! Chat message records
//!
//! A record is created once, appended to the conversation and never touched
//! again. Nothing in this module hands out mutable access to a `Message`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Creation-ordered identifier, unique within one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

/// A single chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
}

impl Message {
    pub(crate) fn new(id: MessageId, text: String, sender: Sender) -> Self {
        Self { id, text, sender }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_order_by_creation() {
        assert!(MessageId::new(1) < MessageId::new(2));
        assert_eq!(MessageId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let msg = Message::new(MessageId::new(3), "Hola".to_string(), Sender::User);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"id":3,"text":"Hola","sender":"user"}"#);
    }
}
