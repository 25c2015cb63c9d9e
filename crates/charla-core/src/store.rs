//! In-memory conversation for a single chat screen
//!
//! The store is append-only. Every append latches a scroll-to-end request
//! that the presentation layer consumes on its next frame.

use crate::message::{Message, MessageId, Sender};

#[derive(Debug, Default)]
pub struct ConversationStore {
    records: Vec<Message>,
    next_id: u64,
    draft: String,
    scroll_requested: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end of the conversation.
    ///
    /// Always succeeds. Text validation is the sender's job; the scheduler
    /// rejects blank user input before it ever gets here.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> MessageId {
        self.next_id += 1;
        let id = MessageId::new(self.next_id);
        let text = text.into();

        tracing::debug!(%id, sender = sender.as_str(), chars = text.chars().count(), "appended message");

        self.records.push(Message::new(id, text, sender));
        self.scroll_requested = true;
        id
    }

    pub fn records(&self) -> &[Message] {
        &self.records
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // Ids are handed out in append order, so the slice is sorted by id
        self.records
            .binary_search_by_key(&id, Message::id)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn last(&self) -> Option<&Message> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current in-progress draft
    pub fn current_text(&self) -> &str {
        &self.draft
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn clear_text(&mut self) {
        self.draft.clear();
    }

    pub fn request_scroll_to_end(&mut self) {
        self.scroll_requested = true;
    }

    /// Consume the pending scroll-to-end request, if any
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}
