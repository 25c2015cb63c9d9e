use std::time::Instant;

use charla_core::{
    Config, ConversationStore, EntranceTracker, MessageId, ReplyScheduler, ScheduledEvent,
    Tooltip, NAV_ITEMS,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub store: ConversationStore,
    pub scheduler: ReplyScheduler,
    pub input_cursor: usize, // char index into the draft

    // Presentation state
    pub entrances: EntranceTracker,
    pub tooltip: Tooltip,

    // Message list scrolling
    pub chat_scroll: u16,
    pub follow_bottom: bool,
    pub chat_height: u16,
    pub chat_total_lines: u16,

    // Areas for mouse hit-testing (set during render)
    pub chat_area: Option<Rect>,
    pub nav_areas: Vec<Rect>,
    pub send_area: Option<Rect>,
}

impl App {
    /// Build the screen state. The receiver yields expired reply and scroll timers.
    pub fn new(config: &Config) -> (Self, mpsc::UnboundedReceiver<ScheduledEvent>) {
        let (scheduler, scheduled) = ReplyScheduler::new(config);
        let app = Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            store: ConversationStore::new(),
            scheduler,
            input_cursor: 0,
            entrances: EntranceTracker::new(config.bubble_fade()),
            tooltip: Tooltip::new(config.tooltip_fade()),
            chat_scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            chat_total_lines: 0,
            chat_area: None,
            nav_areas: Vec::new(),
            send_area: None,
        };
        (app, scheduled)
    }

    /// Submit the draft. Blank drafts are left in the input untouched.
    pub fn send(&mut self) -> Option<MessageId> {
        let receipt = self.scheduler.send_draft(&mut self.store)?;
        self.input_cursor = 0;
        Some(receipt.message)
    }

    pub fn apply_scheduled(&mut self, event: ScheduledEvent) {
        self.scheduler.fire(event, &mut self.store);
    }

    /// Pick up any scroll-to-end request raised by the store
    pub fn sync_scroll(&mut self) {
        if self.store.take_scroll_request() {
            self.follow_bottom = true;
        }
    }

    /// Tick animation state (called by Tick event)
    pub fn tick_animation(&mut self, now: Instant) {
        self.tooltip.tick(now);
    }

    pub fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        // Reaching the tail resumes following new messages
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_bottom = true;
    }

    // Draft editing, cursor positions are in chars

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(self.store.current_text(), self.input_cursor);
        self.store.draft_mut().insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(self.store.current_text(), self.input_cursor);
            self.store.draft_mut().remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.input_cursor < self.draft_len() {
            let byte_pos = char_to_byte_index(self.store.current_text(), self.input_cursor);
            self.store.draft_mut().remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.draft_len());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.draft_len();
    }

    fn draft_len(&self) -> usize {
        self.store.current_text().chars().count()
    }

    /// Toggle the tooltip for a nav item from the keyboard
    pub fn toggle_tooltip(&mut self, item: usize, now: Instant) {
        if item >= NAV_ITEMS.len() {
            return;
        }
        if self.tooltip.shown_index() == Some(item) && self.tooltip.opacity(now) > 0.0 {
            self.tooltip.press_out(now);
        } else {
            self.tooltip.press_in(item, now);
        }
    }

    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
