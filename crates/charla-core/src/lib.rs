pub mod animation;
pub mod config;
pub mod message;
pub mod scheduler;
pub mod store;
pub mod tooltip;

// Re-export main types for convenience
pub use animation::{BubbleEntrance, EntranceTracker, Transition};
pub use config::{Config, ReplyOrder, DEFAULT_BOT_REPLY};
pub use message::{Message, MessageId, Sender};
pub use scheduler::{ReplyScheduler, ScheduledEvent, SendReceipt, TaskId, TaskKind, TaskState};
pub use store::ConversationStore;
pub use tooltip::{NavItem, Tooltip, NAV_ITEMS};
