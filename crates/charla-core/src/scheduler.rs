//! Delayed canned replies
//!
//! Every accepted send arms two one-shot tasks: a short one that asks the
//! message list to scroll to the new user message, and a longer one that
//! appends the bot reply. Tasks never touch the store themselves. They post a
//! [`ScheduledEvent`] back to the event loop that owns the store, and the loop
//! hands it to [`ReplyScheduler::fire`].
//!
//! The scheduler's registry holds only armed tasks. A task leaves it when it
//! fires or when [`ReplyScheduler::shutdown`] (or dropping the scheduler)
//! aborts it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{Config, ReplyOrder};
use crate::message::{MessageId, Sender};
use crate::store::ConversationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Appends the bot reply
    Reply,
    /// Brings the just-sent user message into view
    Scroll,
}

/// Lifecycle of one delayed task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Armed,
    Fired,
    Cancelled,
}

/// Posted by a task when its delay expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    task: TaskId,
    kind: TaskKind,
}

impl ScheduledEvent {
    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }
}

/// What an accepted send armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    pub message: MessageId,
    pub reply: TaskId,
    pub scroll: TaskId,
}

struct PendingTask {
    kind: TaskKind,
    // None for replies owned by the queue worker
    handle: Option<JoinHandle<()>>,
}

/// Single worker that fires queued replies one at a time, in arming order
struct ReplyQueue {
    tx: mpsc::UnboundedSender<(TaskId, Instant)>,
    worker: JoinHandle<()>,
}

pub struct ReplyScheduler {
    reply_delay: Duration,
    scroll_delay: Duration,
    bot_reply: String,
    order: ReplyOrder,
    next_task: u64,
    tasks: HashMap<TaskId, PendingTask>,
    cancelled: HashSet<TaskId>,
    events_tx: mpsc::UnboundedSender<ScheduledEvent>,
    queue: Option<ReplyQueue>,
}

impl ReplyScheduler {
    /// Create a scheduler and the receiving end its tasks post to.
    pub fn new(config: &Config) -> (Self, mpsc::UnboundedReceiver<ScheduledEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            reply_delay: config.reply_delay(),
            scroll_delay: config.scroll_delay(),
            bot_reply: config.reply_text().to_string(),
            order: config.reply_order,
            next_task: 0,
            tasks: HashMap::new(),
            cancelled: HashSet::new(),
            events_tx,
            queue: None,
        };
        (scheduler, events_rx)
    }

    /// Accept a user message.
    ///
    /// Blank text (after trimming) is ignored: nothing is appended and nothing
    /// is armed. Otherwise the trimmed text is appended as a user record before
    /// either task is armed. Must be called from within a tokio runtime.
    pub fn on_send(&mut self, store: &mut ConversationStore, text: &str) -> Option<SendReceipt> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::trace!("ignoring blank send");
            return None;
        }

        let message = store.append(Sender::User, trimmed);
        let reply = self.arm(TaskKind::Reply);
        let scroll = self.arm(TaskKind::Scroll);

        tracing::debug!(%message, %reply, %scroll, "send accepted");
        Some(SendReceipt { message, reply, scroll })
    }

    /// Send the store's draft, clearing it only when the send is accepted.
    pub fn send_draft(&mut self, store: &mut ConversationStore) -> Option<SendReceipt> {
        let draft = store.current_text().to_string();
        let receipt = self.on_send(store, &draft)?;
        store.clear_text();
        Some(receipt)
    }

    /// Apply an expired task to the store.
    ///
    /// Returns the id of the appended bot record for reply tasks. Events for
    /// tasks that are not armed (already fired, or cancelled by shutdown) are
    /// dropped.
    pub fn fire(&mut self, event: ScheduledEvent, store: &mut ConversationStore) -> Option<MessageId> {
        let Some(task) = self.tasks.remove(&event.task) else {
            match self.task_state(event.task) {
                TaskState::Idle => tracing::warn!(task = %event.task, "event for unknown task"),
                state => tracing::debug!(task = %event.task, ?state, "dropping stale event"),
            }
            return None;
        };

        match task.kind {
            TaskKind::Scroll => {
                store.request_scroll_to_end();
                None
            }
            TaskKind::Reply => {
                let id = store.append(Sender::Bot, self.bot_reply.as_str());
                tracing::debug!(task = %event.task, message = %id, "bot replied");
                Some(id)
            }
        }
    }

    /// Ids are handed out in order, so any id up to the last one that is
    /// neither armed nor cancelled has fired.
    pub fn task_state(&self, task: TaskId) -> TaskState {
        if self.tasks.contains_key(&task) {
            TaskState::Armed
        } else if self.cancelled.contains(&task) {
            TaskState::Cancelled
        } else if (1..=self.next_task).contains(&task.0) {
            TaskState::Fired
        } else {
            TaskState::Idle
        }
    }

    /// Number of replies armed but not yet fired
    pub fn pending_replies(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.kind == TaskKind::Reply)
            .count()
    }

    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Abort every outstanding task. Events already in flight are dropped by `fire`.
    pub fn shutdown(&mut self) {
        let mut cancelled = 0;
        for (id, task) in self.tasks.drain() {
            if let Some(handle) = task.handle {
                handle.abort();
            }
            self.cancelled.insert(id);
            cancelled += 1;
        }
        if let Some(queue) = self.queue.take() {
            queue.worker.abort();
        }
        if cancelled > 0 {
            tracing::info!(cancelled, "cancelled pending tasks");
        }
    }

    fn arm(&mut self, kind: TaskKind) -> TaskId {
        self.next_task += 1;
        let id = TaskId(self.next_task);

        let handle = match (kind, self.order) {
            (TaskKind::Reply, ReplyOrder::Queued) => {
                self.enqueue_reply(id);
                None
            }
            (TaskKind::Reply, ReplyOrder::Independent) => {
                Some(self.spawn_timer(id, kind, self.reply_delay))
            }
            (TaskKind::Scroll, _) => Some(self.spawn_timer(id, kind, self.scroll_delay)),
        };

        self.tasks.insert(id, PendingTask { kind, handle });
        id
    }

    fn spawn_timer(&self, task: TaskId, kind: TaskKind, delay: Duration) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the screen is closing
            let _ = tx.send(ScheduledEvent { task, kind });
        })
    }

    fn enqueue_reply(&mut self, task: TaskId) {
        let deadline = Instant::now() + self.reply_delay;
        let events_tx = self.events_tx.clone();
        let queue = self.queue.get_or_insert_with(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<(TaskId, Instant)>();
            let worker = tokio::spawn(async move {
                while let Some((task, deadline)) = rx.recv().await {
                    tokio::time::sleep_until(deadline).await;
                    if events_tx
                        .send(ScheduledEvent {
                            task,
                            kind: TaskKind::Reply,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            });
            ReplyQueue { tx, worker }
        });

        if queue.tx.send((task, deadline)).is_err() {
            tracing::error!(%task, "reply queue worker stopped");
        }
    }
}

impl Drop for ReplyScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BOT_REPLY;

    fn scheduler(order: ReplyOrder) -> (ReplyScheduler, mpsc::UnboundedReceiver<ScheduledEvent>) {
        let config = Config {
            reply_order: order,
            ..Config::default()
        };
        ReplyScheduler::new(&config)
    }

    /// Wait for the next event and apply it, like the UI loop does
    async fn pump(
        scheduler: &mut ReplyScheduler,
        events: &mut mpsc::UnboundedReceiver<ScheduledEvent>,
        store: &mut ConversationStore,
    ) -> ScheduledEvent {
        let event = events.recv().await.unwrap();
        scheduler.fire(event, store);
        event
    }

    fn summary(store: &ConversationStore) -> Vec<(Sender, String)> {
        store
            .records()
            .iter()
            .map(|m| (m.sender(), m.text().to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_hola_then_bot_reply() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();
        let start = Instant::now();

        let receipt = scheduler.on_send(&mut store, "Hola").unwrap();
        assert_eq!(summary(&store), vec![(Sender::User, "Hola".to_string())]);
        assert_eq!(scheduler.task_state(receipt.reply), TaskState::Armed);
        assert_eq!(scheduler.task_state(receipt.scroll), TaskState::Armed);
        assert!(store.take_scroll_request());

        // Scroll fires first, without appending anything
        let event = pump(&mut scheduler, &mut events, &mut store).await;
        assert_eq!(event.kind(), TaskKind::Scroll);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert_eq!(store.len(), 1);
        assert!(store.take_scroll_request());

        let event = pump(&mut scheduler, &mut events, &mut store).await;
        assert_eq!(event.kind(), TaskKind::Reply);
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(
            summary(&store),
            vec![
                (Sender::User, "Hola".to_string()),
                (Sender::Bot, DEFAULT_BOT_REPLY.to_string()),
            ]
        );
        assert_eq!(scheduler.task_state(receipt.reply), TaskState::Fired);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_send_is_noop() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        for text in ["", "   ", "\t\n "] {
            assert!(scheduler.on_send(&mut store, text).is_none());
        }

        assert!(store.is_empty());
        assert!(!scheduler.has_pending());
        assert!(!store.take_scroll_request());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_stores_trimmed_text() {
        let (mut scheduler, _events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        scheduler.on_send(&mut store, "  hola  ").unwrap();
        assert_eq!(store.records()[0].text(), "hola");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_draft_clears_only_on_success() {
        let (mut scheduler, _events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        store.set_text("   ");
        assert!(scheduler.send_draft(&mut store).is_none());
        assert_eq!(store.current_text(), "   ");

        store.set_text("hey");
        assert!(scheduler.send_draft(&mut store).is_some());
        assert_eq!(store.current_text(), "");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_sends_each_get_one_reply() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        scheduler.on_send(&mut store, "a").unwrap();
        scheduler.on_send(&mut store, "b").unwrap();
        assert_eq!(
            summary(&store),
            vec![(Sender::User, "a".to_string()), (Sender::User, "b".to_string())]
        );
        assert_eq!(scheduler.pending_replies(), 2);

        // Two scroll events and two reply events
        for _ in 0..4 {
            pump(&mut scheduler, &mut events, &mut store).await;
        }

        let bots = store.records().iter().filter(|m| !m.is_user()).count();
        assert_eq!(bots, 2);
        assert_eq!(store.len(), 4);
        assert_eq!(scheduler.pending_replies(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_replies_follow_send_order() {
        let config = Config {
            reply_order: ReplyOrder::Queued,
            bot_reply: "ok".to_string(),
            ..Config::default()
        };
        let (mut scheduler, mut events) = ReplyScheduler::new(&config);
        let mut store = ConversationStore::new();

        let first = scheduler.on_send(&mut store, "a").unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        let second = scheduler.on_send(&mut store, "b").unwrap();

        let mut reply_tasks = Vec::new();
        while reply_tasks.len() < 2 {
            let event = pump(&mut scheduler, &mut events, &mut store).await;
            if event.kind() == TaskKind::Reply {
                reply_tasks.push(event.task());
            }
        }

        assert_eq!(reply_tasks, vec![first.reply, second.reply]);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_outstanding_tasks() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        let receipt = scheduler.on_send(&mut store, "Hola").unwrap();
        scheduler.shutdown();
        assert_eq!(scheduler.task_state(receipt.reply), TaskState::Cancelled);
        assert_eq!(scheduler.task_state(receipt.scroll), TaskState::Cancelled);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_queued_worker() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Queued);
        let mut store = ConversationStore::new();

        scheduler.on_send(&mut store, "Hola").unwrap();
        scheduler.shutdown();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_event_is_dropped() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        scheduler.on_send(&mut store, "Hola").unwrap();
        let _scroll = events.recv().await.unwrap();
        let reply = events.recv().await.unwrap();

        assert!(scheduler.fire(reply, &mut store).is_some());
        // Same event again must not add a second reply
        assert!(scheduler.fire(reply, &mut store).is_none());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_tasks_leave_registry() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Independent);
        let mut store = ConversationStore::new();

        let mut receipts = Vec::new();
        for text in ["a", "b", "c"] {
            receipts.push(scheduler.on_send(&mut store, text).unwrap());
        }
        assert_eq!(scheduler.tasks.len(), 6);

        for _ in 0..6 {
            pump(&mut scheduler, &mut events, &mut store).await;
        }

        assert!(scheduler.tasks.is_empty());
        assert!(scheduler.cancelled.is_empty());
        for receipt in &receipts {
            assert_eq!(scheduler.task_state(receipt.reply), TaskState::Fired);
            assert_eq!(scheduler.task_state(receipt.scroll), TaskState::Fired);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_empties_registry() {
        let (mut scheduler, mut events) = scheduler(ReplyOrder::Queued);
        let mut store = ConversationStore::new();

        let fired = scheduler.on_send(&mut store, "a").unwrap();
        for _ in 0..2 {
            pump(&mut scheduler, &mut events, &mut store).await;
        }
        let pending = scheduler.on_send(&mut store, "b").unwrap();
        scheduler.shutdown();

        assert!(scheduler.tasks.is_empty());
        assert_eq!(scheduler.pending_replies(), 0);
        assert_eq!(scheduler.task_state(fired.reply), TaskState::Fired);
        assert_eq!(scheduler.task_state(pending.reply), TaskState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_bot_reply_uses_default() {
        let config = Config {
            bot_reply: String::new(),
            ..Config::default()
        };
        let (mut scheduler, mut events) = ReplyScheduler::new(&config);
        let mut store = ConversationStore::new();

        scheduler.on_send(&mut store, "Hola").unwrap();
        while store.len() < 2 {
            pump(&mut scheduler, &mut events, &mut store).await;
        }

        assert_eq!(
            summary(&store),
            vec![
                (Sender::User, "Hola".to_string()),
                (Sender::Bot, DEFAULT_BOT_REPLY.to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_task_state_is_idle() {
        let (scheduler, _events) = scheduler(ReplyOrder::Independent);
        assert_eq!(scheduler.task_state(TaskId(99)), TaskState::Idle);
    }
}
