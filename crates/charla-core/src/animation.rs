//! Time-based transitions for message bubbles
//!
//! Everything here is a pure function of an `Instant` passed in by the
//! caller, so frames can be rendered (and tested) at arbitrary times.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::message::MessageId;

/// A linear 0.0 → 1.0 ramp over a fixed duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    start: Instant,
    duration: Duration,
}

impl Transition {
    pub fn new(start: Instant, duration: Duration) -> Self {
        Self { start, duration }
    }

    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Decelerating curve, used in place of a spring for the slide
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Fade plus upward slide for a newly shown bubble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleEntrance {
    transition: Transition,
}

impl BubbleEntrance {
    pub fn new(start: Instant, duration: Duration) -> Self {
        Self {
            transition: Transition::new(start, duration),
        }
    }

    pub fn opacity(&self, now: Instant) -> f32 {
        self.transition.progress(now)
    }

    /// Rows the bubble still sits below its resting position
    pub fn slide_rows(&self, now: Instant, max_rows: u16) -> u16 {
        let remaining = 1.0 - ease_out_cubic(self.transition.progress(now));
        (remaining * max_rows as f32).round() as u16
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.transition.is_done(now)
    }
}

/// Remembers when each message was first shown
#[derive(Debug)]
pub struct EntranceTracker {
    duration: Duration,
    entrances: HashMap<MessageId, BubbleEntrance>,
}

impl EntranceTracker {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            entrances: HashMap::new(),
        }
    }

    /// Entrance for `id`, starting it at `now` the first time the id is seen
    pub fn observe(&mut self, id: MessageId, now: Instant) -> BubbleEntrance {
        let duration = self.duration;
        *self
            .entrances
            .entry(id)
            .or_insert_with(|| BubbleEntrance::new(now, duration))
    }

    /// True while any observed bubble is still mid-entrance
    pub fn is_animating(&self, now: Instant) -> bool {
        self.entrances.values().any(|e| !e.is_done(now))
    }
}
