//! Navigation bar items and their hover tooltip
//!
//! The tooltip is either hidden or shown for one item. Press-in fades it in,
//! press-out fades it out, and it only becomes hidden once the fade-out ends.

use std::time::{Duration, Instant};

use crate::animation::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub tooltip: &'static str,
}

pub static NAV_ITEMS: [NavItem; 3] = [
    NavItem {
        label: "Chats",
        tooltip: "Aquí verás tus conversaciones",
    },
    NavItem {
        label: "Contactos",
        tooltip: "Lista de tus contactos",
    },
    NavItem {
        label: "Ajustes",
        tooltip: "Diseñado para personalizar tu experiencia de una mejor manera, a tu gusto ",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fade {
    In,
    Out,
}

#[derive(Debug, Clone, Copy)]
struct Active {
    item: usize,
    fade: Fade,
    from: f32,
    transition: Transition,
}

impl Active {
    fn opacity(&self, now: Instant) -> f32 {
        let target = match self.fade {
            Fade::In => 1.0,
            Fade::Out => 0.0,
        };
        self.from + (target - self.from) * self.transition.progress(now)
    }
}

#[derive(Debug)]
pub struct Tooltip {
    fade: Duration,
    active: Option<Active>,
}

impl Tooltip {
    pub fn new(fade: Duration) -> Self {
        Self { fade, active: None }
    }

    /// Show the tooltip for `item`, fading from wherever the current fade is
    pub fn press_in(&mut self, item: usize, now: Instant) {
        if item >= NAV_ITEMS.len() {
            return;
        }
        let from = self.opacity(now);
        self.active = Some(Active {
            item,
            fade: Fade::In,
            from,
            transition: Transition::new(now, self.fade),
        });
    }

    pub fn press_out(&mut self, now: Instant) {
        let Some(active) = self.active else {
            return;
        };
        if active.fade == Fade::Out {
            return;
        }
        self.active = Some(Active {
            fade: Fade::Out,
            from: active.opacity(now),
            transition: Transition::new(now, self.fade),
            ..active
        });
    }

    /// Advance to `now`; returns true if the tooltip just became hidden
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.active {
            Some(a) if a.fade == Fade::Out && a.transition.is_done(now) => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Item the tooltip is shown for, if any
    pub fn shown_for(&self) -> Option<&'static NavItem> {
        self.active.map(|a| &NAV_ITEMS[a.item])
    }

    pub fn shown_index(&self) -> Option<usize> {
        self.active.map(|a| a.item)
    }

    pub fn opacity(&self, now: Instant) -> f32 {
        self.active.map(|a| a.opacity(now)).unwrap_or(0.0)
    }

    pub fn is_fading(&self, now: Instant) -> bool {
        self.active.is_some_and(|a| !a.transition.is_done(now))
    }
}
