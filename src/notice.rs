//! Transient notice timelines.
//!
//! A notice is fully visible for `hold`, then collapses over `collapse`, then
//! disappears. Each of the four notices runs its own timeline; showing one
//! never delays or hides another.

use crate::model::{Notice, NoticeTiming};
use crate::surface::NoticeSurface;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoticePhase {
    Hidden,
    Holding,
    /// `remaining` runs from 1.0 (just started collapsing) down to 0.0.
    Collapsing { remaining: f64 },
}

pub struct NoticeBoard {
    timing: NoticeTiming,
    shown_at: HashMap<Notice, Instant>,
}

impl NoticeBoard {
    pub fn new(timing: NoticeTiming) -> Self {
        Self {
            timing,
            shown_at: HashMap::new(),
        }
    }

    pub fn show_at(&mut self, notice: Notice, now: Instant) {
        self.shown_at.insert(notice, now);
    }

    pub fn phase(&self, notice: Notice, now: Instant) -> NoticePhase {
        let Some(start) = self.shown_at.get(&notice) else {
            return NoticePhase::Hidden;
        };
        let elapsed = now.saturating_duration_since(*start);
        if elapsed < self.timing.hold {
            return NoticePhase::Holding;
        }
        let into_collapse = elapsed - self.timing.hold;
        if into_collapse >= self.timing.collapse {
            return NoticePhase::Hidden;
        }
        let remaining = 1.0 - into_collapse.as_secs_f64() / self.timing.collapse.as_secs_f64();
        NoticePhase::Collapsing { remaining }
    }

    /// Notices still on screen at `now`, in a stable order.
    pub fn visible(&self, now: Instant) -> Vec<(Notice, NoticePhase)> {
        Notice::ALL
            .iter()
            .map(|n| (*n, self.phase(*n, now)))
            .filter(|(_, p)| *p != NoticePhase::Hidden)
            .collect()
    }

    /// Forget notices whose timeline has ended.
    pub fn prune(&mut self, now: Instant) {
        let end = self.timing.hold + self.timing.collapse;
        self.shown_at
            .retain(|_, start| now.saturating_duration_since(*start) < end);
    }
}

impl NoticeSurface for NoticeBoard {
    fn show_notice(&mut self, notice: Notice) {
        self.show_at(notice, Instant::now());
    }

    fn hide_notice(&mut self, notice: Notice) {
        self.shown_at.remove(&notice);
    }
}
