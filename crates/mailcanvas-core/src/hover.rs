//! Hover and selection tracking for the floating block controls.
//!
//! Showing is immediate; hiding is debounced. A block-leave, controls-leave
//! or canvas-leave schedules a hide `hide_delay` in the future, and any entry
//! into a block or the controls before that deadline cancels it. Only one
//! hide is ever pending: scheduling a new one replaces the old one.
//!
//! The machine never reads a clock. Callers pass `now` to every transition
//! and call [`HoverMachine::poll`] when [`HoverMachine::next_deadline`] has
//! passed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_DROP_SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverConfig {
    pub hide_delay: Duration,
    /// How long a freshly dropped block ignores pointer entry.
    pub drop_settle: Duration,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            hide_delay: DEFAULT_HIDE_DELAY,
            drop_settle: DEFAULT_DROP_SETTLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    Idle,
    Hovering,
    SelectedVisible,
    SelectedPendingHide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideKind {
    BlockLeave,
    CanvasLeave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingHide {
    kind: HideKind,
    deadline: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverChange {
    Selected(String),
    Hidden(String),
}

#[derive(Debug, Clone)]
pub struct HoverMachine {
    config: HoverConfig,
    selected: Option<String>,
    hovered: Option<String>,
    controls_hovered: bool,
    pending: Option<PendingHide>,
    settling: HashMap<String, Instant>,
}

impl HoverMachine {
    pub fn new(config: HoverConfig) -> Self {
        Self {
            config,
            selected: None,
            hovered: None,
            controls_hovered: false,
            pending: None,
            settling: HashMap::new(),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn controls_hovered(&self) -> bool {
        self.controls_hovered
    }

    pub fn controls_visible(&self) -> bool {
        self.selected.is_some()
    }

    pub fn pending_hide(&self) -> Option<HideKind> {
        self.pending.map(|pending| pending.kind)
    }

    /// A pointer resting on a block that is still settling after a drop
    /// reports `Hovering` even though nothing is selected yet.
    pub fn phase(&self) -> HoverPhase {
        if self.selected.is_none() {
            if self.hovered.is_some() {
                HoverPhase::Hovering
            } else {
                HoverPhase::Idle
            }
        } else if self.pending.is_some() {
            HoverPhase::SelectedPendingHide
        } else if self.hovered.is_some() || self.controls_hovered {
            HoverPhase::Hovering
        } else {
            HoverPhase::SelectedVisible
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let settle = self.settling.values().min().copied();
        match (self.pending.map(|pending| pending.deadline), settle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::trace!(kind = ?pending.kind, "pending hide cancelled");
        }
    }

    fn schedule_hide(&mut self, kind: HideKind, now: Instant) {
        if self.selected.is_none() {
            return;
        }
        self.pending = Some(PendingHide {
            kind,
            deadline: now + self.config.hide_delay,
        });
        tracing::trace!(?kind, "hide scheduled");
    }

    fn is_settling(&self, block_id: &str, now: Instant) -> bool {
        self.settling
            .get(block_id)
            .is_some_and(|deadline| *deadline > now)
    }

    /// Returns `true` when the selection moved to `block_id`.
    pub fn enter_block(&mut self, block_id: &str, now: Instant) -> bool {
        self.cancel_pending();
        self.hovered = Some(block_id.to_string());
        if self.is_settling(block_id, now) {
            tracing::trace!(block_id, "entry ignored while block settles after drop");
            return false;
        }
        self.set_selected(block_id)
    }

    pub fn leave_block(&mut self, block_id: &str, now: Instant) {
        if self.hovered.as_deref() == Some(block_id) {
            self.hovered = None;
        }
        if self.hovered.is_none() && !self.controls_hovered {
            self.schedule_hide(HideKind::BlockLeave, now);
        }
    }

    pub fn enter_controls(&mut self) {
        self.controls_hovered = true;
        self.cancel_pending();
    }

    pub fn leave_controls(&mut self, now: Instant) {
        self.controls_hovered = false;
        if self.hovered.is_none() {
            self.schedule_hide(HideKind::BlockLeave, now);
        }
    }

    pub fn leave_canvas(&mut self, now: Instant) {
        self.hovered = None;
        if !self.controls_hovered {
            self.schedule_hide(HideKind::CanvasLeave, now);
        }
    }

    /// Explicit selection (click). Cancels any pending hide.
    pub fn select(&mut self, block_id: &str) -> bool {
        self.cancel_pending();
        self.settling.remove(block_id);
        self.set_selected(block_id)
    }

    fn set_selected(&mut self, block_id: &str) -> bool {
        if self.selected.as_deref() == Some(block_id) {
            return false;
        }
        self.selected = Some(block_id.to_string());
        tracing::trace!(block_id, "block selected");
        true
    }

    pub fn clear_selection(&mut self) {
        self.cancel_pending();
        self.selected = None;
    }

    /// Starts the settle window for a block that was just dropped.
    pub fn mark_dropped(&mut self, block_id: &str, now: Instant) {
        self.settling
            .insert(block_id.to_string(), now + self.config.drop_settle);
    }

    /// Drops every reference to a block that left the document.
    pub fn forget(&mut self, block_id: &str) {
        if self.selected.as_deref() == Some(block_id) {
            self.cancel_pending();
            self.selected = None;
        }
        if self.hovered.as_deref() == Some(block_id) {
            self.hovered = None;
        }
        self.settling.remove(block_id);
    }

    /// Fires every deadline at or before `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<HoverChange> {
        let mut changes = Vec::new();

        if let Some(pending) = self.pending {
            if pending.deadline <= now {
                self.pending = None;
                if self.hovered.is_none() && !self.controls_hovered {
                    if let Some(block_id) = self.selected.take() {
                        tracing::trace!(block_id = %block_id, kind = ?pending.kind, "controls hidden");
                        changes.push(HoverChange::Hidden(block_id));
                    }
                }
            }
        }

        let settled: Vec<String> = self
            .settling
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(block_id, _)| block_id.clone())
            .collect();
        for block_id in settled {
            self.settling.remove(&block_id);
            if self.hovered.as_deref() == Some(block_id.as_str()) && self.set_selected(&block_id) {
                self.cancel_pending();
                changes.push(HoverChange::Selected(block_id));
            }
        }

        changes
    }

    /// Teardown: no timer survives this call.
    pub fn reset(&mut self) {
        self.pending = None;
        self.settling.clear();
        self.selected = None;
        self.hovered = None;
        self.controls_hovered = false;
    }
}

impl Default for HoverMachine {
    fn default() -> Self {
        Self::new(HoverConfig::default())
    }
}
