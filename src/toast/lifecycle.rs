//! Timed dismissal state machine for a single toast.
//!
//! DESIGN
//! ======
//! Every transition takes the current monotonic time as an argument, so the
//! countdown is computed from captured timestamps rather than from how many
//! frames happened to fire. A throttled tab that ticks once a second still
//! dismisses on time, and time spent paused is never charged.
//!
//! ```text
//! Showing ──start──▶ CountingDown ◀──resume── Paused
//!    │                   │    └───────pause──────▲
//!    └──────dismiss──────┴──────▶ Dismissing ──▶ Removed
//! ```

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;

use std::fmt;

use uuid::Uuid;

use crate::config::ToastConfig;

/// Opaque identifier, unique per toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(Uuid);

impl ToastId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ToastId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    /// Entrance transition running; the countdown has not started.
    Showing,
    /// Visible with the countdown running.
    CountingDown,
    /// Countdown frozen while the pointer is over the toast.
    Paused,
    /// Exit transition running; removal is scheduled.
    Dismissing,
    /// Detached from the page. Terminal.
    Removed,
}

/// Result of sampling the countdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Fraction of the lifetime left, in `(0, 1]`.
    Progress(f64),
    /// The countdown reached zero; dismissal is due.
    Expired,
    /// Not counting down.
    Idle,
}

#[derive(Debug, Clone)]
pub struct ToastLifecycle {
    id: ToastId,
    duration_ms: f64,
    remaining_ms: f64,
    phase: ToastPhase,
    started_at: Option<f64>,
    auto_dismiss: bool,
    pause_on_hover: bool,
}

impl ToastLifecycle {
    #[must_use]
    pub fn new(config: &ToastConfig) -> Self {
        Self::with_id(ToastId::new(), config)
    }

    #[must_use]
    pub fn with_id(id: ToastId, config: &ToastConfig) -> Self {
        Self {
            id,
            duration_ms: config.duration_ms,
            remaining_ms: config.duration_ms,
            phase: ToastPhase::Showing,
            started_at: None,
            auto_dismiss: config.auto_dismiss,
            pause_on_hover: config.pause_on_hover,
        }
    }

    #[must_use]
    pub fn id(&self) -> ToastId {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> ToastPhase {
        self.phase
    }

    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Whether this toast will ever count down on its own.
    #[must_use]
    pub fn countdown_enabled(&self) -> bool {
        self.auto_dismiss && self.duration_ms > 0.0
    }

    /// Whether hover should pause the countdown.
    #[must_use]
    pub fn hover_pauses(&self) -> bool {
        self.countdown_enabled() && self.pause_on_hover
    }

    /// Stored remainder, not counting time elapsed since the last start.
    #[must_use]
    pub fn remaining_ms(&self) -> f64 {
        self.remaining_ms
    }

    /// Remainder as of `now`.
    #[must_use]
    pub fn remaining_at(&self, now: f64) -> f64 {
        match (self.phase, self.started_at) {
            (ToastPhase::CountingDown, Some(start)) => (self.remaining_ms - (now - start).max(0.0)).max(0.0),
            _ => self.remaining_ms.max(0.0),
        }
    }

    /// Begin (or restart the clock of) the countdown.
    ///
    /// Returns `false` when auto-dismiss is disabled, the duration is not
    /// positive, or the toast is paused or on its way out.
    pub fn start_countdown(&mut self, now: f64) -> bool {
        if !self.countdown_enabled() {
            return false;
        }
        match self.phase {
            ToastPhase::Showing => {}
            // Fold elapsed time in before restarting so the remainder never resets.
            ToastPhase::CountingDown => self.remaining_ms = self.remaining_at(now),
            ToastPhase::Paused | ToastPhase::Dismissing | ToastPhase::Removed => return false,
        }
        self.phase = ToastPhase::CountingDown;
        self.started_at = Some(now);
        true
    }

    pub fn tick(&self, now: f64) -> Tick {
        if self.phase != ToastPhase::CountingDown {
            return Tick::Idle;
        }
        let remaining = self.remaining_at(now);
        if remaining <= 0.0 {
            Tick::Expired
        } else {
            Tick::Progress((remaining / self.duration_ms).min(1.0))
        }
    }

    /// Freeze the countdown. Returns `false` (no-op) unless hover pausing is
    /// enabled and the toast is counting down.
    pub fn pause(&mut self, now: f64) -> bool {
        if !self.hover_pauses() || self.phase != ToastPhase::CountingDown {
            return false;
        }
        self.remaining_ms = self.remaining_at(now);
        self.started_at = None;
        self.phase = ToastPhase::Paused;
        true
    }

    /// Continue from the stored remainder. Returns `false` unless paused.
    pub fn resume(&mut self, now: f64) -> bool {
        if self.phase != ToastPhase::Paused {
            return false;
        }
        self.phase = ToastPhase::CountingDown;
        self.started_at = Some(now);
        true
    }

    /// Enter `Dismissing`. Returns `false` when already leaving or removed.
    pub fn begin_dismiss(&mut self, now: f64) -> bool {
        match self.phase {
            ToastPhase::Dismissing | ToastPhase::Removed => false,
            ToastPhase::Showing | ToastPhase::CountingDown | ToastPhase::Paused => {
                self.remaining_ms = self.remaining_at(now);
                self.started_at = None;
                self.phase = ToastPhase::Dismissing;
                true
            }
        }
    }

    /// Enter the terminal `Removed` phase. Only valid from `Dismissing`.
    pub fn finish_removal(&mut self) -> bool {
        if self.phase != ToastPhase::Dismissing {
            return false;
        }
        self.phase = ToastPhase::Removed;
        true
    }
}
