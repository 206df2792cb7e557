//! Homing attempt bookkeeping.
//!
//! ```text
//!              begin(kind)                complete(ok)
//!   ┌──────┐ ─────────────▶ ┌──────────┐ ─────────────▶ ┌──────────────┐
//!   │ Idle │                │  Homing  │                │ AutoExtending│
//!   └──────┘ ◀───────────── └──────────┘                └──────────────┘
//!      ▲      cancel / complete(fail)                          │
//!      └────────────────────── extend_issued ─────────────────┘
//! ```
//!
//! Every attempt gets a fresh number.  The motion controller reports back
//! through a one-shot [`HomingCompletion`] carrying that number, so a
//! completion for an attempt that was cancelled or superseded is
//! recognised as stale and discarded.

use std::sync::Arc;

use crate::link::mailbox::Mailbox;

use super::commands::HomeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    Idle,
    Homing { kind: HomeKind, attempt: u32 },
    /// Home found; the auto-extend move is being issued.
    AutoExtending,
}

/// What the dispatcher should do with a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    Failed,
    /// The report does not belong to the attempt in flight.
    Stale,
}

pub struct HomingTracker {
    phase: HomingPhase,
    next_attempt: u32,
}

impl HomingTracker {
    pub fn new() -> Self {
        Self {
            phase: HomingPhase::Idle,
            next_attempt: 1,
        }
    }

    /// Start a new attempt, superseding any attempt in flight.
    pub fn begin(&mut self, kind: HomeKind) -> u32 {
        let attempt = self.next_attempt;
        self.next_attempt = self.next_attempt.wrapping_add(1).max(1);
        self.phase = HomingPhase::Homing { kind, attempt };
        attempt
    }

    /// Abandon the attempt in flight, if any.  Returns its number.
    pub fn cancel(&mut self) -> Option<u32> {
        match self.phase {
            HomingPhase::Homing { attempt, .. } => {
                self.phase = HomingPhase::Idle;
                Some(attempt)
            }
            _ => None,
        }
    }

    /// Match a completion report against the attempt in flight.
    pub fn complete(&mut self, attempt: u32, success: bool) -> Completion {
        match self.phase {
            HomingPhase::Homing { attempt: current, .. } if current == attempt => {
                if success {
                    self.phase = HomingPhase::AutoExtending;
                    Completion::Succeeded
                } else {
                    self.phase = HomingPhase::Idle;
                    Completion::Failed
                }
            }
            _ => Completion::Stale,
        }
    }

    pub fn extend_issued(&mut self) {
        if self.phase == HomingPhase::AutoExtending {
            self.phase = HomingPhase::Idle;
        }
    }

    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    pub fn in_flight(&self) -> Option<u32> {
        match self.phase {
            HomingPhase::Homing { attempt, .. } => Some(attempt),
            _ => None,
        }
    }
}

impl Default for HomingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot completion handle passed to the motion controller.
///
/// Consuming `finish` guarantees at most one report per attempt.  Dropping
/// the handle without finishing (an aborted attempt) reports nothing.
pub struct HomingCompletion {
    attempt: u32,
    mailbox: Arc<Mailbox>,
}

impl HomingCompletion {
    pub fn new(attempt: u32, mailbox: Arc<Mailbox>) -> Self {
        Self { attempt, mailbox }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Report the outcome to the control loop.  Safe to call from any
    /// thread; the report is handled on the next loop iteration.
    pub fn finish(self, success: bool) {
        self.mailbox.complete_homing(self.attempt, success);
    }
}

impl core::fmt::Debug for HomingCompletion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HomingCompletion")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}
