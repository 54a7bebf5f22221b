//! Confirmation cycle state machine.
//!
//! Pure transitions only: no I/O and no locking. The engine wraps every
//! call in its critical section and performs the sends afterwards.

use chrono::{DateTime, Utc};
use medbot_core::error::MedbotError;
use std::fmt;

/// Where the current daily cycle stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CycleState {
    #[default]
    Idle,
    /// Alarm or reminder sent, waiting for a reply.
    AwaitingReply,
    Confirmed,
    GivenUp,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingReply => write!(f, "awaiting-reply"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::GivenUp => write!(f, "given-up"),
        }
    }
}

/// Terminal result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Confirmed,
    GivenUp,
}

/// What the timer firing did to the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStep {
    /// Send reminder number `retry`.
    Remind { retry: u32 },
    /// Retry budget exhausted.
    GiveUp,
    /// The signal belongs to a cycle that already ended.
    Superseded,
}

/// The unit of work for one daily alarm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationCycle {
    /// Identifier of the current (or last) cycle; 0 before the first one.
    pub id: u64,
    pub state: CycleState,
    pub retry_count: u32,
    /// When the last prompt went out.
    pub awaiting_since: Option<DateTime<Utc>>,
    pub positive_reply_received: bool,
}

impl ConfirmationCycle {
    pub fn is_awaiting(&self) -> bool {
        self.state == CycleState::AwaitingReply
    }

    /// `Idle -> AwaitingReply`.
    pub fn start(&mut self, id: u64, now: DateTime<Utc>) -> Result<(), MedbotError> {
        if self.state != CycleState::Idle {
            return Err(MedbotError::CycleActive);
        }
        self.id = id;
        self.state = CycleState::AwaitingReply;
        self.retry_count = 0;
        self.awaiting_since = Some(now);
        self.positive_reply_received = false;
        Ok(())
    }

    /// The retry timer of cycle `id` expired.
    pub fn timer_elapsed(&mut self, id: u64, max_retries: u32, now: DateTime<Utc>) -> TimerStep {
        if id != self.id || !self.is_awaiting() {
            return TimerStep::Superseded;
        }
        if self.retry_count < max_retries {
            self.retry_count += 1;
            self.awaiting_since = Some(now);
            TimerStep::Remind {
                retry: self.retry_count,
            }
        } else {
            self.state = CycleState::GivenUp;
            TimerStep::GiveUp
        }
    }

    /// A valid positive reply arrived. Returns `false` if nothing was awaited.
    pub fn confirm(&mut self) -> bool {
        if !self.is_awaiting() {
            return false;
        }
        self.positive_reply_received = true;
        self.state = CycleState::Confirmed;
        true
    }

    /// `Confirmed | GivenUp -> Idle`, returning the outcome that was reached.
    pub fn finish(&mut self) -> Option<CycleOutcome> {
        let outcome = match self.state {
            CycleState::Confirmed => CycleOutcome::Confirmed,
            CycleState::GivenUp => CycleOutcome::GivenUp,
            CycleState::Idle | CycleState::AwaitingReply => return None,
        };
        self.state = CycleState::Idle;
        self.awaiting_since = None;
        Some(outcome)
    }
}
