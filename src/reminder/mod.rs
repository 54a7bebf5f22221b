//! Reminder engine: the confirmation state machine and its retry policy.
//!
//! The cycle lives behind a `std::sync::Mutex`. Every transition is one
//! critical section; the lock is never held across an `.await`, and messages
//! are sent only after it is released. A valid positive reply cancels the
//! cycle's token so the pending retry timer never produces another prompt.

mod cycle;
mod messages;


pub use cycle::{ConfirmationCycle, CycleOutcome, CycleState, TimerStep};
pub use messages::{is_affirmative, MessageKind, MessagePools};

use chrono::Utc;
use medbot_core::{
    config::{Config, SECS_PER_DAY},
    error::MedbotError,
    message::{InboundEvent, Recipient},
    sink::EventQueue,
    traits::{ChatGateway, RecipientResolver},
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Retry policy and texts for the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub recipient: String,
    pub retry_interval: Duration,
    pub max_retries: u32,
    pub pools: MessagePools,
}

impl EngineSettings {
    pub fn from_config(cfg: &Config) -> Result<Self, MedbotError> {
        Ok(Self {
            recipient: cfg.reminder.recipient.trim().to_string(),
            retry_interval: cfg.reminder.retry_interval(),
            max_retries: cfg.reminder.max_retries,
            pools: MessagePools::from_config(&cfg.messages)?,
        })
    }
}

/// Why an inbound event left the cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No cycle is waiting for a reply.
    Idle,
    NotRecipient,
    NotAffirmative,
    /// The recipient could not be resolved to compare against.
    RecipientUnavailable,
}

/// Result of feeding one signal to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Reminded { cycle_id: u64, retry: u32 },
    Confirmed { cycle_id: u64 },
    GivenUp { cycle_id: u64 },
    Ignored(IgnoreReason),
    /// Another signal already moved the cycle on.
    Superseded,
}

/// Handle for a freshly started cycle.
#[derive(Debug, Clone)]
pub struct CycleTicket {
    pub cycle_id: u64,
    /// Cancelled once the cycle reaches a terminal state.
    pub cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Shared {
    cycle: ConfirmationCycle,
    recipient: Recipient,
    cancel: Option<CancellationToken>,
    last_outcome: Option<(u64, CycleOutcome)>,
    next_id: u64,
}

impl Shared {
    /// Close out a terminal cycle: reset to idle and release its token.
    fn finish(&mut self) -> Option<CancellationToken> {
        if let Some(outcome) = self.cycle.finish() {
            self.last_outcome = Some((self.cycle.id, outcome));
        }
        self.cancel.take()
    }
}

/// Owns the confirmation cycle and drives the chat gateway.
pub struct ReminderEngine {
    settings: EngineSettings,
    gateway: Arc<dyn ChatGateway>,
    resolver: Arc<dyn RecipientResolver>,
    shared: Mutex<Shared>,
}

impl ReminderEngine {
    pub fn new(
        settings: EngineSettings,
        gateway: Arc<dyn ChatGateway>,
        resolver: Arc<dyn RecipientResolver>,
    ) -> Self {
        let shared = Shared {
            recipient: Recipient::new(&settings.recipient),
            ..Default::default()
        };
        Self {
            settings,
            gateway,
            resolver,
            shared: Mutex::new(shared),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current cycle.
    pub fn snapshot(&self) -> ConfirmationCycle {
        self.lock().cycle.clone()
    }

    pub fn state(&self) -> CycleState {
        self.lock().cycle.state
    }

    /// Recipient with the identifier seen on the last lookup.
    pub fn recipient(&self) -> Recipient {
        self.lock().recipient.clone()
    }

    /// Outcome of the most recently finished cycle.
    pub fn last_outcome(&self) -> Option<(u64, CycleOutcome)> {
        self.lock().last_outcome
    }

    /// `Idle -> AwaitingReply`: send the alarm and open a new cycle.
    ///
    /// Fails with `RecipientNotFound` if there is nobody to talk to, and with
    /// `CycleActive` if a cycle is already running. Either way the state is
    /// left as it was.
    pub async fn start_cycle(&self) -> Result<CycleTicket, MedbotError> {
        let busy = self.lock().cycle.is_awaiting();
        if busy {
            return Err(MedbotError::CycleActive);
        }

        let resolved = match self.resolver.resolve(&self.settings.recipient).await {
            Ok(id) => id,
            Err(e) => {
                error!(
                    "cannot start cycle, no conversation with '{}': {e}",
                    self.settings.recipient
                );
                return Err(e);
            }
        };

        let (ticket, text) = {
            let mut shared = self.lock();
            let id = shared.next_id + 1;
            shared.cycle.start(id, Utc::now())?;
            shared.next_id = id;
            shared.recipient.resolved_id = Some(resolved);
            let cancel = CancellationToken::new();
            shared.cancel = Some(cancel.clone());
            let ticket = CycleTicket {
                cycle_id: id,
                cancel,
            };
            (ticket, self.settings.pools.pick(MessageKind::Alarm))
        };

        info!(
            "cycle {}: alarm triggered for '{}'",
            ticket.cycle_id, self.settings.recipient
        );
        self.deliver(ticket.cycle_id, MessageKind::Alarm, &text).await;
        Ok(ticket)
    }

    /// Feed one inbound event to the engine.
    ///
    /// Only a positive reply from the recipient while a cycle awaits one moves
    /// the state machine; everything else is logged and ignored.
    pub async fn handle_event(&self, event: InboundEvent) -> Transition {
        let awaiting = self.lock().cycle.is_awaiting();
        if !awaiting {
            info!(
                "reply from {} while idle, ignoring",
                event.sender_name.as_deref().unwrap_or(&event.sender_id)
            );
            return Transition::Ignored(IgnoreReason::Idle);
        }

        let recipient_id = match self.resolver.resolve(&self.settings.recipient).await {
            Ok(id) => id,
            Err(e) => {
                warn!("cannot check sender {}: {e}", event.sender_id);
                return Transition::Ignored(IgnoreReason::RecipientUnavailable);
            }
        };
        if event.sender_id != recipient_id {
            debug!("message from non-recipient {}, ignoring", event.sender_id);
            return Transition::Ignored(IgnoreReason::NotRecipient);
        }
        if !is_affirmative(&event.text) {
            info!("reply from recipient is not a confirmation, still waiting");
            return Transition::Ignored(IgnoreReason::NotAffirmative);
        }

        let (cycle_id, cancel, text) = {
            let mut shared = self.lock();
            shared.recipient.resolved_id = Some(recipient_id);
            if !shared.cycle.confirm() {
                info!(
                    "positive reply superseded, cycle {} already {}",
                    shared.cycle.id, shared.cycle.state
                );
                return Transition::Superseded;
            }
            let cycle_id = shared.cycle.id;
            let cancel = shared.finish();
            (cycle_id, cancel, self.settings.pools.pick(MessageKind::Praise))
        };

        if let Some(token) = cancel {
            token.cancel();
        }
        info!("cycle {cycle_id}: positive reply received");
        self.deliver(cycle_id, MessageKind::Praise, &text).await;
        Transition::Confirmed { cycle_id }
    }

    /// The retry timer of `cycle_id` expired without a confirmation.
    pub async fn on_timer_elapsed(&self, cycle_id: u64) -> Transition {
        let (step, cancel, text) = {
            let mut shared = self.lock();
            let step = shared
                .cycle
                .timer_elapsed(cycle_id, self.settings.max_retries, Utc::now());
            match step {
                TimerStep::Remind { .. } => {
                    (step, None, self.settings.pools.pick(MessageKind::Reminder))
                }
                TimerStep::GiveUp => {
                    let cancel = shared.finish();
                    (step, cancel, self.settings.pools.pick(MessageKind::GiveUp))
                }
                TimerStep::Superseded => {
                    info!(
                        "timer for cycle {cycle_id} superseded, cycle {} is {}",
                        shared.cycle.id, shared.cycle.state
                    );
                    return Transition::Superseded;
                }
            }
        };

        match step {
            TimerStep::Remind { retry } => {
                info!(
                    "cycle {cycle_id}: no reply yet, reminder {retry}/{}",
                    self.settings.max_retries
                );
                self.deliver(cycle_id, MessageKind::Reminder, &text).await;
                Transition::Reminded { cycle_id, retry }
            }
            _ => {
                if let Some(token) = cancel {
                    token.cancel();
                }
                info!("cycle {cycle_id}: retries exhausted, giving up");
                self.deliver(cycle_id, MessageKind::GiveUp, &text).await;
                Transition::GivenUp { cycle_id }
            }
        }
    }

    /// Run one full cycle: alarm, reminders, and a terminal outcome.
    ///
    /// Waits on the cycle's cancellation, the inbound queue and the retry
    /// deadline, in that priority order, so a reply that is ready together
    /// with the timer is always handled first.
    pub async fn run_cycle(&self, queue: &mut EventQueue) -> Result<CycleOutcome, MedbotError> {
        let ticket = self.start_cycle().await?;
        let cycle_id = ticket.cycle_id;
        let mut deadline = self.next_deadline();

        loop {
            tokio::select! {
                biased;
                _ = ticket.cancel.cancelled() => {
                    return Ok(self.outcome_of(cycle_id));
                }
                Some(event) = queue.recv() => {
                    self.handle_event(event).await;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    match self.on_timer_elapsed(cycle_id).await {
                        Transition::Reminded { .. } => {
                            deadline = self.next_deadline();
                        }
                        Transition::GivenUp { .. } => return Ok(CycleOutcome::GivenUp),
                        _ => return Ok(self.outcome_of(cycle_id)),
                    }
                }
            }
        }
    }

    fn next_deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.settings.retry_interval)
            .unwrap_or_else(|| now + Duration::from_secs(SECS_PER_DAY))
    }

    /// Outcome recorded for `cycle_id` when its token was cancelled.
    fn outcome_of(&self, cycle_id: u64) -> CycleOutcome {
        let last = self.lock().last_outcome;
        match last {
            Some((id, outcome)) if id == cycle_id => outcome,
            other => {
                warn!("cycle {cycle_id} ended without its own outcome (last: {other:?}), assuming confirmed");
                CycleOutcome::Confirmed
            }
        }
    }

    /// Send one message. Failures are logged; the cycle carries on either way.
    async fn deliver(&self, cycle_id: u64, kind: MessageKind, text: &str) {
        match self
            .gateway
            .send_message(&self.settings.recipient, text)
            .await
        {
            Ok(()) => debug!("cycle {cycle_id}: sent {kind} message"),
            Err(MedbotError::RecipientNotFound(name)) => {
                warn!("cycle {cycle_id}: recipient '{name}' unavailable, skipping {kind} message")
            }
            Err(e) => error!("cycle {cycle_id}: failed to send {kind} message: {e}"),
        }
    }
}
