//! The agent loop, joining the alarm scheduler, the reminder engine and the
//! chat transport.
//!
//! Between cycles the loop drains inbound events (the engine ignores them
//! while idle); when the alarm fires it hands the queue to the engine for
//! one full cycle and only then computes the next alarm.

use crate::alarm::AlarmScheduler;
use crate::reminder::ReminderEngine;
use chrono::{Local, NaiveDateTime};
use medbot_core::{
    error::MedbotError,
    sink::{EventQueue, EventSink},
    traits::ChatGateway,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Source of local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct Agent {
    engine: Arc<ReminderEngine>,
    scheduler: AlarmScheduler,
    gateway: Arc<dyn ChatGateway>,
    clock: Clock,
}

impl Agent {
    pub fn new(
        engine: Arc<ReminderEngine>,
        scheduler: AlarmScheduler,
        gateway: Arc<dyn ChatGateway>,
    ) -> Self {
        Self {
            engine,
            scheduler,
            gateway,
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run until `shutdown` is cancelled, then stop the transport.
    ///
    /// Returns an error if the transport cannot be subscribed or if a cycle
    /// cannot start because the recipient has no conversation.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), MedbotError> {
        let (sink, mut queue) = EventSink::channel();
        self.gateway.subscribe(sink).await?;

        let settings = self.engine.settings();
        info!(
            "MedBot agent running | transport: {} ({}) | recipient: {} | alarm: {} | retries: {} x {}s",
            self.gateway.name(),
            self.gateway.delivery(),
            settings.recipient,
            self.scheduler.alarm_time().format("%H:%M"),
            settings.max_retries,
            settings.retry_interval.as_secs(),
        );

        let result = self.serve(&mut queue, &shutdown).await;

        if let Err(e) = self.gateway.stop().await {
            warn!("failed to stop transport {}: {e}", self.gateway.name());
        }
        info!("Shutdown complete.");
        result
    }

    async fn serve(
        &mut self,
        queue: &mut EventQueue,
        shutdown: &CancellationToken,
    ) -> Result<(), MedbotError> {
        loop {
            let now = (self.clock)();
            let fire_at = self.scheduler.next_fire(now);
            let wait = AlarmScheduler::wait_until(fire_at, now);
            info!("next alarm at {fire_at} (in {}s)", wait.as_secs());

            let alarm = tokio::time::sleep(wait);
            tokio::pin!(alarm);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        info!("Received shutdown signal");
                        return Ok(());
                    }
                    Some(event) = queue.recv() => {
                        self.engine.handle_event(event).await;
                    }
                    _ = &mut alarm => break,
                }
            }

            let outcome = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Received shutdown signal, abandoning cycle");
                    return Ok(());
                }
                outcome = self.engine.run_cycle(queue) => outcome?,
            };
            info!("cycle for {} finished: {outcome:?}", fire_at.date());
            self.scheduler.mark_fired(fire_at.date());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::CycleState;
    use crate::testing::{engine_with, MockGateway, ALARM, GIVE_UP, PRAISE, REMINDER};
    use medbot_core::message::InboundEvent;
    use std::time::Duration;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    /// Wall clock that starts at `base` and follows Tokio's (paused) clock.
    fn following_clock(base: NaiveDateTime) -> Clock {
        let start = tokio::time::Instant::now();
        Arc::new(move || {
            base + chrono::Duration::from_std(start.elapsed()).unwrap_or_else(|_| chrono::Duration::zero())
        })
    }

    fn scheduler() -> AlarmScheduler {
        AlarmScheduler::new(
            chrono::NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            Duration::from_secs(15),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_within_guard_fires_and_confirms() {
        let gateway = MockGateway::with_recipient("Buddy", "42");
        let engine = engine_with(&gateway, 3, Duration::from_secs(1200));
        let agent = Agent::new(engine.clone(), scheduler(), gateway.clone())
            .with_clock(following_clock(at("2026-10-18 20:00:05")));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(agent.run(shutdown.clone()));

        gateway.wait_for_sends(1).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(gateway.deliver(InboundEvent::new("mock", "42", "yes please")));
        gateway.wait_for_sends(2).await;

        // Nothing else today, even hours later.
        tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(gateway.texts(), vec![ALARM, PRAISE]);
        assert_eq!(engine.state(), CycleState::Idle);
        assert!(gateway.stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replies_between_cycles_are_ignored() {
        let gateway = MockGateway::with_recipient("Buddy", "42");
        let engine = engine_with(&gateway, 3, Duration::from_secs(1200));
        let agent = Agent::new(engine.clone(), scheduler(), gateway.clone())
            .with_clock(following_clock(at("2026-10-18 12:00:00")));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(agent.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(gateway.deliver(InboundEvent::new("mock", "42", "yes")));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(gateway.texts().is_empty());
        assert_eq!(engine.state(), CycleState::Idle);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_alarm_is_scheduled_after_give_up() {
        let gateway = MockGateway::with_recipient("Buddy", "42");
        let engine = engine_with(&gateway, 1, Duration::from_secs(600));
        let agent = Agent::new(engine.clone(), scheduler(), gateway.clone())
            .with_clock(following_clock(at("2026-10-18 19:59:00")));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(agent.run(shutdown.clone()));

        // Day one: alarm, one reminder, give-up. Day two: alarm.
        gateway.wait_for_sends(4).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let sent = gateway.sent();
        assert_eq!(
            gateway.texts(),
            vec![ALARM, REMINDER, GIVE_UP, ALARM]
        );
        let day_gap = sent[3].at - sent[0].at;
        assert!(day_gap >= Duration::from_secs(24 * 3600));
        assert!(day_gap < Duration::from_secs(24 * 3600 + 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_recipient_stops_agent() {
        let gateway = MockGateway::with_recipient("Someone Else", "7");
        let engine = engine_with(&gateway, 3, Duration::from_secs(1200));
        let agent = Agent::new(engine, scheduler(), gateway.clone())
            .with_clock(following_clock(at("2026-10-18 19:59:30")));

        let err = agent.run(CancellationToken::new()).await.unwrap_err();
        assert!(err.is_recipient_not_found());
        assert!(gateway.texts().is_empty());
        assert!(gateway.stopped());
    }
}
