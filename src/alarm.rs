//! Daily alarm scheduling.
//!
//! The next alarm is computed only after the previous cycle has finished, so
//! cycles can never overlap no matter how long one takes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use medbot_core::{config::ReminderConfig, error::MedbotError};
use std::time::Duration;

/// Computes when the next daily alarm fires.
#[derive(Debug, Clone)]
pub struct AlarmScheduler {
    alarm_time: NaiveTime,
    guard: chrono::Duration,
    /// Date of the last alarm that actually fired.
    last_fired: Option<NaiveDate>,
}

impl AlarmScheduler {
    pub fn new(alarm_time: NaiveTime, guard: Duration) -> Self {
        Self {
            alarm_time,
            guard: chrono::Duration::from_std(guard).unwrap_or_else(|_| chrono::Duration::zero()),
            last_fired: None,
        }
    }

    pub fn from_config(cfg: &ReminderConfig) -> Result<Self, MedbotError> {
        Ok(Self::new(cfg.alarm_time()?, cfg.guard()))
    }

    pub fn alarm_time(&self) -> NaiveTime {
        self.alarm_time
    }

    /// The next firing instant as seen from `now` (local wall-clock time).
    ///
    /// Today's alarm is chosen while `now` is no later than the alarm time plus
    /// the guard interval, unless today's alarm already fired. Otherwise the
    /// alarm moves to tomorrow.
    pub fn next_fire(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.alarm_time);
        let fired_today = self.last_fired.is_some_and(|d| d >= now.date());
        let missed = today
            .checked_add_signed(self.guard)
            .is_some_and(|deadline| now > deadline);
        if fired_today || missed {
            today
                .checked_add_signed(chrono::Duration::days(1))
                .unwrap_or(today)
        } else {
            today
        }
    }

    /// How long to sleep from `now` until `fire_at`; zero if already due.
    pub fn wait_until(fire_at: NaiveDateTime, now: NaiveDateTime) -> Duration {
        (fire_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Time left from `now` until the next alarm.
    pub fn duration_until_next(&self, now: NaiveDateTime) -> Duration {
        Self::wait_until(self.next_fire(now), now)
    }

    /// Record that the alarm for `date` has fired.
    pub fn mark_fired(&mut self, date: NaiveDate) {
        self.last_fired = Some(date);
    }
}
