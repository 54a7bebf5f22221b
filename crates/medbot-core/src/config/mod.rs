mod channels;
mod defaults;

#[cfg(test)]
mod tests;

pub use channels::*;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::MedbotError;
use defaults::*;

/// Upper bound for `retry_interval_secs`; `guard_secs` must stay below it.
pub const SECS_PER_DAY: u64 = 86_400;

/// Top-level MedBot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub medbot: MedbotConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedbotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for MedbotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Alarm and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Display name of the person to remind.
    #[serde(default = "default_recipient")]
    pub recipient: String,
    /// Daily alarm time, `HH:MM` in local time.
    #[serde(default = "default_alarm_time")]
    pub alarm_time: String,
    /// Grace window after the alarm time during which a fresh start still
    /// fires today.
    #[serde(default = "default_guard_secs")]
    pub guard_secs: u64,
    /// Seconds to wait for a reply before re-prompting.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    /// Reminders sent after the alarm before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            recipient: default_recipient(),
            alarm_time: default_alarm_time(),
            guard_secs: default_guard_secs(),
            retry_interval_secs: default_retry_interval(),
            max_retries: default_max_retries(),
        }
    }
}

impl ReminderConfig {
    /// Parse `alarm_time` (`HH:MM` or `HH:MM:SS`).
    pub fn alarm_time(&self) -> Result<NaiveTime, MedbotError> {
        let raw = self.alarm_time.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|e| MedbotError::Config(format!("invalid alarm_time '{raw}': {e}")))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn guard(&self) -> Duration {
        Duration::from_secs(self.guard_secs)
    }
}

/// Message text pools. One entry is picked at random per send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_alarm_messages")]
    pub alarm: Vec<String>,
    #[serde(default = "default_reminder_messages")]
    pub reminder: Vec<String>,
    #[serde(default = "default_praise_messages")]
    pub praise: Vec<String>,
    #[serde(default = "default_give_up_messages")]
    pub give_up: Vec<String>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            alarm: default_alarm_messages(),
            reminder: default_reminder_messages(),
            praise: default_praise_messages(),
            give_up: default_give_up_messages(),
        }
    }
}

/// Async runtime flavor -- selects the scheduling model.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFlavor {
    /// Everything on one thread, cooperative scheduling.
    #[default]
    CurrentThread,
    /// Work-stealing pool; inbound events may arrive on any thread.
    MultiThread,
}

/// Runtime config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub flavor: RuntimeFlavor,
}

impl Config {
    /// Check everything the agent needs before it starts.
    pub fn validate(&self) -> Result<(), MedbotError> {
        if self.reminder.recipient.trim().is_empty() {
            return Err(MedbotError::Config("reminder.recipient is empty".into()));
        }
        self.reminder.alarm_time()?;
        if self.reminder.retry_interval_secs == 0 {
            return Err(MedbotError::Config(
                "reminder.retry_interval_secs must be greater than zero".into(),
            ));
        }
        if self.reminder.retry_interval_secs > SECS_PER_DAY {
            return Err(MedbotError::Config(format!(
                "reminder.retry_interval_secs must be at most {SECS_PER_DAY}"
            )));
        }
        if self.reminder.guard_secs >= SECS_PER_DAY {
            return Err(MedbotError::Config(format!(
                "reminder.guard_secs must be less than {SECS_PER_DAY}"
            )));
        }

        let pools = [
            ("alarm", &self.messages.alarm),
            ("reminder", &self.messages.reminder),
            ("praise", &self.messages.praise),
            ("give_up", &self.messages.give_up),
        ];
        for (name, pool) in pools {
            if pool.iter().all(|m| m.trim().is_empty()) {
                return Err(MedbotError::Config(format!(
                    "messages.{name} must contain at least one message"
                )));
            }
        }

        if self.channel.transport == Transport::Telegram {
            let token = self
                .channel
                .telegram
                .as_ref()
                .map(|tg| tg.bot_token.as_str())
                .unwrap_or_default();
            if token.is_empty() {
                return Err(MedbotError::Config(
                    "transport is telegram but channel.telegram.bot_token is empty".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. The result is not
/// validated; call [`Config::validate`] before starting the agent.
pub fn load(path: &str) -> Result<Config, MedbotError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| MedbotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| MedbotError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
