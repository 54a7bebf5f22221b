//! Message pools and the affirmative-reply predicate.

use medbot_core::{config::MessagesConfig, error::MedbotError};
use rand::seq::SliceRandom;
use std::fmt;

/// Which pool an outbound message is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Alarm,
    Reminder,
    Praise,
    GiveUp,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alarm => write!(f, "alarm"),
            Self::Reminder => write!(f, "reminder"),
            Self::Praise => write!(f, "praise"),
            Self::GiveUp => write!(f, "give-up"),
        }
    }
}

/// Non-empty text pools, one per [`MessageKind`].
#[derive(Debug, Clone)]
pub struct MessagePools {
    alarm: Vec<String>,
    reminder: Vec<String>,
    praise: Vec<String>,
    give_up: Vec<String>,
}

impl MessagePools {
    /// Build pools from config, dropping blank entries.
    pub fn from_config(cfg: &MessagesConfig) -> Result<Self, MedbotError> {
        Ok(Self {
            alarm: non_empty("alarm", &cfg.alarm)?,
            reminder: non_empty("reminder", &cfg.reminder)?,
            praise: non_empty("praise", &cfg.praise)?,
            give_up: non_empty("give_up", &cfg.give_up)?,
        })
    }

    pub fn pool(&self, kind: MessageKind) -> &[String] {
        match kind {
            MessageKind::Alarm => &self.alarm,
            MessageKind::Reminder => &self.reminder,
            MessageKind::Praise => &self.praise,
            MessageKind::GiveUp => &self.give_up,
        }
    }

    /// Pick one message uniformly at random.
    pub fn pick(&self, kind: MessageKind) -> String {
        self.pool(kind)
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }
}

fn non_empty(name: &str, pool: &[String]) -> Result<Vec<String>, MedbotError> {
    let kept: Vec<String> = pool
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if kept.is_empty() {
        return Err(MedbotError::Config(format!(
            "messages.{name} must contain at least one message"
        )));
    }
    Ok(kept)
}

/// A reply counts as positive when its trimmed, lowercased text starts with "yes".
pub fn is_affirmative(text: &str) -> bool {
    text.trim().to_lowercase().starts_with("yes")
}
