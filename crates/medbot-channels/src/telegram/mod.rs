//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Inbound updates are pushed into the event sink from a Tokio task.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
mod send;
pub(crate) mod types;


use crate::roster::Roster;
use async_trait::async_trait;
use medbot_core::{config::TelegramConfig, error::MedbotError, traits::RecipientResolver};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    /// Display name -> user id, seeded from config and learned from updates.
    roster: Arc<Roster>,
    /// Long-polling task, set by `subscribe()`.
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        let roster = Arc::new(Roster::from_contacts(config.contacts.clone()));
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
            roster,
            poller: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RecipientResolver for TelegramChannel {
    async fn resolve(&self, display_name: &str) -> Result<String, MedbotError> {
        self.roster
            .lookup(display_name)
            .ok_or_else(|| MedbotError::RecipientNotFound(display_name.to_string()))
    }
}
