use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::defaults::default_poll_timeout;

/// Which transport carries the conversation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Telegram Bot API with long polling.
    Telegram,
    /// Local stdin/stdout chat (default, needs no credentials).
    #[default]
    Console,
}

impl Transport {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Telegram => "telegram",
            Self::Console => "console",
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub transport: Transport,
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Known contacts: display name -> chat id. Names seen in inbound
    /// messages are added at runtime.
    #[serde(default)]
    pub contacts: HashMap<String, i64>,
    /// Long-polling timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            contacts: HashMap::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Console transport config.
///
/// Input lines take the form `sender: text`. Without a contacts entry a
/// display name resolves to its lowercased form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConsoleConfig {
    /// Known contacts: display name -> sender token.
    #[serde(default)]
    pub contacts: HashMap<String, String>,
}
