use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound chat message delivered by a transport.
///
/// Consumed by the reminder engine within a single handling step and never
/// retained afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: Uuid,
    /// Transport name (e.g. "telegram", "console").
    pub channel: String,
    /// Transport-native sender identifier.
    pub sender_id: String,
    /// Human-readable sender name, when the transport knows it.
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Build an event stamped with the current time.
    pub fn new(channel: &str, sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            text: text.to_string(),
            received_at: Utc::now(),
        }
    }

    /// Attach a display name to the event.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}

/// The person being reminded.
///
/// `resolved_id` is refreshed on every lookup; it only records the last
/// identifier the transport reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub display_name: String,
    pub resolved_id: Option<String>,
}

impl Recipient {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            resolved_id: None,
        }
    }
}
