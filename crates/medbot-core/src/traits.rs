use crate::{error::MedbotError, sink::EventSink};
use async_trait::async_trait;
use std::fmt;

/// How a transport hands inbound events to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStyle {
    /// Pushed from a task on the async runtime.
    Cooperative,
    /// Pushed from a dedicated OS listener thread.
    ListenerThread,
}

impl fmt::Display for DeliveryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cooperative => write!(f, "cooperative"),
            Self::ListenerThread => write!(f, "listener-thread"),
        }
    }
}

/// Chat transport capability. The only way the agent talks to people.
///
/// Every transport (Telegram, console, ...) implements this trait so the
/// reminder engine is written once, independent of delivery model.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// The delivery model used for inbound events.
    fn delivery(&self) -> DeliveryStyle;

    /// Start delivering inbound events into `sink`.
    async fn subscribe(&self, sink: EventSink) -> Result<(), MedbotError>;

    /// Send a text message to a recipient, addressed by display name.
    ///
    /// Fails with `RecipientNotFound` when the name cannot be resolved and
    /// with `Transport` when delivery itself fails.
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), MedbotError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), MedbotError>;
}

/// Maps a human display name to a transport-native identifier.
///
/// Called on every alarm cycle and every inbound event, so it must be cheap
/// and tolerate the identifier disappearing transiently.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// Resolve `display_name`, or fail with `RecipientNotFound`.
    async fn resolve(&self, display_name: &str) -> Result<String, MedbotError>;
}
