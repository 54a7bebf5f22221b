use thiserror::Error;

/// Top-level error type for MedBot.
#[derive(Debug, Error)]
pub enum MedbotError {
    /// A send or connect failure in the chat transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The display name did not resolve to a transport-native identifier.
    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    /// Invalid or incomplete configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A confirmation cycle is already in progress.
    #[error("a confirmation cycle is already active")]
    CycleActive,

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MedbotError {
    /// Whether this error is a missing recipient (as opposed to a transport failure).
    pub fn is_recipient_not_found(&self) -> bool {
        matches!(self, Self::RecipientNotFound(_))
    }
}
