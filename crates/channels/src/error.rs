use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared by the bridge, flip pass and REST adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested channel does not exist or is not a guild channel.
    #[error("unknown channel: {channel_id}")]
    UnknownChannel { channel_id: u64 },

    /// Operation is currently unavailable (gateway not ready, queue closed).
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from the platform SDK.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn unknown_channel(channel_id: u64) -> Self {
        Self::UnknownChannel { channel_id }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
