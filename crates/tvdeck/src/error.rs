use std::time::Duration;

/// Failures the presentation engine knows how to degrade from.
///
/// None of these ever reach the rotation timers: fetch errors are absorbed by
/// the refresh controller (keep the last good deck), notification errors by
/// the channel supervisor (log and reconnect).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PresentationError {
    #[error("deck fetch timed out after {}s", after.as_secs())]
    FetchTimeout { after: Duration },

    #[error("deck fetch failed: {0}")]
    FetchNetwork(String),

    #[error("deck server answered {status}: {message}")]
    FetchServer { status: u16, message: String },

    #[error("deck document is malformed: {0}")]
    MalformedDeck(String),

    #[error("unknown slide type `{0}`")]
    UnknownSlideType(String),

    #[error("deck contains no slides")]
    EmptyDeck,

    #[error("notification channel dropped: {0}")]
    ConnectionDropped(String),
}

impl PresentationError {
    /// Whether the screen should offer a retry for this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout { .. }
                | Self::FetchNetwork(_)
                | Self::FetchServer { .. }
                | Self::MalformedDeck(_)
                | Self::ConnectionDropped(_)
        )
    }
}
