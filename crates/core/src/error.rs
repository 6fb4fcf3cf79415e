#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Missing or malformed user input. The request is never sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An operation was attempted before its prerequisite state exists.
    #[error("Not ready: {0}")]
    Configuration(String),

    /// The reference frame could not be captured or cropped.
    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The user-facing message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::Frame(msg)
            | Self::Internal(msg) => msg,
        }
    }
}
