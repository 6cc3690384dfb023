use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheenError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl SheenError {
    /// Errors that are allowed to reach the person at the keyboard.
    /// Validation and configuration problems are caught before any remote call;
    /// persistence problems are swallowed by the store.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, SheenError>;
