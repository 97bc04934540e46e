use thiserror::Error;

/// Shared error type used across all vippulse crates.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No snapshot weeks available; analysis unavailable")]
    NoSnapshots,

    #[error("No transactions available; analysis unavailable")]
    NoTransactions,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] eyre::Error),
}

impl AppError {
    /// Whether the error means a required input was missing entirely, as opposed
    /// to a failure while reading or writing one.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NoSnapshots | Self::NoTransactions)
    }
}
