//! Error types for the exposure engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GexError {
    /// Chain payload missing, empty, or unusable. Callers treat this as
    /// recoverable and render their unavailable state.
    #[error("Data unavailable: {0}")]
    Data(String),

    /// No usable risk-free rate observation within the bounded lookback.
    /// Fatal for the request that needed it.
    #[error("Rate unavailable: {0}")]
    Rate(String),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type GexResult<T> = Result<T, GexError>;

impl GexError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn rate(msg: impl Into<String>) -> Self {
        Self::Rate(msg.into())
    }

    pub fn calendar(msg: impl Into<String>) -> Self {
        Self::Calendar(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True when the caller can degrade gracefully instead of failing
    /// the whole request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

impl From<serde_json::Error> for GexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for GexError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
