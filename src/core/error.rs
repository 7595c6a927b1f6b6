//! Error types for chain-metrics

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

impl ChainError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
