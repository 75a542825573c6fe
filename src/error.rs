//! Error types shared across the relay.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("Consumer unavailable: {0}")]
    ConsumerUnavailable(String),
    #[error("Control error: {0}")]
    Control(String),
}
