use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Identifier errors
    #[error("Invalid template id: {0}")]
    InvalidTemplateId(String),

    #[error("Invalid feature slot: {0}")]
    InvalidFeatureSlot(u8),

    // Payload errors
    #[error("Invalid template length: expected {expected} bytes, got {actual}")]
    InvalidTemplateLength { expected: usize, actual: usize },

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    // State errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
