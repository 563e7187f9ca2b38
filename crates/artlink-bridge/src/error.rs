//! Bridge error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("bind failed: {0}")]
    BindFailed(String),

    #[error("serial open failed on {port}: {reason}")]
    SerialOpen { port: String, reason: String },

    #[error("serial write failed on {port}: {reason}")]
    SerialWrite { port: String, reason: String },

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
