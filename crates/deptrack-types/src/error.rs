use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown graph item type: {0}")]
    UnknownItemType(String),

    #[error("unknown payload encoding: {0}")]
    UnknownEncoding(i32),

    #[error("payload decode error for {item_type}: {reason}")]
    Payload { item_type: String, reason: String },
}
