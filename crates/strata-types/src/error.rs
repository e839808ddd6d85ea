use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("invalid object identifier: {0}")]
    InvalidId(String),

    #[error("attribute '{key}' does not accept {kind} values")]
    AttributeType { key: String, kind: String },

    #[error("value map code 0 is reserved for 'Unknown'")]
    ReservedCode,

    #[error("array kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("array range out of bounds: offset {offset}, count {count}, len {len}")]
    OutOfBounds {
        offset: usize,
        count: usize,
        len: usize,
    },
}
