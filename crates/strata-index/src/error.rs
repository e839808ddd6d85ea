//! Error types for the index crate.

use strata_types::ObjectId;

/// Errors that can occur during index table operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The object already has a range for this attribute.
    #[error("object {0} already has a range in this table")]
    DuplicateRange(ObjectId),

    /// Ranges must cover at least one row; absence of data is absence of
    /// the range, not a zero-length one.
    #[error("cannot record an empty range for object {0}")]
    EmptyRange(ObjectId),

    /// The object has no range in this table.
    #[error("object {0} has no range in this table")]
    RangeNotFound(ObjectId),

    /// Only the last range in offset order can grow in place; anything else
    /// requires a relocation (remove, re-append, copy forward).
    #[error("cannot extend non-terminal range for object {0} in place")]
    NonTerminalExtend(ObjectId),

    /// A row count or offset does not fit the 32-bit index representation.
    #[error("index value {0} exceeds the 32-bit range")]
    Overflow(usize),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
