//! Error types for the concatenated storage core.

use strata_types::{ObjectId, SupportKind};

/// Errors that can occur in concatenated store operations.
///
/// All of these indicate programming errors or invalid input, not transient
/// failures; none are retried or recovered internally. A failed write leaves
/// the store in its pre-call state.
#[derive(Debug, thiserror::Error)]
pub enum ConcatError {
    /// The object id is not registered in this store.
    #[error("object {0} is not registered in this store")]
    UnknownObject(ObjectId),

    /// A column with this name already exists on the object.
    #[error("data with name '{name}' already present on object {object}")]
    DuplicateColumn { object: ObjectId, name: String },

    /// The name collides with a support array name.
    #[error("'{0}' is a reserved array name")]
    ReservedName(String),

    /// The object has no range for this attribute.
    #[error("object {object} has no data for attribute '{name}'")]
    MissingAttribute { object: ObjectId, name: String },

    /// Support coordinates are required but none were supplied, or the
    /// object has no support array of the requested kind.
    #[error("no {0} support available for this operation")]
    MissingSupport(SupportKind),

    /// A value buffer does not match the required row count.
    #[error("value length {actual} does not match expected row count {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// No property group with this name on the object.
    #[error("object {object} has no property group named '{name}'")]
    GroupNotFound { object: ObjectId, name: String },

    /// Type-level failure (kind mismatch, attribute validation, bounds).
    #[error("type error: {0}")]
    Type(#[from] strata_types::TypeError),

    /// Index table failure (duplicate range, non-terminal extend, overflow).
    #[error("index error: {0}")]
    Index(#[from] strata_index::IndexError),

    /// Merge failure (invalid tolerance).
    #[error("merge error: {0}")]
    Merge(#[from] strata_merge::MergeError),

    /// Container I/O failure during save or load.
    #[error("container error: {0}")]
    Container(#[from] strata_store::ContainerError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted or in-memory state violates a structural invariant.
    #[error("corrupt store state: {0}")]
    Corrupt(String),
}

/// Convenience alias for concatenated store results.
pub type ConcatResult<T> = Result<T, ConcatError>;
