use thiserror::Error;

/// Errors from container store operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is empty or otherwise unusable.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("container is read-only")]
    ReadOnly,
}

/// Result alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
