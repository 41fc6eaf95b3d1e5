/// Core error types for Rena
use thiserror::Error;

/// Result type alias using `RenaError`
pub type Result<T> = std::result::Result<T, RenaError>;

/// Core error type shared by collaborators
#[derive(Error, Debug)]
pub enum RenaError {
    /// A track was constructed without a file reference
    #[error("Track file reference is empty")]
    EmptyFile,

    /// A URL or path could not be turned into a track reference
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote provider failure (prepare-source, cache update)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tag editor failure
    #[error("Tag edit error: {0}")]
    TagEdit(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A long-running operation was cancelled through its progress callback
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RenaError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a tag edit error
    pub fn tag_edit(msg: impl Into<String>) -> Self {
        Self::TagEdit(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}
