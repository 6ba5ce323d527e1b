//! Error taxonomy for context store operations.
//!
//! Every kind is recoverable by the caller; the core never panics on a
//! recoverable condition and never retries internally, with one exception:
//! `append` may retry once after a `ConcurrentUpdateConflict` (its semantics
//! are defined against the tip at commit time).

/// Errors produced by the context version store and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("repository not initialized")]
    NotInitialized,

    #[error("repository already initialized")]
    AlreadyInitialized,

    #[error("branch not found: {branch}")]
    BranchNotFound { branch: String },

    #[error("branch already exists: {branch}")]
    BranchAlreadyExists { branch: String },

    #[error("version not found: {id}")]
    VersionNotFound { id: String },

    #[error("unknown config key: {key}")]
    UnknownConfigKey { key: String },

    #[error("invalid config value: {0}")]
    InvalidConfigValue(String),

    #[error("concurrent update conflict on branch: {branch}")]
    ConcurrentUpdateConflict { branch: String },

    // The only kind that carries a substrate message verbatim.
    #[error("storage error: {0}")]
    StorageIo(String),
}

impl From<std::io::Error> for ContextError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageIo(err.to_string())
    }
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageIo(format!("serialization: {err}"))
    }
}

/// Result type for context store operations.
pub type Result<T> = std::result::Result<T, ContextError>;
