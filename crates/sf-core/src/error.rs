//! Crate-wide error taxonomy. Leaf errors in other crates convert into this
//! via `From` impls at crate boundaries.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("tracker credentials rejected: {0}")]
    AuthFailure(String),

    #[error("permission denied: {0}")]
    AuthzFailure(String),

    #[error("rate limit exhausted: {0}")]
    RateLimit(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
