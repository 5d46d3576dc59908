#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("conflict {0} not found")]
    ConflictNotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("merge strategy not implemented")]
    MergeNotImplemented,

    #[error("sync batch cancelled")]
    Cancelled,

    #[error("tracker client error: {0}")]
    Client(#[from] sf_client::ClientError),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("could not serialize remote payload: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl From<SyncError> for sf_core::CoreError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::ConflictNotFound(id) => sf_core::CoreError::NotFound(format!("conflict {id}")),
            SyncError::Validation(m) => sf_core::CoreError::Validation(m),
            SyncError::MergeNotImplemented => sf_core::CoreError::Internal("merge strategy not implemented".into()),
            SyncError::Cancelled => sf_core::CoreError::Cancelled,
            SyncError::Client(e) => e.into(),
            SyncError::Database(e) => sf_core::CoreError::Database(e),
            SyncError::Serde(e) => sf_core::CoreError::Serde(e),
        }
    }
}
