#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("security event {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;

impl From<AuditError> for sf_core::CoreError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::NotFound(id) => sf_core::CoreError::NotFound(format!("security event {id}")),
            AuditError::Validation(m) => sf_core::CoreError::Validation(m),
            AuditError::Database(e) => sf_core::CoreError::Database(e),
        }
    }
}
