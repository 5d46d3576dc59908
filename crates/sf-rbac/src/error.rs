#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] sf_audit::AuditError),
}

pub type Result<T> = std::result::Result<T, RbacError>;

impl From<RbacError> for sf_core::CoreError {
    fn from(e: RbacError) -> Self {
        match e {
            RbacError::AccessDenied(m) => sf_core::CoreError::AuthzFailure(m),
            RbacError::Database(e) => sf_core::CoreError::Database(e),
            RbacError::Audit(e) => e.into(),
        }
    }
}
