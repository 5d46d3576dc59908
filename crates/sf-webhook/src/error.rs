#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook signature mismatch")]
    InvalidSignature,

    #[error("webhook event {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("field mapper error: {0}")]
    Mapper(#[from] sf_mapper::MapperError),

    #[error("sync engine error: {0}")]
    Sync(#[from] sf_sync::SyncError),

    #[error("audit log error: {0}")]
    Audit(#[from] sf_audit::AuditError),
}

pub type Result<T> = std::result::Result<T, WebhookError>;

impl From<WebhookError> for sf_core::CoreError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::InvalidSignature => sf_core::CoreError::AuthFailure(e.to_string()),
            WebhookError::NotFound(id) => sf_core::CoreError::NotFound(format!("webhook event {id}")),
            WebhookError::Validation(m) => sf_core::CoreError::Validation(m),
            WebhookError::Database(e) => sf_core::CoreError::Database(e),
            WebhookError::Mapper(e) => e.into(),
            WebhookError::Sync(e) => e.into(),
            WebhookError::Audit(e) => e.into(),
        }
    }
}
