#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("not enough history to compute {0}")]
    InsufficientHistory(String),

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("tracker error: {0}")]
    Tracker(#[from] sf_client::error::ClientError),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl From<AnalyticsError> for sf_core::CoreError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::InsufficientHistory(m) => sf_core::CoreError::Validation(m),
            AnalyticsError::Validation(m) => sf_core::CoreError::Validation(m),
            AnalyticsError::Database(e) => sf_core::CoreError::Database(e),
            AnalyticsError::Tracker(e) => e.into(),
        }
    }
}
