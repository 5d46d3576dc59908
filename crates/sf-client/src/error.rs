#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("tracker credentials rejected: {0}")]
    AuthFailure(String),

    #[error("permission denied by tracker: {0}")]
    AuthzFailure(String),

    #[error("tracker rate limit exhausted: {0}")]
    RateLimit(String),

    #[error("tracker returned {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("tracker unreachable or returned a server error: {0}")]
    ExternalService(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not parse tracker response: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for sf_core::CoreError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::AuthFailure(m) => sf_core::CoreError::AuthFailure(m),
            ClientError::AuthzFailure(m) => sf_core::CoreError::AuthzFailure(m),
            ClientError::RateLimit(m) => sf_core::CoreError::RateLimit(m),
            ClientError::Cancelled => sf_core::CoreError::Cancelled,
            other => sf_core::CoreError::ExternalService(other.to_string()),
        }
    }
}
