#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("field mapping for tracker field '{0}' already exists on this template")]
    AlreadyExists(String),

    #[error("template '{0}' already exists")]
    TemplateAlreadyExists(String),

    #[error("field mapping {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, MapperError>;

impl From<MapperError> for sf_core::CoreError {
    fn from(e: MapperError) -> Self {
        match e {
            MapperError::NotFound(id) => sf_core::CoreError::NotFound(format!("field mapping {id}")),
            MapperError::AlreadyExists(f) | MapperError::TemplateAlreadyExists(f) => {
                sf_core::CoreError::Validation(f)
            }
            MapperError::Database(e) => sf_core::CoreError::Database(e),
        }
    }
}
