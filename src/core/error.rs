use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("Invalid table definition: {0}")]
    SchemaError(String),
    #[error(
        "Column '{column}' already exists with type {observed}, source declares {desired}"
    )]
    StructuralConflictError {
        column: String,
        observed: String,
        desired: String,
    },
    #[error("Warehouse error: {0}")]
    DriverError(String),
    #[error("Commit not acknowledged, load state unknown: {0}")]
    CommitError(String),
    #[error("No source file found: {0}")]
    NotFoundError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl LoadError {
    /// Whether re-running the whole load may succeed without changing inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::DriverError(_) | LoadError::CommitError(_))
    }
}

impl From<object_store::Error> for LoadError {
    fn from(err: object_store::Error) -> Self {
        LoadError::StorageError(err.to_string())
    }
}

impl From<tokio_postgres::Error> for LoadError {
    fn from(err: tokio_postgres::Error) -> Self {
        LoadError::DriverError(err.to_string())
    }
}
