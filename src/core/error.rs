use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Malformed or missing input, including conditions that cannot be compiled.
    /// Always raised before anything is sent to the runner.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
