use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Invalid action type: {0}")]
    InvalidActionType(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Local persistence failed; the sync pass cannot continue but nothing may be dropped.
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }

    /// The remote side could not be reached at all, as opposed to rejecting the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::NetworkUnavailable)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            AppError::DeserializationError(err.to_string())
        } else {
            AppError::SerializationError(err.to_string())
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            AppError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
