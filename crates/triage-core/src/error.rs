use thiserror::Error;

/// Application-wide error types for Triage.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed domain validation (vital sign ranges, feedback scores).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Risk model could not be loaded or could not score the input.
    #[error("Model error: {0}")]
    ModelError(String),

    /// Reading or writing the learned policy failed.
    #[error("Policy store error: {0}")]
    PolicyStoreError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The waiting queue has no patients.
    #[error("No patients in queue")]
    EmptyQueue,

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the error was caused by the caller's input rather than
    /// by the service itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_)
                | AppError::EmptyQueue
                | AppError::NotFound(_)
                | AppError::SerializationError(_)
        )
    }
}
