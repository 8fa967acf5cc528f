use thiserror::Error;

/// Main error type for RecordTree
#[derive(Error, Debug)]
pub enum RecordTreeError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied a blank id/type or a non-positive depth
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Root record could not be located
    #[error("Record not found: {entity_type} {id}")]
    RecordNotFound { entity_type: String, id: String },

    /// Store rejected a type or field name
    #[error("Query error: {0}")]
    Query(String),

    /// HTTP server errors
    #[error("HTTP error: {0}")]
    Http(String),
}

impl RecordTreeError {
    /// True for errors caused by the caller rather than the store.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RecordTreeError::InvalidInput(_) | RecordTreeError::RecordNotFound { .. }
        )
    }

    /// Single message shown to whoever asked for a hierarchy.
    pub fn user_message(&self) -> String {
        format!("Error retrieving hierarchy data: {}", self)
    }
}

/// Convenient Result type using RecordTreeError
pub type Result<T> = std::result::Result<T, RecordTreeError>;
