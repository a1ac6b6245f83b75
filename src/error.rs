use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unexpected I/O errors from the filesystem layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A create or rename was requested with an empty name.
    #[error("Name must not be blank")]
    BlankName,

    /// A name that would escape its parent directory.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// A background task panicked or was cancelled.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Worker(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("disk on fire"));
    }

    #[test]
    fn blank_name_display() {
        assert_eq!(AppError::BlankName.to_string(), "Name must not be blank");
    }

    #[test]
    fn invalid_name_display() {
        let err = AppError::InvalidName("../escape".into());
        assert_eq!(err.to_string(), "Invalid name: ../escape");
    }

    #[test]
    fn invalid_path_error_display() {
        let err = AppError::InvalidPath("/nonexistent".into());
        assert_eq!(err.to_string(), "Invalid path: /nonexistent");
    }
}
