use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
///
/// Structural misuse of the tree (double dot entries, destroying a linked
/// node, unpaired read jobs) is not represented here: it panics.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A cache file line that could not be turned into a node.
    #[error("Cache error at line {line}: {message}")]
    Cache { line: usize, message: String },

    /// JSON encoding or decoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A report or cache was requested before anything was scanned.
    #[error("No tree loaded")]
    NoTree,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn invalid_path_error_display() {
        let err = AppError::InvalidPath("/nonexistent".into());
        assert_eq!(err.to_string(), "Invalid path: /nonexistent");
    }

    #[test]
    fn cache_error_display() {
        let err = AppError::Cache {
            line: 3,
            message: "unknown parent".into(),
        };
        assert_eq!(err.to_string(), "Cache error at line 3: unknown parent");
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
    }
}
