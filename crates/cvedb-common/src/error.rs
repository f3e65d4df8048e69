//! Error types for CVEDB

use thiserror::Error;

/// Result type alias for CVEDB operations
pub type Result<T> = std::result::Result<T, CvedbError>;

/// Main error type for CVEDB
#[derive(Error, Debug)]
pub enum CvedbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CvedbError = io.into();
        assert!(matches!(err, CvedbError::Io(_)));
        assert!(err.to_string().starts_with("IO error:"));
    }

    #[test]
    fn test_config_error_display() {
        let err = CvedbError::Config("DATABASE_URL is missing".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: DATABASE_URL is missing"
        );
    }
}
