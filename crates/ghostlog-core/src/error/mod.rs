//! Error types and result aliases for ghostlog operations.
//!
//! Provides a unified error type that covers the failure classes of the audit
//! pipeline. Fetch and store-write failures are degraded to absent attachment
//! references by the cache; persistence failures drop a single event; export
//! failures abort the current export.

use thiserror::Error;

/// Unified error type for all ghostlog operations
#[derive(Error, Debug)]
pub enum GhostlogError {
    // Config errors
    #[error("Failed to parse ghostlog.toml: {message} at line {line}, column {column}")]
    ConfigParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Fetch errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Cache errors
    #[error("Failed to store cached content {hash}: {message}")]
    StoreWrite {
        hash: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid content hash: {reason}")]
    InvalidHash { reason: String },

    // Audit log errors
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Export failed while writing {file}: {message}")]
    Export { file: String, message: String },

    // Event source errors
    #[error("Malformed event on line {line}: {message}")]
    EventParse { line: usize, message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for ghostlog operations
pub type GhostlogResult<T> = Result<T, GhostlogError>;

impl GhostlogError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a persistence error from any error type
    pub fn persistence<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a store-write error for the given content hash
    pub fn store_write<E>(hash: impl Into<String>, message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StoreWrite {
            hash: hash.into(),
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error only degrades a single attachment
    ///
    /// Recoverable errors turn into an absent attachment reference; the
    /// enclosing record is still appended.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GhostlogError::Network { .. } | GhostlogError::StoreWrite { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            GhostlogError::ConfigParse { .. } => Some("Check the syntax of ghostlog.toml"),
            GhostlogError::ConfigValidation { .. } => {
                Some("Run 'ghostlog check' to validate the configuration")
            },
            GhostlogError::Network { .. } => Some("Attachment URLs expire; the fetch is not retried"),
            GhostlogError::StoreWrite { .. } => {
                Some("Check free space and permissions of the cache directory")
            },
            GhostlogError::Persistence { .. } => {
                Some("Check that the database directory is writable and not locked")
            },
            GhostlogError::Export { .. } => Some("Check that the csv directory is writable"),
            GhostlogError::EventParse { .. } => {
                Some("Each line must be one JSON event tagged with \"type\"")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        let network = GhostlogError::Network {
            message: "status 403".to_string(),
            source: None,
        };
        assert!(network.is_recoverable());

        let write = GhostlogError::store_write(
            "ab",
            "disk full".to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(write.is_recoverable());

        let persistence = GhostlogError::Persistence {
            message: "locked".to_string(),
            source: None,
        };
        assert!(!persistence.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = GhostlogError::Export {
            file: "csv/deleted_db.csv".to_string(),
            message: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Export failed while writing csv/deleted_db.csv: permission denied"
        );
        assert!(err.suggestion().is_some());
    }
}
