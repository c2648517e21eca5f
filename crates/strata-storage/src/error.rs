//! Error types shared by every backend of the two remote tiers.

use std::fmt;

/// Errors that can occur while talking to the shared cache or document store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An insert raced with another insert of the same document.
    #[error("Duplicate key: {collection}/{document_key}")]
    DuplicateKey {
        /// Collection the insert targeted.
        collection: String,
        /// Document key that already exists.
        document_key: String,
    },

    /// The backend is unreachable or the connection was lost.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// Pub/sub subscription failed or was closed.
    #[error("Subscription error: {message}")]
    Subscription {
        /// Description of the subscription error.
        message: String,
    },

    /// A stored document does not have the expected shape.
    #[error("Invalid document: {message}")]
    InvalidDocument {
        /// Description of why the document is invalid.
        message: String,
    },

    /// An internal backend error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `DuplicateKey` error.
    #[must_use]
    pub fn duplicate_key(collection: impl Into<String>, document_key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            collection: collection.into(),
            document_key: document_key.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Subscription` error.
    #[must_use]
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidDocument` error.
    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a duplicate key error.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns `true` if the backend could not be reached.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionError { .. } | Self::Subscription { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateKey { .. } => ErrorCategory::Conflict,
            Self::ConnectionError { .. } | Self::Subscription { .. } => {
                ErrorCategory::Infrastructure
            }
            Self::InvalidDocument { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Concurrent insert conflict.
    Conflict,
    /// Malformed stored data.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
