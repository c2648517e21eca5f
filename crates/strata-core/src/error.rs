use thiserror::Error;

/// Core error types for Strata key, message and converter handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid data key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Converter registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid sync message: {0}")]
    SyncMessage(#[from] SyncMessageError),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building a [`DataKey`](crate::DataKey).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("field must not be empty")]
    EmptyField,

    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("'{0}' must not contain the key separator '.'")]
    ContainsSeparator(String),
}

/// Errors raised by a [`ValueConverter`](crate::ValueConverter).
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed value: {0}")]
    Malformed(String),

    #[error("unresolved entity reference: {0}")]
    UnresolvedReference(String),

    #[error("no converter registered for type tag '{0}'")]
    UnknownTypeTag(String),
}

impl ConversionError {
    /// Create a new Malformed error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Errors raised by the [`ConverterRegistry`](crate::ConverterRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a converter is already registered for type tag '{0}'")]
    AlreadyRegistered(String),
}

/// Errors raised while decoding a [`SyncMessage`](crate::SyncMessage).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncMessageError {
    #[error("invalid message length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("routing slot {0} is out of range")]
    SlotOutOfRange(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::from(KeyError::EmptyNamespace);
        assert_eq!(err.to_string(), "Invalid data key: namespace must not be empty");

        let err = SyncMessageError::InvalidLength {
            expected: 18,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid message length: expected 18 bytes, got 3"
        );

        let err = RegistryError::AlreadyRegistered("user".into());
        assert_eq!(
            err.to_string(),
            "a converter is already registered for type tag 'user'"
        );
    }
}
