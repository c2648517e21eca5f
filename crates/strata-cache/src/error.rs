//! Error types for the cache layer.
//!
//! Reads and writes on cache objects never fail because of a remote tier;
//! those failures are logged and, on the write path, published as
//! [`PropagationFailure`](crate::PropagationFailure)s. The errors here cover
//! caller mistakes, configuration and bootstrap.

use strata_core::KeyError;
use strata_storage::StorageError;

/// Errors returned directly by cache object operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Errors raised while declaring or using an entity schema.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema namespace must not be empty")]
    EmptyNamespace,

    #[error("Field name must not be empty in schema '{0}'")]
    EmptyFieldName(String),

    #[error("Field '{field}' is declared twice in schema '{namespace}'")]
    DuplicateField { namespace: String, field: String },

    #[error("Schema '{namespace}' has no field '{field}'")]
    UnknownField { namespace: String, field: String },

    #[error("Field '{field}' is a {actual} field, not a {expected} field")]
    KindMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    InvalidKey(#[from] KeyError),
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the Redis shared-cache backend.
#[derive(Debug, thiserror::Error)]
pub enum RedisCacheError {
    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<RedisCacheError> for StorageError {
    fn from(err: RedisCacheError) -> Self {
        StorageError::connection_error(err.to_string())
    }
}

/// Errors from [`create_sync_context`](crate::create_sync_context).
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("document store unavailable: {0}")]
    Storage(#[from] StorageError),
}
