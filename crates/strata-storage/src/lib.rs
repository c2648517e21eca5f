//! # strata-storage
//!
//! Backend contracts for the remote tiers of the Strata cache.
//!
//! This crate defines the traits and types that shared-cache and
//! document-store backends implement. It does not contain any
//! implementations - those are provided by separate crates.
//!
//! ## Example
//!
//! ```ignore
//! use strata_storage::{DocumentStore, StorageError, field_value};
//!
//! async fn read_level(store: &dyn DocumentStore, id: &str) -> Result<Option<String>, StorageError> {
//!     let doc = store.find_one("user", id).await?;
//!     Ok(doc.as_ref().and_then(|d| field_value(d, "level")).map(str::to_string))
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{DocumentStore, MessageStream, SharedCache};
pub use types::{
    DOCUMENT_KEY_FIELD, Document, FieldUpdate, IDENTIFIER_FIELD, document_key, field_value,
    new_document,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shareable shared-cache backend.
pub type DynSharedCache = std::sync::Arc<dyn SharedCache>;

/// Shareable document-store backend.
pub type DynDocumentStore = std::sync::Arc<dyn DocumentStore>;
