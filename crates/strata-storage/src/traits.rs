//! Contracts for the two remote tiers.
//!
//! Both tiers are consumed through narrow interfaces so the cache layer never
//! depends on a particular client library.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::StorageError;
use crate::types::{Document, FieldUpdate};

/// Stream of raw pub/sub payloads. Ends when the subscription is lost.
pub type MessageStream = BoxStream<'static, Vec<u8>>;

/// The shared key-value cache tier (e.g. Redis).
///
/// Implementations must be thread-safe and cheap to share behind an `Arc`.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Reads a key. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a key, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<(), StorageError>;

    /// Publishes a payload on a broadcast channel.
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), StorageError>;

    /// Subscribes to a broadcast channel.
    ///
    /// The returned stream yields every payload published after the
    /// subscription was established and terminates when the underlying
    /// connection is lost; callers are expected to resubscribe.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StorageError>;
}

/// The persistent document store tier (e.g. MongoDB or a JSONB table).
///
/// Documents live in collections and are addressed by their document key
/// ([`DOCUMENT_KEY_FIELD`](crate::DOCUMENT_KEY_FIELD)).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Finds the document with the given key.
    async fn find_one(
        &self,
        collection: &str,
        document_key: &str,
    ) -> Result<Option<Document>, StorageError>;

    /// Applies a single-field update to an existing document.
    ///
    /// Updating a document that does not exist is a no-op.
    async fn update_one(
        &self,
        collection: &str,
        document_key: &str,
        update: &FieldUpdate,
    ) -> Result<(), StorageError>;

    /// Inserts a new document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DuplicateKey` if a document with the same key
    /// was inserted concurrently.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError>;
}
