use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use strata_storage::{Document, DocumentStore, FieldUpdate, StorageError, document_key};

/// Number of calls made against the document store, by operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find: u64,
    pub update: u64,
    pub insert: u64,
}

#[derive(Default)]
struct Counters {
    find: AtomicU64,
    update: AtomicU64,
    insert: AtomicU64,
}

type CollectionKey = (String, String);

/// In-process document store.
///
/// Documents are keyed by `(collection, document key)`. Inserting an
/// existing key fails with [`StorageError::DuplicateKey`], the same way a
/// unique index would.
pub struct InMemoryDocumentStore {
    documents: DashMap<CollectionKey, Document>,
    available: AtomicBool,
    forced_duplicates: AtomicU32,
    counters: Counters,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            available: AtomicBool::new(true),
            forced_duplicates: AtomicU32::new(0),
            counters: Counters::default(),
        }
    }

    /// Put a document in place directly, bypassing call accounting.
    ///
    /// Documents without a string `_id` are ignored.
    pub fn seed(&self, collection: &str, document: Document) {
        let Some(key) = document_key(&document).map(str::to_string) else {
            tracing::warn!(collection, "seed document has no key, ignored");
            return;
        };
        self.documents.insert((collection.to_string(), key), document);
    }

    /// Snapshot of a stored document, bypassing call accounting.
    pub fn document(&self, collection: &str, document_key: &str) -> Option<Document> {
        self.documents
            .get(&(collection.to_string(), document_key.to_string()))
            .map(|doc| doc.value().clone())
    }

    /// Make the next `count` inserts fail with a duplicate key error, as if
    /// another process had won the insert race each time.
    pub fn inject_duplicate_key_errors(&self, count: u32) {
        self.forced_duplicates.store(count, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            find: self.counters.find.load(Ordering::Relaxed),
            update: self.counters.update.load(Ordering::Relaxed),
            insert: self.counters.insert.load(Ordering::Relaxed),
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::connection_error("in-memory document store is unavailable"))
        }
    }

    fn take_forced_duplicate(&self) -> bool {
        self.forced_duplicates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        document_key: &str,
    ) -> Result<Option<Document>, StorageError> {
        self.counters.find.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.document(collection, document_key))
    }

    async fn update_one(
        &self,
        collection: &str,
        document_key: &str,
        update: &FieldUpdate,
    ) -> Result<(), StorageError> {
        self.counters.update.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        if let Some(mut doc) = self
            .documents
            .get_mut(&(collection.to_string(), document_key.to_string()))
        {
            update.apply(&mut doc);
        }
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        self.counters.insert.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        let key = document_key(&document)
            .ok_or_else(|| StorageError::invalid_document("document has no string _id"))?
            .to_string();

        if self.take_forced_duplicate() {
            return Err(StorageError::duplicate_key(collection, key));
        }

        match self.documents.entry((collection.to_string(), key)) {
            Entry::Occupied(entry) => Err(StorageError::duplicate_key(collection, &entry.key().1)),
            Entry::Vacant(entry) => {
                entry.insert(document);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_storage::{field_value, new_document};

    use super::*;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one("user", new_document("u1", "level", "42"))
            .await
            .unwrap();

        let doc = store.find_one("user", "u1").await.unwrap().unwrap();
        assert_eq!(field_value(&doc, "level"), Some("42"));
        assert!(store.find_one("guild", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one("user", new_document("u1", "level", "1"))
            .await
            .unwrap();
        let err = store
            .insert_one("user", new_document("u1", "level", "2"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());

        let doc = store.document("user", "u1").unwrap();
        assert_eq!(field_value(&doc, "level"), Some("1"));
    }

    #[tokio::test]
    async fn test_update_missing_is_noop() {
        let store = InMemoryDocumentStore::new();
        store
            .update_one("user", "ghost", &FieldUpdate::set("level", "1"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_set_and_unset() {
        let store = InMemoryDocumentStore::new();
        store.seed("user", new_document("u1", "level", "1"));

        store
            .update_one("user", "u1", &FieldUpdate::set("gold", "5"))
            .await
            .unwrap();
        store
            .update_one("user", "u1", &FieldUpdate::unset("level"))
            .await
            .unwrap();

        let doc = store.document("user", "u1").unwrap();
        assert_eq!(field_value(&doc, "gold"), Some("5"));
        assert_eq!(field_value(&doc, "level"), None);
        assert_eq!(store.calls().update, 2);
    }

    #[tokio::test]
    async fn test_injected_duplicates_are_consumed() {
        let store = InMemoryDocumentStore::new();
        store.inject_duplicate_key_errors(2);

        for _ in 0..2 {
            let err = store
                .insert_one("user", new_document("u1", "level", "1"))
                .await
                .unwrap_err();
            assert!(err.is_duplicate_key());
        }
        store
            .insert_one("user", new_document("u1", "level", "1"))
            .await
            .unwrap();
        assert_eq!(store.calls().insert, 3);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = InMemoryDocumentStore::new();
        store.set_available(false);
        assert!(store.find_one("user", "u1").await.unwrap_err().is_connection_error());
    }
}
