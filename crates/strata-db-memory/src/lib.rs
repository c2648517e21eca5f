//! # strata-db-memory
//!
//! In-process backends for both remote tiers.
//!
//! Used as the fallback when Redis or PostgreSQL are disabled, and by tests
//! that need several sync contexts to observe each other without external
//! services. Both backends count calls per operation and can be switched
//! unavailable to exercise failure paths.

mod cache;
mod documents;

pub use cache::{CacheCalls, InMemorySharedCache};
pub use documents::{InMemoryDocumentStore, StoreCalls};
