//! # strata-cache
//!
//! Tiered cache objects kept loosely consistent across process instances.
//!
//! Each cache object caches one field of one entity. Reads go through
//! process memory, then the shared cache, then the document store, each tier
//! repopulating the one before it. Writes update memory synchronously and are
//! propagated in the background according to the field's
//! [`ReplicationPolicy`]; afterwards a sync message tells other instances to
//! stop trusting their copies of every key in the same routing slot.
//!
//! ## Tiers
//!
//! | Policy    | Shared cache | Document store | Sync message |
//! |-----------|--------------|----------------|--------------|
//! | `Sync`    | yes          | no             | yes          |
//! | `Persist` | read-through | yes            | no           |
//! | `Both`    | yes          | yes            | yes          |
//! | `None`    | no           | no             | no           |
//!
//! ## Example
//!
//! ```ignore
//! use strata_cache::{StrataConfig, create_sync_context};
//! use strata_core::{DataKey, JsonConverter, ReplicationPolicy};
//!
//! let runtime = create_sync_context(&StrataConfig::default()).await?;
//! let ctx = runtime.context;
//!
//! let level = ctx.scalar(
//!     DataKey::new("user", "level", "u1")?,
//!     ReplicationPolicy::Both,
//!     Arc::new(JsonConverter::<u32>::new()),
//! );
//! level.set(42).await;
//! assert_eq!(level.get().await, Some(42));
//! ```

mod bootstrap;
mod cell;
pub mod config;
mod context;
mod error;
mod object;
pub mod observability;
mod propagation;
mod redis_cache;
mod schema;
mod stats;
mod subscriber;

pub use bootstrap::{BackendKind, SyncRuntime, create_sync_context};
pub use cell::CacheValue;
pub use config::{
    LoggingConfig, PostgresSettings, PropagationConfig, RedisConfig, StrataConfig, SyncConfig,
};
pub use context::{SyncContext, SyncContextBuilder};
pub use error::{BootstrapError, CacheError, ConfigError, RedisCacheError, SchemaError};
pub use object::{ListCacheObject, MapCacheObject, ScalarCacheObject};
pub use propagation::{FailureStage, PropagationFailure};
pub use redis_cache::RedisSharedCache;
pub use schema::{EntitySchema, EntitySchemaBuilder, FieldKind, FieldSchema};
pub use stats::CacheStats;

pub use strata_core::ReplicationPolicy;
