//! Process startup: backends from configuration, then the sync context.

use std::fmt;
use std::sync::Arc;

use strata_db_memory::{InMemoryDocumentStore, InMemorySharedCache};
use strata_db_postgres::PostgresDocumentStore;
use strata_storage::{DynDocumentStore, DynSharedCache};

use crate::config::{PostgresSettings, RedisConfig, StrataConfig};
use crate::context::SyncContext;
use crate::error::BootstrapError;
use crate::redis_cache::RedisSharedCache;

/// Which implementation backs a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    InMemory,
    Redis,
    Postgres,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "in-memory"),
            Self::Redis => write!(f, "redis"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// A started sync context and the backends it ended up with.
#[derive(Debug)]
pub struct SyncRuntime {
    pub context: SyncContext,
    pub shared_cache: BackendKind,
    pub document_store: BackendKind,
    /// Whether the first sync subscription succeeded.
    pub subscribed: bool,
}

/// Build and start a sync context from configuration.
///
/// Without Redis the shared cache is in-process. An enabled Redis that is
/// down at startup is still used: reads fall through to the document store,
/// writes report failures, and the subscriber keeps retrying until Redis
/// answers. PostgreSQL falls back to an in-process store only when disabled;
/// an enabled but unreachable database is an error.
pub async fn create_sync_context(config: &StrataConfig) -> Result<SyncRuntime, BootstrapError> {
    config.validate().map_err(BootstrapError::InvalidConfig)?;

    let (shared_cache, shared_kind) = create_shared_cache(&config.redis).await?;
    let (store, store_kind) = create_document_store(&config.postgres).await?;

    let context = SyncContext::builder()
        .shared_cache(shared_cache)
        .document_store(store)
        .sync_config(&config.sync)
        .propagation_config(&config.propagation)
        .build();

    let subscribed = context.start_subscriber().await;

    tracing::info!(
        instance_id = %context.instance_id(),
        shared_cache = %shared_kind,
        document_store = %store_kind,
        subscribed,
        "sync context ready"
    );

    Ok(SyncRuntime {
        context,
        shared_cache: shared_kind,
        document_store: store_kind,
        subscribed,
    })
}

async fn create_shared_cache(
    config: &RedisConfig,
) -> Result<(DynSharedCache, BackendKind), BootstrapError> {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-process shared cache");
        return Ok((Arc::new(InMemorySharedCache::new()), BackendKind::InMemory));
    }

    tracing::info!(url = %config.url, "Connecting to Redis");
    let cache = RedisSharedCache::from_config(config)
        .map_err(|e| BootstrapError::InvalidConfig(e.to_string()))?;
    match cache.ping().await {
        Ok(()) => tracing::info!("Connected to Redis"),
        Err(e) => tracing::warn!(
            error = %e,
            "Redis unreachable at startup, continuing and retrying in the background"
        ),
    }
    Ok((Arc::new(cache), BackendKind::Redis))
}

async fn create_document_store(
    settings: &PostgresSettings,
) -> Result<(DynDocumentStore, BackendKind), BootstrapError> {
    if !settings.enabled {
        tracing::info!("PostgreSQL disabled, using in-process document store");
        return Ok((Arc::new(InMemoryDocumentStore::new()), BackendKind::InMemory));
    }

    let store = PostgresDocumentStore::new(settings.to_postgres_config()).await?;
    Ok((Arc::new(store), BackendKind::Postgres))
}
