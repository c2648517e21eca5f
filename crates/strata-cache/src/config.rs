use serde::{Deserialize, Serialize};
use strata_core::SLOT_COUNT;
use strata_db_postgres::PostgresConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StrataConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.redis.enabled {
            if self.redis.url.is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
        }
        if self.postgres.enabled {
            if self.postgres.url.is_empty() {
                return Err("postgres.enabled=true requires postgres.url".into());
            }
            if self.postgres.pool_size == 0 {
                return Err("postgres.pool_size must be > 0".into());
            }
        }
        // Sync validations
        if self.sync.channel.is_empty() {
            return Err("sync.channel must not be empty".into());
        }
        if self.sync.slot_count != SLOT_COUNT {
            return Err(format!("sync.slot_count must be {SLOT_COUNT}"));
        }
        if self.sync.reconnect_initial_backoff_ms == 0 {
            return Err("sync.reconnect_initial_backoff_ms must be > 0".into());
        }
        if self.sync.reconnect_max_backoff_ms < self.sync.reconnect_initial_backoff_ms {
            return Err(
                "sync.reconnect_max_backoff_ms must be >= sync.reconnect_initial_backoff_ms"
                    .into(),
            );
        }
        // Propagation validations
        if self.propagation.workers == 0 {
            return Err("propagation.workers must be > 0".into());
        }
        if self.propagation.queue_capacity == 0 {
            return Err("propagation.queue_capacity must be > 0".into());
        }
        if self.propagation.max_upsert_attempts == Some(0) {
            return Err("propagation.max_upsert_attempts must be > 0 when set".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

/// Redis shared-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis. Without it the shared cache is process-local.
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// PostgreSQL document-store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    /// Enable PostgreSQL. Without it documents are kept in process memory.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_postgres_url")]
    pub url: String,

    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_postgres_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_postgres_idle_timeout_ms")]
    pub idle_timeout_ms: Option<u64>,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_postgres_url() -> String {
    "postgres://localhost/strata".to_string()
}

fn default_postgres_pool_size() -> u32 {
    10
}

fn default_postgres_connect_timeout_ms() -> u64 {
    5000
}

fn default_postgres_idle_timeout_ms() -> Option<u64> {
    Some(300_000)
}

fn default_true() -> bool {
    true
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_postgres_url(),
            pool_size: default_postgres_pool_size(),
            connect_timeout_ms: default_postgres_connect_timeout_ms(),
            idle_timeout_ms: default_postgres_idle_timeout_ms(),
            run_migrations: default_true(),
        }
    }
}

impl PostgresSettings {
    pub fn to_postgres_config(&self) -> PostgresConfig {
        PostgresConfig::new(self.url.clone())
            .with_pool_size(self.pool_size)
            .with_connect_timeout_ms(self.connect_timeout_ms)
            .with_idle_timeout_ms(self.idle_timeout_ms)
            .with_run_migrations(self.run_migrations)
    }
}

/// Invalidation channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Pub/sub channel carrying sync messages. All instances must agree.
    #[serde(default = "default_sync_channel")]
    pub channel: String,

    /// Number of routing slots. Fixed by the wire format.
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    #[serde(default = "default_reconnect_initial_backoff_ms")]
    pub reconnect_initial_backoff_ms: u64,

    #[serde(default = "default_reconnect_max_backoff_ms")]
    pub reconnect_max_backoff_ms: u64,
}

pub(crate) fn default_sync_channel() -> String {
    "strata:sync".to_string()
}

fn default_slot_count() -> usize {
    SLOT_COUNT
}

fn default_reconnect_initial_backoff_ms() -> u64 {
    1000
}

fn default_reconnect_max_backoff_ms() -> u64 {
    300_000 // 5 minutes
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel: default_sync_channel(),
            slot_count: default_slot_count(),
            reconnect_initial_backoff_ms: default_reconnect_initial_backoff_ms(),
            reconnect_max_backoff_ms: default_reconnect_max_backoff_ms(),
        }
    }
}

/// Background write propagation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Number of propagation workers. Writes to one slot always use the same worker.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Jobs each worker may have queued before writers wait.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Give up an upsert after this many duplicate-key conflicts. Unset retries forever.
    #[serde(default)]
    pub max_upsert_attempts: Option<u32>,
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_upsert_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::StrataConfig;
    use crate::error::ConfigError;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Load configuration from an optional TOML file (default `strata.toml`)
    /// overlaid with `STRATA__SECTION__KEY` environment variables.
    pub fn load_config(path: Option<&str>) -> Result<StrataConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or("strata.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        // Environment variable overrides, e.g., STRATA__REDIS__ENABLED=true
        builder = builder.add_source(
            Environment::with_prefix("STRATA")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: StrataConfig = builder.build()?.try_deserialize()?;
        merged.validate().map_err(ConfigError::Invalid)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = StrataConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.redis.enabled);
        assert!(!config.postgres.enabled);
        assert_eq!(config.sync.channel, "strata:sync");
        assert_eq!(config.sync.slot_count, 16384);
        assert_eq!(config.propagation.max_upsert_attempts, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StrataConfig::default();
        config.sync.slot_count = 1024;
        assert!(config.validate().is_err());

        let mut config = StrataConfig::default();
        config.propagation.workers = 0;
        assert!(config.validate().is_err());

        let mut config = StrataConfig::default();
        config.propagation.max_upsert_attempts = Some(0);
        assert!(config.validate().is_err());

        let mut config = StrataConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[sync]
channel = "game:sync"

[propagation]
workers = 2
max_upsert_attempts = 5

[logging]
level = "debug"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = loader::load_config(Some(&path)).unwrap();
        assert_eq!(config.sync.channel, "game:sync");
        assert_eq!(config.propagation.workers, 2);
        assert_eq!(config.propagation.max_upsert_attempts, Some(5));
        assert_eq!(config.propagation.queue_capacity, 1024);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_postgres_settings_conversion() {
        let settings = PostgresSettings {
            pool_size: 3,
            run_migrations: false,
            ..Default::default()
        };
        let pg = settings.to_postgres_config();
        assert_eq!(pg.pool_size, 3);
        assert!(!pg.run_migrations);
        assert_eq!(pg.url, "postgres://localhost/strata");
    }
}
