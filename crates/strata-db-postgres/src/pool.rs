//! Connection pool for the document store.

use std::time::Duration;

use sqlx_postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Reported to the server as `application_name`.
const APPLICATION_NAME: &str = "strata";

/// Open a pool sized for the propagation workers and check that the
/// database answers.
#[instrument(skip(config), fields(url = %redact_url(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    if config.pool_size == 0 {
        return Err(PostgresError::config("pool_size must be at least 1"));
    }

    let connect_options = config
        .url
        .parse::<PgConnectOptions>()
        .map_err(|e| PostgresError::config(format!("invalid database url: {e}")))?
        .application_name(APPLICATION_NAME);

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .connect_with(connect_options)
        .await?;

    sqlx_core::query::query("SELECT 1").execute(&pool).await?;

    info!(pool_size = config.pool_size, "Connected to PostgreSQL document store");
    debug!(idle_timeout_ms = ?config.idle_timeout_ms, "pool options applied");
    Ok(pool)
}

/// Replace the password of a connection URL with `****` for logging.
pub(crate) fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
