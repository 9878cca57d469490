//! Database connection pool management
//!
//! Uses a bb8 pool of `tokio-postgres` clients with bounded size and
//! connection lifetime.

use std::time::Duration;

use bb8::{ErrorSink, Pool};
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::NoTls;
use tracing::warn;

use crate::config::DatabaseConfig;

/// Shared, cloneable handle to the connection pool
pub type DbPool = Pool<PostgresConnectionManager<NoTls>>;

/// Maximum number of open connections.
const MAX_OPEN_CONNECTIONS: u32 = 10;

/// Idle connections are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Connections are recycled after this long regardless of use.
const MAX_LIFETIME: Duration = Duration::from_secs(3600);

/// Logs connection failures that have no waiting caller to report to,
/// such as those hit while the reaper replenishes idle connections.
#[derive(Debug, Clone, Copy)]
struct TracingErrorSink;

impl ErrorSink<tokio_postgres::Error> for TracingErrorSink {
    fn sink(&self, error: tokio_postgres::Error) {
        warn!(error = %error, "database connection failed");
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<tokio_postgres::Error>> {
        Box::new(*self)
    }
}

/// Build the pool without dialing the database.
///
/// Only the connection string is validated here; connectivity is first
/// exercised by the live check or the first query. A failed connection
/// attempt is not retried: the caller waiting on it gets the driver error.
/// Must be called from within a Tokio runtime, since the pool spawns its
/// reaper task.
///
/// # Errors
///
/// Returns an error if the connection string cannot be parsed.
pub fn create_pool(config: &DatabaseConfig) -> Result<DbPool, tokio_postgres::Error> {
    let manager = PostgresConnectionManager::new_from_stringlike(config.connection_string(), NoTls)?;

    Ok(Pool::builder()
        .max_size(MAX_OPEN_CONNECTIONS)
        .idle_timeout(Some(IDLE_TIMEOUT))
        .max_lifetime(Some(MAX_LIFETIME))
        .retry_connection(false)
        .error_sink(Box::new(TracingErrorSink))
        .build_unchecked(manager))
}
