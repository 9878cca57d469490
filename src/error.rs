//! Error taxonomy shared by the persistence, HTTP and lifecycle layers

use std::fmt;

use crate::models::User;

/// Pool checkout failure
pub type PoolError = bb8::RunError<tokio_postgres::Error>;

/// Record Store and Bootstrap failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection unavailable: {0}")]
    Pool(#[from] PoolError),

    #[error("{0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decoding failed; carries whatever was decoded before the failure
    #[error("failed to decode user row: {source}")]
    Decode {
        decoded: Vec<User>,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("no user with id {id}")]
    NotFound { id: i32 },

    #[error("{step} failed: {source}")]
    Bootstrap {
        step: BootstrapStep,
        #[source]
        source: tokio_postgres::Error,
    },
}

/// Statement of the Bootstrap sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    Begin,
    DropTable,
    CreateTable,
    Seed,
    Commit,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Begin => "begin transaction",
            Self::DropTable => "drop table",
            Self::CreateTable => "create table",
            Self::Seed => "seed rows",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Request body rejected before reaching the store
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("field {field} is required")]
    Missing { field: &'static str },
}

/// Fatal lifecycle failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database pool could not be constructed: {0}")]
    Pool(#[source] tokio_postgres::Error),

    #[error("database initialisation failed: {0}")]
    Bootstrap(#[source] StoreError),

    #[error("application server shutdown failed: {0}")]
    Shutdown(String),

    #[error("application is {0:?}, expected {1:?}")]
    InvalidState(crate::core::app::LifecycleState, crate::core::app::LifecycleState),

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}
