//! Destructive reset-and-seed of the `user` table

use tracing::{debug, info};

use super::DbPool;
use crate::error::{BootstrapStep, StoreError};

const DROP_USER_TABLE: &str = r#"DROP TABLE IF EXISTS "user""#;

const CREATE_USER_TABLE: &str = r#"
    CREATE TABLE "user" (
        id SERIAL PRIMARY KEY,
        firstname VARCHAR(100) NOT NULL,
        lastname VARCHAR(100) NOT NULL,
        address VARCHAR(100) NOT NULL,
        phone VARCHAR(100) NOT NULL
    )"#;

const INSERT_SEED: &str =
    r#"INSERT INTO "user" (firstname, lastname, address, phone) VALUES ($1, $2, $3, $4)"#;

/// Rows present after every bootstrap: (firstname, lastname, address, phone)
pub const SEED_USERS: [(&str, &str, &str, &str); 2] = [
    (
        "Guillaume",
        "Penaud",
        "16 sentier de la côte 94370 Sucy-En-Brie",
        "0666222475",
    ),
    (
        "Pauline",
        "Breniaux",
        "10 route de Rhye 74210 Mouthier-En-Bresse",
        "0645124365",
    ),
];

/// Drop, recreate and seed the `user` table in one transaction.
///
/// The first failing statement aborts the sequence; the transaction is
/// rolled back when dropped uncommitted, so the previous table survives.
pub async fn initialize_database(pool: &DbPool) -> Result<(), StoreError> {
    let mut conn = pool.get().await?;
    let tx = conn
        .transaction()
        .await
        .map_err(failed(BootstrapStep::Begin))?;

    debug!(query = DROP_USER_TABLE, "database query");
    tx.batch_execute(DROP_USER_TABLE)
        .await
        .map_err(failed(BootstrapStep::DropTable))?;

    debug!(query = CREATE_USER_TABLE, "database query");
    tx.batch_execute(CREATE_USER_TABLE)
        .await
        .map_err(failed(BootstrapStep::CreateTable))?;

    for (firstname, lastname, address, phone) in SEED_USERS {
        debug!(query = INSERT_SEED, firstname, lastname, "database query");
        tx.execute(INSERT_SEED, &[&firstname, &lastname, &address, &phone])
            .await
            .map_err(failed(BootstrapStep::Seed))?;
    }

    tx.commit().await.map_err(failed(BootstrapStep::Commit))?;

    info!(seeded = SEED_USERS.len(), "user table initialized");
    Ok(())
}

fn failed(step: BootstrapStep) -> impl FnOnce(tokio_postgres::Error) -> StoreError {
    move |source| StoreError::Bootstrap { step, source }
}
