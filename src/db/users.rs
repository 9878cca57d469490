//! CRUD operations on the `user` table
//!
//! Each operation borrows the pool for the duration of the call and
//! surfaces any failure immediately; nothing is retried.

use tokio_postgres::Row;
use tracing::debug;

use super::DbPool;
use crate::error::StoreError;
use crate::models::User;

const INSERT_USER: &str =
    r#"INSERT INTO "user" (firstname, lastname, address, phone) VALUES ($1, $2, $3, $4)"#;
const SELECT_USER: &str =
    r#"SELECT id, firstname, lastname, address, phone FROM "user" WHERE id = $1"#;
const SELECT_USERS: &str =
    r#"SELECT id, firstname, lastname, address, phone FROM "user" ORDER BY id ASC"#;
const UPDATE_USER: &str =
    r#"UPDATE "user" SET address = $1, phone = $2 WHERE firstname = $3 AND lastname = $4"#;
const DELETE_USER: &str = r#"DELETE FROM "user" WHERE firstname = $1 AND lastname = $2"#;

/// Insert a new row. The generated id is not read back.
pub async fn create_user(pool: &DbPool, user: &User) -> Result<(), StoreError> {
    debug!(
        query = INSERT_USER,
        firstname = %user.firstname,
        lastname = %user.lastname,
        address = %user.address,
        phone = %user.phone,
        "database query"
    );

    let conn = pool.get().await?;
    conn.execute(
        INSERT_USER,
        &[&user.firstname, &user.lastname, &user.address, &user.phone],
    )
    .await?;

    Ok(())
}

/// Fetch exactly one row by id
pub async fn get_user(pool: &DbPool, id: i32) -> Result<User, StoreError> {
    debug!(query = SELECT_USER, id = id, "database query");

    let conn = pool.get().await?;
    let row = conn
        .query_opt(SELECT_USER, &[&id])
        .await?
        .ok_or(StoreError::NotFound { id })?;

    user_from_row(&row).map_err(|source| StoreError::Decode {
        decoded: Vec::new(),
        source,
    })
}

/// All rows in ascending id order
///
/// A decoding failure returns the users decoded so far inside the error.
pub async fn list_users(pool: &DbPool) -> Result<Vec<User>, StoreError> {
    debug!(query = SELECT_USERS, "database query");

    let conn = pool.get().await?;
    let rows = conn.query(SELECT_USERS, &[]).await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in &rows {
        match user_from_row(row) {
            Ok(user) => users.push(user),
            Err(source) => {
                return Err(StoreError::Decode {
                    decoded: users,
                    source,
                })
            }
        }
    }

    Ok(users)
}

/// Overwrite address and phone of every row matching the name pair.
///
/// Matching zero rows is not an error. Returns the number of rows changed.
pub async fn update_user(pool: &DbPool, user: &User) -> Result<u64, StoreError> {
    debug!(
        query = UPDATE_USER,
        firstname = %user.firstname,
        lastname = %user.lastname,
        address = %user.address,
        phone = %user.phone,
        "database query"
    );

    let conn = pool.get().await?;
    let updated = conn
        .execute(
            UPDATE_USER,
            &[&user.address, &user.phone, &user.firstname, &user.lastname],
        )
        .await?;

    debug!(rows = updated, "users updated");
    Ok(updated)
}

/// Remove every row matching the name pair. Matching zero rows is not an error.
pub async fn delete_user(pool: &DbPool, user: &User) -> Result<u64, StoreError> {
    debug!(
        query = DELETE_USER,
        firstname = %user.firstname,
        lastname = %user.lastname,
        "database query"
    );

    let conn = pool.get().await?;
    let deleted = conn
        .execute(DELETE_USER, &[&user.firstname, &user.lastname])
        .await?;

    debug!(rows = deleted, "users deleted");
    Ok(deleted)
}

/// Lightweight connectivity probe
pub async fn ping(pool: &DbPool) -> Result<(), StoreError> {
    let conn = pool.get().await?;
    conn.simple_query("SELECT 1").await?;
    Ok(())
}

fn user_from_row(row: &Row) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        firstname: row.try_get("firstname")?,
        lastname: row.try_get("lastname")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
    })
}
