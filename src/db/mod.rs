//! PostgreSQL persistence for the `user` table

pub mod bootstrap;
pub mod pool;
pub mod users;

pub use bootstrap::{initialize_database, SEED_USERS};
pub use pool::{create_pool, DbPool};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::User;

/// Storage operations the HTTP layer depends on
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    async fn get(&self, id: i32) -> Result<User, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Returns the number of rows changed
    async fn update(&self, user: &User) -> Result<u64, StoreError>;

    /// Returns the number of rows removed
    async fn delete(&self, user: &User) -> Result<u64, StoreError>;

    /// Reset and reseed the table
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Connectivity probe used by the live check
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl UserRepository for DbPool {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        users::create_user(self, user).await
    }

    async fn get(&self, id: i32) -> Result<User, StoreError> {
        users::get_user(self, id).await
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        users::list_users(self).await
    }

    async fn update(&self, user: &User) -> Result<u64, StoreError> {
        users::update_user(self, user).await
    }

    async fn delete(&self, user: &User) -> Result<u64, StoreError> {
        users::delete_user(self, user).await
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        initialize_database(self).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        users::ping(self).await
    }
}
