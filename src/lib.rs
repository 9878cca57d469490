//! needys-api-user
//!
//! HTTP service exposing CRUD operations on the `user` table, with a separate
//! health listener and graceful shutdown.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod version;
