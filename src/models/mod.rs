//! Data models shared by the store and the HTTP layer.

pub mod user;

pub use user::{User, UserPayload};
