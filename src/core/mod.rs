//! Core application primitives (router, handlers, lifecycle)

pub mod app;
pub mod extract;
pub mod http;

pub use app::{Application, LifecycleState, Listeners};
pub use http::{create_router, ApiError, AppState};
