//! HTTP endpoints of the user API using Axum

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, error, Level};

use super::extract::{FullName, UserId};
use crate::db::UserRepository;
use crate::error::{StoreError, ValidationError};
use crate::metrics::Metrics;
use crate::models::{User, UserPayload};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn UserRepository>,
    pub metrics: Arc<Metrics>,
}

/// Errors reaching the HTTP boundary, rendered as `{"error": "<message>"}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("The payload is invalid")]
    Validation(#[from] ValidationError),

    #[error("The user with Id {0} is invalid")]
    InvalidId(String),

    /// Not-found is reported like any other store failure
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Database is not initializable - Error: {0}")]
    Bootstrap(#[source] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Bootstrap(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            Self::Validation(cause) => {
                error!(status = %status, cause = %cause, "{}", message)
            }
            _ => error!(status = %status, "{}", message),
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn decode_user(body: &[u8]) -> Result<User, ApiError> {
    Ok(UserPayload::from_slice(body)?.validate()?)
}

/// Wrap a successful handler result, logging the encoded body at debug
fn respond<T: Serialize>(value: T) -> Json<T> {
    if tracing::enabled!(Level::DEBUG) {
        match serde_json::to_string(&value) {
            Ok(body) => debug!(body = %body, "JSON response"),
            Err(e) => debug!(error = %e, "JSON response could not be encoded"),
        }
    }
    Json(value)
}

/// Middleware to track HTTP request metrics.
///
/// Failed requests are already logged by `ApiError`.
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    state.metrics.http_requests_in_flight.inc();

    let response = next.run(request).await;
    let duration = start.elapsed();

    state.metrics.http_requests_in_flight.dec();
    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    response
}

/// List all users in ascending id order
async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.repository.list().await?;
    Ok(respond(users))
}

/// Get a user by id
async fn get_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<Json<User>, ApiError> {
    let user = state.repository.get(id).await?;
    Ok(respond(user))
}

/// Create a user; the submitted record is echoed back
async fn create_user(State(state): State<AppState>, body: Bytes) -> Result<Json<User>, ApiError> {
    let user = decode_user(&body)?;
    state.repository.create(&user).await?;
    Ok(respond(user))
}

/// Update address and phone of the users named in the body.
///
/// The path id is required by the route but the update is keyed on the
/// body's first and last name.
async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    let user = decode_user(&body)?;
    debug!(path_id = id, "update keyed on name, path id not consulted");
    state.repository.update(&user).await?;
    Ok(respond(user))
}

/// Delete the users matching a name pair
async fn delete_user(
    State(state): State<AppState>,
    name: FullName,
) -> Result<Json<User>, ApiError> {
    let user = User::from(name);
    state.repository.delete(&user).await?;
    Ok(respond(user))
}

/// Drop, recreate and seed the user table
async fn initialize_db(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .repository
        .initialize()
        .await
        .map_err(ApiError::Bootstrap)?;

    Ok(respond(json!({ "initialized": true })))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(get_users))
        .route("/user", post(create_user))
        .route("/user/{id}", get(get_user).put(update_user))
        .route("/user/{firstname}/{lastname}", delete(delete_user))
        .route("/initialize_db", get(initialize_db))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
                        .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
