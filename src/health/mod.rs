//! Health and liveness checks served on a dedicated listener
//!
//! Each registry holds named checks, each bounded by a timeout. The report
//! body follows the widely used `health-go` layout so existing probes and
//! dashboards can read it.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::db::UserRepository;
use crate::metrics::Metrics;

/// Check timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout of the database live check
pub const DATABASE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub const TIMEOUT_MESSAGE: &str = "Timeout during health check";

pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

type CheckFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), CheckError>> + Send + Sync>;

/// A named check and how its failure is weighed
#[derive(Clone)]
pub struct CheckConfig {
    pub name: String,
    pub timeout: Duration,
    /// A failing check only degrades the status instead of failing it
    pub skip_on_err: bool,
    check: CheckFn,
}

impl CheckConfig {
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CheckError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            timeout: DEFAULT_TIMEOUT,
            skip_on_err: false,
            check: Arc::new(move || check().boxed()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn skip_on_err(mut self, skip: bool) -> Self {
        self.skip_on_err = skip;
        self
    }

    async fn run(&self) -> Option<String> {
        match tokio::time::timeout(self.timeout, (self.check)()).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(TIMEOUT_MESSAGE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Partially Available")]
    PartiallyAvailable,
    #[serde(rename = "Unavailable")]
    Unavailable,
}

impl Status {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Ok | Self::PartiallyAvailable => StatusCode::OK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, String>,
    pub component: Component,
}

pub struct HealthRegistry {
    component: Component,
    checks: Vec<CheckConfig>,
}

impl HealthRegistry {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            checks: Vec::new(),
        }
    }

    pub fn register(&mut self, check: CheckConfig) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check concurrently and aggregate the outcome
    pub async fn measure(&self) -> HealthReport {
        let outcomes = join_all(
            self.checks
                .iter()
                .map(|check| async move { (check, check.run().await) }),
        )
        .await;

        let mut status = Status::Ok;
        let mut failures = BTreeMap::new();

        for (check, failure) in outcomes {
            let Some(message) = failure else { continue };

            if check.skip_on_err {
                if status == Status::Ok {
                    status = Status::PartiallyAvailable;
                }
            } else {
                status = Status::Unavailable;
            }
            failures.insert(check.name.clone(), message);
        }

        HealthReport {
            status,
            timestamp: Utc::now(),
            failures,
            component: self.component.clone(),
        }
    }
}

/// Registry behind `/health`: the process is scheduled and responsive
pub fn process_registry(component: Component) -> HealthRegistry {
    let mut registry = HealthRegistry::new(component);
    registry.register(CheckConfig::new("health-check", || async { Ok(()) }));
    registry
}

/// Registry behind `/live`: the database answers a probe
pub fn database_registry(component: Component, repository: Arc<dyn UserRepository>) -> HealthRegistry {
    let mut registry = HealthRegistry::new(component);
    registry.register(
        CheckConfig::new("postgres-check", move || {
            let repository = repository.clone();
            async move { repository.ping().await.map_err(CheckError::from) }
        })
        .with_timeout(DATABASE_CHECK_TIMEOUT)
        .skip_on_err(false),
    );
    registry
}

#[derive(Clone)]
pub struct HealthState {
    pub health: Arc<HealthRegistry>,
    pub live: Arc<HealthRegistry>,
    pub metrics: Arc<Metrics>,
}

async fn report(registry: &HealthRegistry) -> (StatusCode, Json<HealthReport>) {
    let report = registry.measure().await;
    if !report.failures.is_empty() {
        tracing::warn!(status = ?report.status, failures = ?report.failures, "health check failures");
    }
    (report.status.status_code(), Json(report))
}

pub async fn health_handler(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    report(&state.health).await
}

pub async fn live_handler(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    report(&state.live).await
}

pub async fn metrics_handler(State(state): State<HealthState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Router of the health listener; requests are traced only when asked for
pub fn create_router(state: HealthState, log_healthcheck: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/live", get(live_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if log_healthcheck {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}
