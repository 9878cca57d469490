//! Application lifecycle
//!
//! Owns the repository (and through it the connection pool), the primary
//! router and both listeners. `run` serves until the cancellation token
//! fires, then shuts both listeners down within [`SHUTDOWN_TIMEOUT`].

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::http::{create_router, AppState};
use crate::config::{Config, ServerConfig};
use crate::db::{create_pool, UserRepository};
use crate::error::AppError;
use crate::health::{self, Component, HealthState};
use crate::logging;
use crate::metrics::Metrics;
use crate::version::Version;

/// Grace period for in-flight requests once shutdown starts
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Service name reported by the health endpoints
pub const SERVICE_NAME: &str = "needys-api-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Running,
    ShuttingDown,
    Stopped,
}

/// Sockets the two servers accept on. A listener that failed to bind is
/// `None` and that server is skipped.
#[derive(Debug, Default)]
pub struct Listeners {
    pub api: Option<TcpListener>,
    pub health: Option<TcpListener>,
}

impl Listeners {
    /// Bind both configured addresses. Bind failures are logged only.
    pub async fn bind(config: &ServerConfig) -> Self {
        Self {
            health: bind("healthcheck", config.healthcheck_address().to_string()).await,
            api: bind("application", config.address()).await,
        }
    }

    pub fn api_addr(&self) -> io::Result<SocketAddr> {
        local_addr(self.api.as_ref())
    }

    pub fn health_addr(&self) -> io::Result<SocketAddr> {
        local_addr(self.health.as_ref())
    }
}

fn local_addr(listener: Option<&TcpListener>) -> io::Result<SocketAddr> {
    listener
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "listener is not bound"))?
        .local_addr()
}

pub struct Application {
    config: Arc<Config>,
    version: Version,
    repository: Arc<dyn UserRepository>,
    metrics: Arc<Metrics>,
    router: Router,
    state: LifecycleState,
}

impl Application {
    /// Install the logger, build the connection pool and register routes.
    ///
    /// The pool is built without contacting the database. Must be called
    /// from within a Tokio runtime.
    pub fn initialize(config: Config, version: Version) -> Result<Self, AppError> {
        if let Err(e) = logging::init_logging(&config.logging) {
            debug!(error = %e, "logger already installed");
        }

        let pool = create_pool(&config.database).map_err(|e| {
            error!(error = %e, host = %config.database.host, port = config.database.port, "database pool could not be constructed");
            AppError::Pool(e)
        })?;

        let app = Self::with_repository(config, version, Arc::new(pool))?;
        info!("application is initialized");
        Ok(app)
    }

    /// Assemble an initialized application around an existing repository
    pub fn with_repository(
        config: Config,
        version: Version,
        repository: Arc<dyn UserRepository>,
    ) -> Result<Self, AppError> {
        let metrics = Arc::new(Metrics::new()?);
        let router = create_router(AppState {
            repository: repository.clone(),
            metrics: metrics.clone(),
        });

        Ok(Self {
            config: Arc::new(config),
            version,
            repository,
            metrics,
            router,
            state: LifecycleState::Initialized,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Primary API router
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured addresses and serve until `shutdown` is cancelled.
    ///
    /// Listener failures are logged and do not stop the application. A
    /// failing start-up bootstrap or a shutdown exceeding the grace period
    /// is returned as a fatal error.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), AppError> {
        self.ensure_initialized()?;
        let listeners = Listeners::bind(&self.config.server).await;
        self.serve(listeners, shutdown).await
    }

    /// Serve on already bound listeners until `shutdown` is cancelled
    pub async fn serve(
        &mut self,
        listeners: Listeners,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        self.ensure_initialized()?;

        let component = Component {
            name: SERVICE_NAME.to_string(),
            version: self.version.release.clone(),
        };
        let health_state = HealthState {
            health: Arc::new(health::process_registry(component.clone())),
            live: Arc::new(health::database_registry(component, self.repository.clone())),
            metrics: self.metrics.clone(),
        };
        let health_router =
            health::create_router(health_state, self.config.logging.log_healthcheck);

        let stop_listeners = CancellationToken::new();
        let mut health_task = tokio::spawn(serve_listener(
            "healthcheck",
            listeners.health,
            health_router,
            stop_listeners.clone(),
        ));

        info!(
            address = %self.config.server.address(),
            release = %self.version.release,
            commit = %self.version.commit,
            build_time = %self.version.build_time,
            environment = %self.config.logging.environment,
            "starting {}",
            SERVICE_NAME
        );
        let mut api_task = tokio::spawn(serve_listener(
            "application",
            listeners.api,
            self.router.clone(),
            stop_listeners.clone(),
        ));

        self.state = LifecycleState::Running;

        if self.config.database.initialize {
            match self.repository.initialize().await {
                Ok(()) => info!("database initialisation succeeded"),
                Err(e) => {
                    error!(error = %e, "database initialisation failed");
                    stop_listeners.cancel();
                    self.state = LifecycleState::Stopped;
                    return Err(AppError::Bootstrap(e));
                }
            }
        }

        shutdown.cancelled().await;
        self.state = LifecycleState::ShuttingDown;
        info!("application server stopping");

        stop_listeners.cancel();
        let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            let (api, health) = tokio::join!(&mut api_task, &mut health_task);
            api.and(health)
        })
        .await;

        self.state = LifecycleState::Stopped;

        match drained {
            Ok(Ok(())) => {
                info!("application server exited properly");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "application server shutdown failed");
                Err(AppError::Shutdown(e.to_string()))
            }
            Err(_) => {
                api_task.abort();
                health_task.abort();
                error!(timeout_secs = SHUTDOWN_TIMEOUT.as_secs(), "application server shutdown failed");
                Err(AppError::Shutdown(format!(
                    "listeners still busy after {}s",
                    SHUTDOWN_TIMEOUT.as_secs()
                )))
            }
        }
    }

    fn ensure_initialized(&self) -> Result<(), AppError> {
        if self.state != LifecycleState::Initialized {
            return Err(AppError::InvalidState(self.state, LifecycleState::Initialized));
        }
        Ok(())
    }
}

async fn bind(name: &'static str, address: String) -> Option<TcpListener> {
    match TcpListener::bind(&address).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            error!(server = name, address = %address, error = %e, "failed to bind listener");
            None
        }
    }
}

/// Serve until `shutdown` is cancelled. Failures are logged only.
async fn serve_listener(
    name: &'static str,
    listener: Option<TcpListener>,
    router: Router,
    shutdown: CancellationToken,
) {
    let Some(listener) = listener else {
        return;
    };

    match listener.local_addr() {
        Ok(local) => info!(server = name, address = %local, "listening"),
        Err(e) => debug!(server = name, error = %e, "listener address unavailable"),
    }

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        error!(server = name, error = %e, "server error");
    }
}
