//! needys-api-user API Server
//!
//! Serves the user CRUD API on the configured address and the health
//! endpoints on a dedicated listener. Ctrl+C or SIGTERM triggers a graceful
//! shutdown.

use std::process::ExitCode;

use needys_api_user::config::Config;
use needys_api_user::core::Application;
use needys_api_user::version::Version;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Loads .env, then flags and environment; invalid values exit here
    let config = Config::load();

    let mut app = match Application::initialize(config, Version::from_build_env()) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "application initialisation failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match app.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "application stopped with a fatal error");
            ExitCode::FAILURE
        }
    }
}

/// Cancel `shutdown` on the first Ctrl+C or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    warn!(signal = signal, "received a system call");
    shutdown.cancel();
}
