//! Logging initialization from the resolved configuration
//!
//! - Text: colourful, human-readable logs for development
//! - JSON: structured logs for integration and production log aggregation

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::config::{Environment, LogFormat, LoggingConfig};

/// Concrete output format once `unset` has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// An explicit format wins; otherwise development logs text and every other
/// environment logs JSON.
pub fn resolve_format(format: LogFormat, environment: Environment) -> OutputFormat {
    match (format, environment) {
        (LogFormat::Text, _) => OutputFormat::Text,
        (LogFormat::Json, _) => OutputFormat::Json,
        (LogFormat::Unset, Environment::Development) => OutputFormat::Text,
        (LogFormat::Unset, Environment::Integration | Environment::Production) => {
            OutputFormat::Json
        }
    }
}

/// `RUST_LOG` takes precedence over the configured verbosity
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.as_directive()))
}

/// Human-readable formatter; events carry their target, file and line
pub fn text_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .with_writer(writer)
}

/// One JSON object per event, with the same location fields as text
pub fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer)
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = env_filter(config);

    match resolve_format(config.format, config.environment) {
        OutputFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer(std::io::stdout))
            .try_init(),
        OutputFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(text_layer(std::io::stdout))
            .try_init(),
    }
}
