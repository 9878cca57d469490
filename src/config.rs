//! Application configuration
//!
//! Every setting is a command-line flag with a dedicated
//! `NEEDYS_API_USER_*` environment variable. Enumerated settings are parsed
//! into closed types so an unknown value is rejected before anything starts.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

use clap::{Parser, ValueEnum};

/// Deployment environment
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Environment {
    Development,
    Integration,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Integration => "integration",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

/// Log verbosity
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Verbosity {
    Error,
    Warning,
    Info,
    Debug,
}

impl Verbosity {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Log output format; `Unset` defers to the environment
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Unset,
    Text,
    Json,
}

/// Command-line surface of the API server
#[derive(Parser, Debug)]
#[command(name = "api-server")]
#[command(about = "needys user API - CRUD over the user table")]
pub struct Cli {
    /// The current environment
    #[arg(short = 'e', long, env = "NEEDYS_API_USER_ENVIRONMENT", value_enum, default_value = "development")]
    pub environment: Environment,

    /// Verbosity level for logs
    #[arg(short = 'v', long, env = "NEEDYS_API_USER_VERBOSITY", value_enum, default_value = "info")]
    pub verbosity: Verbosity,

    /// Log formatter to use
    #[arg(short = 'l', long = "log-format", env = "NEEDYS_API_USER_LOG_FORMAT", value_enum, default_value = "unset")]
    pub log_format: LogFormat,

    /// Log healthcheck queries
    #[arg(long = "log-healthcheck", env = "NEEDYS_API_USER_LOG_HEALTHCHECK", default_value = "false")]
    pub log_healthcheck: bool,

    /// API server host
    #[arg(long = "server.host", env = "NEEDYS_API_USER_SERVER_HOST", default_value = "127.0.0.1")]
    pub server_host: String,

    /// API server port
    #[arg(long = "server.port", env = "NEEDYS_API_USER_SERVER_PORT", default_value = "8010")]
    pub server_port: u16,

    /// Healthcheck server port
    #[arg(long = "healthcheck.port", env = "NEEDYS_API_USER_HEALTHCHECK_PORT", default_value = "8090")]
    pub healthcheck_port: u16,

    /// Database host
    #[arg(long = "database.host", env = "NEEDYS_API_USER_DATABASE_HOST", default_value = "127.0.0.1")]
    pub database_host: String,

    /// Database port
    #[arg(long = "database.port", env = "NEEDYS_API_USER_DATABASE_PORT", default_value = "5432")]
    pub database_port: u16,

    /// Database user name
    #[arg(long = "database.username", env = "NEEDYS_API_USER_DATABASE_USERNAME", default_value = "needys")]
    pub database_username: String,

    /// Database user password
    #[arg(long = "database.password", env = "NEEDYS_API_USER_DATABASE_PASSWORD", default_value = "needys", hide_env_values = true)]
    pub database_password: String,

    /// Database name
    #[arg(long = "database.name", env = "NEEDYS_API_USER_DATABASE_NAME", default_value = "needys")]
    pub database_name: String,

    /// Reset and seed the user table at startup
    #[arg(long = "database.initialize", env = "NEEDYS_API_USER_DATABASE_INITIALIZE", default_value = "false")]
    pub database_initialize: bool,
}

/// Resolved, immutable configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    pub environment: Environment,
    pub verbosity: Verbosity,
    pub format: LogFormat,
    pub log_healthcheck: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub healthcheck_port: u16,
}

impl ServerConfig {
    /// `host:port` of the primary listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The health listener always binds every interface
    pub fn healthcheck_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.healthcheck_port))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub name: String,
    pub initialize: bool,
}

impl DatabaseConfig {
    /// Key/value connection string for `tokio-postgres`
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            quote(&self.host),
            self.port,
            quote(&self.username),
            quote(&self.password),
            quote(&self.name),
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("initialize", &self.initialize)
            .finish()
    }
}

/// Quote a libpq connection-string value
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            logging: LoggingConfig {
                environment: cli.environment,
                verbosity: cli.verbosity,
                format: cli.log_format,
                log_healthcheck: cli.log_healthcheck,
            },
            server: ServerConfig {
                host: cli.server_host,
                port: cli.server_port,
                healthcheck_port: cli.healthcheck_port,
            },
            database: DatabaseConfig {
                host: cli.database_host,
                port: cli.database_port,
                username: cli.database_username,
                password: cli.database_password,
                name: cli.database_name,
                initialize: cli.database_initialize,
            },
        }
    }
}

impl Config {
    /// Load `.env` if present, then parse flags and environment variables.
    ///
    /// Exits the process with a usage error on invalid values.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Cli::parse().into()
    }

    /// Parse from an explicit argument list
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Cli::try_parse_from(args).map(Into::into)
    }
}
