//! For reading application configuration.

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;
use std::{path::Path, time::Duration};

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Server address.
    pub http_address: String,
    /// Server http port.
    pub http_port: u16,
    /// How long in-flight requests may run after a termination signal.
    #[serde(with = "humantime_serde", default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(5)
}

impl ServerConfig {
    /// The address to bind the HTTP listener to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_address, self.http_port)
    }
}

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    /// The database username.
    pub username: String,
    /// The database password.
    pub password: String,
    /// The database port.
    pub port: u16,
    /// The database name.
    pub database_name: String,
    /// The database host.
    pub host: String,
    /// Upper bound on open connections in the pool.
    pub max_open_connections: u32,
    /// Connections kept open while idle.
    pub max_idle_connections: u32,
}

impl DatabaseConfig {
    /// Constructs connect options for the database.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .username(&self.username)
            .password(&self.password)
            .host(&self.host)
            .port(self.port)
            .database(&self.database_name)
            .charset("utf8mb4")
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct CacheConfig {
    /// The cache host.
    pub host: String,
    /// The cache port.
    pub port: u16,
    /// The cache password, if any.
    #[serde(default)]
    pub password: Option<String>,
    /// The logical database index.
    #[serde(default)]
    pub db: i64,
}

impl CacheConfig {
    /// Constructs connection info for the cache.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: None,
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct LogConfig {
    /// Log level, e.g. `info` or `debug`.
    pub level: String,
    /// The log file to write to.
    pub filename: String,
    /// Size in megabytes at which the log file is rotated.
    pub max_size_mb: u64,
    /// Number of rotated files to keep. 0 keeps all of them.
    pub max_backups: usize,
    /// Days to keep rotated files. 0 keeps them regardless of age.
    pub max_age_days: u64,
}

/// An error that occurred while loading configuration.
#[derive(Debug, thiserror::Error)]
#[error("failed to load configuration: {0}")]
pub struct ConfigError(#[from] config::ConfigError);

/// Retrieve [`Config`] from the default configuration file.
#[tracing::instrument]
pub fn load_config() -> Result<Config, ConfigError> {
    load(config::File::with_name("config"), environment())
}

/// Retrieve [`Config`] from a specific configuration file.
#[tracing::instrument]
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    load(config::File::from(path), environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("app")
        .prefix_separator("_")
        .separator("__")
}

fn load(
    file: config::File<config::FileSourceFile, config::FileFormat>,
    env: config::Environment,
) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?
        .try_deserialize()?;
    Ok(config)
}
