//! For interacting with the database.

use super::config::DatabaseConfig;
use sqlx::{mysql::MySqlPoolOptions, ConnectOptions, MySql, MySqlPool, Transaction};
use std::time::Duration;
use tracing::log::LevelFilter;

/// A common transaction type.
/// Use this for the business and persistence layer.
pub type Tx = Transaction<'static, MySql>;

/// A database connection pool.
///
/// The pool is only reachable through the operations below,
/// and is closed exactly once by [`Database::close`].
#[derive(Clone, Debug)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Connects to the database based on some configuration.
    ///
    /// Fails if no connection can be established.
    #[tracing::instrument(skip_all, fields(host = %config.host, port = config.port, database = %config.database_name))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let db_options = config
            .connect_options()
            .log_statements(LevelFilter::Debug);
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_secs(5))
            .max_connections(config.max_open_connections)
            .min_connections(config.max_idle_connections.min(config.max_open_connections))
            .connect_with(db_options)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "connect to database failed"))?;
        tracing::info!("Connected to database");
        Ok(Self { pool })
    }

    /// Begins a transaction.
    pub async fn begin(&self) -> Result<Tx, sqlx::Error> {
        self.pool.begin().await
    }

    /// Checks that the database responds.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool, waiting for checked out connections to be returned.
    pub async fn close(self) {
        tracing::info!("Closing database pool");
        self.pool.close().await;
    }
}
