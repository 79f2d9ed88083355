//! Global application state.
//!
//! Used for access to common resources such as the
//! database pool or the cache connection.

use super::{cache::Cache, database::Database};
use axum::extract::FromRef;

/// Global application state.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    db: Database,
    cache: Cache,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(db: Database, cache: Cache) -> Self {
        Self { db, cache }
    }

    /// Returns the database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}
