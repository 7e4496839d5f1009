//! Shared handler state.

use crate::config::Config;
use deadpool_postgres::Runtime;
use moviedb::Store;
use moviedb::pool::create_pool_with_manager_config;

/// State handed to every handler. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Build the pool and store described by `config`.
    ///
    /// No connection is opened until the first request.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let db = &config.database;
        let acquire = db.acquire_timeout();
        let pool = create_pool_with_manager_config(
            &db.url,
            deadpool_postgres::ManagerConfig::default(),
            |builder| {
                builder
                    .max_size(db.pool_size)
                    .runtime(Runtime::Tokio1)
                    .wait_timeout(Some(acquire))
                    .create_timeout(Some(acquire))
            },
        )?;

        let mut store = Store::new(pool);
        if let Some(timeout) = db.query_timeout() {
            store = store.with_query_timeout(timeout);
        }
        Ok(Self::new(store))
    }
}
