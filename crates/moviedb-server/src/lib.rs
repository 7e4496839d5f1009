//! HTTP API for the movie database.
//!
//! Routes live under `/api/<plural>` for each entity; see [`routes::router`].

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use state::AppState;
use tokio::net::TcpListener;

/// Load configuration, optionally bootstrap the schema, and serve until the
/// process is stopped.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let config = Config::load(&args)?;
    let addr = config.bind_addr()?;
    tracing::info!(
        %addr,
        pool_size = config.database.pool_size,
        query_timeout_ms = config.database.query_timeout_ms,
        "starting moviedb-server"
    );

    let state = AppState::from_config(&config)?;

    if config.bootstrap.enabled {
        let client = state.store.client().await?;
        moviedb::bootstrap::run(&client, config.bootstrap.seed).await?;
    }

    let app = routes::router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
