use std::sync::Arc;

use chadempire_server::{config::Config, router, store::Store, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = Store::connect(&config.database_url, config.db_max_connections).await?;
    store.migrate().await?;
    info!(database_url = %config.database_url, "database ready");

    let addr = config.bind.clone();
    let state = Arc::new(AppState::new(store, config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
