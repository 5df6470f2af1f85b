pub mod config;
pub mod db;
pub mod error;
pub mod guards;
pub mod models;
pub mod routes;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use config::Config;
use db::driver::Db;
use tokio::{
    net::TcpListener,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

// === App State ===
// One lock around the whole store: every request holds it across its guards
// and handler, so requests never interleave.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    state: Arc<RwLock<Db>>,
}
impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // borrow immutable state
    pub async fn read(&self) -> RwLockReadGuard<'_, Db> {
        self.state.read().await
    }
    // borrow mutable state
    pub async fn write(&self) -> RwLockWriteGuard<'_, Db> {
        self.state.write().await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.init_tracing();

    let app = routes::router(AppState::new());

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = wait_for_shutdown().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        // keep serving
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, draining connections");
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;
    Ok(())
}
