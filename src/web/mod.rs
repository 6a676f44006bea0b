mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::workflow::Workflow;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(workflow: Workflow, config: Config) -> Self {
        Self {
            workflow: Arc::new(workflow),
            config: Arc::new(config),
        }
    }
}

/// Start the web server and run until the shutdown future resolves.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.web_host, state.config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(state);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
