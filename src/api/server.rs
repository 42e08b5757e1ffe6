use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::services::{add_task, landing, remove_queue_element, stream};
use super::state::AppState;
use crate::config::Config;
use crate::queue::{FetchExecutor, JobRunner, PendingList};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Arc::new(Config::load()?);

    let address = address.unwrap_or(config.server.bind_addr);

    let pending = Arc::new(PendingList::new());

    let executor = Arc::new(FetchExecutor::new(config.clone()));
    let runner = Arc::new(JobRunner::spawn(
        executor,
        pending.clone(),
        config.download.queue_capacity,
        config.download.concurrent_jobs,
    ));

    let state = AppState::new(config, pending, runner);
    let app = build_router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "doujindl listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/do-the-thing", post(add_task))
        .route("/remove-queue-element", get(remove_queue_element))
        .route("/stream", get(stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
