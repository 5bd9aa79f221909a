//! `server`
//!
//! Thin HTTP surface over `bookstore_core`: CRUD on books with search, price
//! filter and ordering, plus the patch-only endpoint mutating the caller's own
//! relation to a book. Every handler is a pass-through to the relation store,
//! catalog query and access policy in the core crate.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
};
use bookstore_core::database::types::StoreError;

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use routes::{
    create_book_handler, delete_book_handler, get_book_handler, list_books_handler,
    patch_book_handler, patch_relation_handler, put_book_handler,
};
use state::AppState;

/// Error leaving `start_server` before the listener is up.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[must_use]
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/books", get(list_books_handler).post(create_book_handler))
        .route(
            "/books/{id}",
            get(get_book_handler)
                .put(put_book_handler)
                .patch(patch_book_handler)
                .delete(delete_book_handler),
        )
        .route("/relations/{book_id}", patch(patch_relation_handler))
        .with_state(state)
}

pub async fn start_server() -> Result<(), StartError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    let address = format!("0.0.0.0:{}", state.config.port);
    let router = app(state);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
