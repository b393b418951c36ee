use std::net::SocketAddr;

use axum::{routing::get, Router};

use crate::{repository::TodoRepository, storage::Storage};

mod error;
mod extract;
mod handlers;
mod models;

use handlers::{create_todo, delete_todo, get_todo, health, list_todos, not_found, update_todo};

#[derive(Clone)]
pub struct AppState<S: Storage> {
    pub repo: TodoRepository<S>,
    pub started_at: std::time::SystemTime,
}

pub fn router<S: Storage + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/todos", get(list_todos::<S>).post(create_todo::<S>))
        .route(
            "/todos/:id",
            get(get_todo::<S>)
                .put(update_todo::<S>)
                .delete(delete_todo::<S>),
        )
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve<S: Storage + Clone + Send + Sync + 'static>(
    addr: SocketAddr,
    storage: S,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    let state = AppState {
        repo: TodoRepository::new(storage),
        started_at: std::time::SystemTime::now(),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 REST listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
