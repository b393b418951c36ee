use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    repository::TodoRepository,
    storage::Storage,
    types::{NewTodo, TodoError, TodoPatch},
};

use super::{
    error::ApiError,
    extract::{TodoIdPath, ValidatedJson},
    models::{ErrorResponse, HealthResponse, TodoView},
    AppState,
};

pub async fn health<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            uptime_secs,
        }),
    )
}

pub async fn list_todos<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<TodoView>>, ApiError> {
    let todos = with_repo(&state, |repo| repo.list()).await?;
    Ok(Json(todos.into_iter().map(TodoView::from).collect()))
}

pub async fn get_todo<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    TodoIdPath(id): TodoIdPath,
) -> Result<Json<TodoView>, ApiError> {
    let todo = with_repo(&state, move |repo| repo.get(id)).await?;
    Ok(Json(todo.into()))
}

pub async fn create_todo<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    ValidatedJson(input): ValidatedJson<NewTodo>,
) -> Result<(StatusCode, Json<TodoView>), ApiError> {
    let todo = with_repo(&state, move |repo| repo.create(&input)).await?;
    log::info!("Created todo {}", todo.id);
    Ok((StatusCode::CREATED, Json(todo.into())))
}

pub async fn update_todo<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    TodoIdPath(id): TodoIdPath,
    ValidatedJson(patch): ValidatedJson<TodoPatch>,
) -> Result<Json<TodoView>, ApiError> {
    let todo = with_repo(&state, move |repo| repo.update(id, &patch)).await?;
    Ok(Json(todo.into()))
}

pub async fn delete_todo<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    TodoIdPath(id): TodoIdPath,
) -> Result<StatusCode, ApiError> {
    with_repo(&state, move |repo| repo.delete(id)).await?;
    log::info!("Deleted todo {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            detail: "endpoint not found".to_string(),
        }),
    )
}

/// Run a repository call on the blocking pool; the store is synchronous.
async fn with_repo<S, T, F>(state: &AppState<S>, f: F) -> Result<T, ApiError>
where
    S: Storage + Clone + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&TodoRepository<S>) -> Result<T, TodoError> + Send + 'static,
{
    let repo = state.repo.clone();
    let out = tokio::task::spawn_blocking(move || f(&repo)).await??;
    Ok(out)
}
