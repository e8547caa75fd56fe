use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    repository::CreateTask,
    storage::TaskChanges,
    task::TaskId,
};

use super::{
    AppState,
    auth::AuthenticatedOwner,
    error::ApiError,
    model::{CreateTodoRequest, TodoResponse, UpdateTodoRequest},
};

type ApiResult<T> = Result<T, ApiError>;

pub(super) async fn list_todos(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> ApiResult<Json<Vec<TodoResponse>>> {
    let tasks = state.repository.list(&owner).await?;

    Ok(Json(tasks.into_iter().map(Into::into).collect()))
}

pub(super) async fn get_todo(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> ApiResult<Json<TodoResponse>> {
    let id = parse_id(id)?;
    let task = state.repository.get(&owner, id).await?;

    Ok(Json(task.into()))
}

pub(super) async fn create_todo(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TodoResponse>)> {
    let Json(request) = payload?;
    let task = CreateTask::try_from(request)?;
    let created = state.repository.create(&owner, task).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

pub(super) async fn update_todo(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> ApiResult<Json<TodoResponse>> {
    let id = parse_id(id)?;
    let Json(request) = payload?;
    let changes = TaskChanges::try_from(request)?;
    let updated = state.repository.update(&owner, id, changes).await?;

    Ok(Json(updated.into()))
}

pub(super) async fn delete_todo(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    // An id that cannot exist is simply already deleted.
    if let Ok(id) = TaskId::parse_str(&id) {
        state.repository.delete(&owner, id).await?;
    }

    Ok(Json(serde_json::json!({ "message": "Todo deleted" })))
}

fn parse_id(id: String) -> ApiResult<TaskId> {
    TaskId::parse_str(&id).map_err(|_| ApiError::UnknownId(id))
}
