use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use slr_core::Project;

use crate::models::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<Project>> {
    Json(state.data.projects())
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(project): Json<Project>,
) -> ApiResult<Json<Project>> {
    if project.id.trim().is_empty() || project.name.trim().is_empty() {
        return Err(ApiError::bad_request("Project id and name are required"));
    }
    let created = state.data.create_project(project)?;
    tracing::info!(project_id = %created.id, "project created");
    Ok(Json(created))
}
