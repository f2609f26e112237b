use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::{Value, json};
use slr_core::{Paper, ReviewStatus};

use crate::models::{ApiError, ApiResult, ProjectQuery, StatusQuery};
use crate::state::AppState;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProjectQuery>,
) -> Json<Vec<Paper>> {
    Json(state.data.papers(&params.project_id))
}

pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(paper): Json<Paper>,
) -> ApiResult<Json<Paper>> {
    if paper.id.is_empty() {
        return Err(ApiError::bad_request("Paper id is required"));
    }
    let saved = state.data.upsert_paper(paper)?;
    tracing::info!(paper_id = %saved.id, project_id = %saved.project_id, "paper saved");
    Ok(Json(saved))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(paper_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.data.delete_paper(&paper_id)?;
    tracing::info!(paper_id = %paper_id, "paper deleted");
    Ok(Json(json!({ "success": true })))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(paper_id): Path<String>,
    Query(params): Query<StatusQuery>,
) -> ApiResult<Json<Value>> {
    let status: ReviewStatus = params.status.parse().map_err(ApiError::bad_request)?;
    state.data.set_status(&paper_id, status)?;
    Ok(Json(json!({ "success": true, "status": status })))
}
