use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use slr_core::QueryHistoryEntry;

use crate::models::{ApiError, ApiResult, LogQuery, ProjectQuery};
use crate::state::AppState;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProjectQuery>,
) -> Json<Vec<QueryHistoryEntry>> {
    Json(state.data.history(&params.project_id))
}

pub async fn log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogQuery>,
) -> ApiResult<Json<QueryHistoryEntry>> {
    if params.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }
    let entry = state.data.log_query(&params.query, &params.project_id)?;
    Ok(Json(entry))
}
