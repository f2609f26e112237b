use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use slr_core::{GenerateQueriesRequest, GenerateQueriesResponse};

use crate::models::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn generate_queries(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateQueriesRequest>,
) -> ApiResult<Json<GenerateQueriesResponse>> {
    if request.abstract_text.trim().is_empty() {
        return Err(ApiError::bad_request("Abstract is required"));
    }
    if request.api_key.trim().is_empty() {
        return Err(ApiError::bad_request("API key is required"));
    }
    let queries = state
        .generator
        .generate(&request)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::info!(count = queries.len(), "queries generated");
    Ok(Json(GenerateQueriesResponse { queries }))
}
