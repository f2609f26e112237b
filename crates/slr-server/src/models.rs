use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use slr_core::DEFAULT_PROJECT_ID;

use crate::data::DataError;

fn default_project() -> String {
    DEFAULT_PROJECT_ID.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    #[serde(default = "default_project")]
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub query: String,
    #[serde(default = "default_project")]
    pub project_id: String,
}

/// An error answered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<DataError> for ApiError {
    fn from(e: DataError) -> Self {
        let status = match e {
            DataError::DuplicateProject => StatusCode::BAD_REQUEST,
            DataError::PaperNotFound => StatusCode::NOT_FOUND,
            DataError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), detail = %self.detail, "request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), detail = %self.detail, "client error");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
