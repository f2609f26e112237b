//! Reference backend for SLR Partner.
//!
//! Serves the `/extension/*` API the clients talk to, persisting everything
//! in one JSON file.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod data;
pub mod gemini;
pub mod handlers;
pub mod models;
pub mod state;

pub use data::DataFile;
pub use gemini::{GeminiGenerator, QueryGenerator};
pub use state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let extension = Router::new()
        .route("/health", get(handlers::health::extension_health))
        .route(
            "/projects",
            get(handlers::projects::list).post(handlers::projects::create),
        )
        .route(
            "/papers",
            get(handlers::papers::list).post(handlers::papers::save),
        )
        .route("/papers/{paper_id}", delete(handlers::papers::delete))
        .route(
            "/papers/{paper_id}/status",
            patch(handlers::papers::update_status),
        )
        .route(
            "/generate-queries",
            post(handlers::generate::generate_queries),
        )
        .route(
            "/query-history",
            get(handlers::history::list).post(handlers::history::log),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/extension", extension)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::gemini::GenerateFuture;
    use slr_core::{GenerateQueriesRequest, QuerySuggestion};

    struct Unused;

    impl QueryGenerator for Unused {
        fn generate<'a>(&'a self, _request: &'a GenerateQueriesRequest) -> GenerateFuture<'a> {
            Box::pin(async { Ok(Vec::<QuerySuggestion>::new()) })
        }
    }

    fn app(dir: &tempfile::TempDir) -> Router {
        let data = DataFile::new(dir.path().join("data.json"));
        router(Arc::new(AppState::new(data, Arc::new(Unused))))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_endpoints_answer() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(app(&dir), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(app(&dir), "GET", "/extension/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("connected"));
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(&dir),
            "PATCH",
            "/extension/papers/p1/status?status=done",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("detail"));
    }

    #[tokio::test]
    async fn empty_abstract_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(&dir),
            "POST",
            "/extension/generate-queries",
            Some(r#"{"abstract": " ", "strategy": "balanced", "sites": [], "api_key": "k"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Abstract is required"));
    }
}
