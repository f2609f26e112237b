//! HTTP client for the curation backend.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};

use crate::backend::{Backend, BackendFuture};
use crate::{
    Config, CoreError, GenerateQueriesRequest, GenerateQueriesResponse, Paper, Project,
    QueryHistoryEntry, QuerySuggestion, ReviewStatus,
};

/// Thin wrapper over [`reqwest::Client`] bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(config.base_url.clone());
        client.timeout = config.timeout();
        client
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        }
    }

    /// Probe the server-wide `/health` endpoint (as opposed to the
    /// extension router's own probe used by [`Backend::health`]).
    pub async fn server_health(&self) -> Result<bool, CoreError> {
        let resp = self.request(Method::GET, "/health").send().await?;
        Ok(resp.status().is_success())
    }
}

/// Turn a non-2xx response into [`CoreError::Status`], keeping the body's
/// `detail` message when there is one.
async fn error_for_status(resp: Response) -> Result<Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(String::from));
    tracing::debug!(status = status.as_u16(), ?detail, "backend error response");
    Err(CoreError::Status {
        status: status.as_u16(),
        detail,
    })
}

fn paper_path(paper_id: &str) -> String {
    format!("/extension/papers/{}", urlencoding::encode(paper_id))
}

impl Backend for BackendClient {
    fn health(&self) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            let resp = self
                .request(Method::GET, "/extension/health")
                .send()
                .await?;
            Ok(resp.status().is_success())
        })
    }

    fn list_projects(&self) -> BackendFuture<'_, Vec<Project>> {
        Box::pin(async move {
            let resp = self
                .request(Method::GET, "/extension/projects")
                .send()
                .await?;
            Ok(error_for_status(resp).await?.json().await?)
        })
    }

    fn create_project<'a>(&'a self, project: &'a Project) -> BackendFuture<'a, Project> {
        Box::pin(async move {
            let resp = self
                .request(Method::POST, "/extension/projects")
                .json(project)
                .send()
                .await?;
            Ok(error_for_status(resp).await?.json().await?)
        })
    }

    fn save_paper<'a>(&'a self, paper: &'a Paper) -> BackendFuture<'a, Paper> {
        Box::pin(async move {
            let resp = self
                .request(Method::POST, "/extension/papers")
                .json(paper)
                .send()
                .await?;
            Ok(error_for_status(resp).await?.json().await?)
        })
    }

    fn list_papers<'a>(&'a self, project_id: &'a str) -> BackendFuture<'a, Vec<Paper>> {
        Box::pin(async move {
            let resp = self
                .request(Method::GET, "/extension/papers")
                .query(&[("project_id", project_id)])
                .send()
                .await?;
            Ok(error_for_status(resp).await?.json().await?)
        })
    }

    fn delete_paper<'a>(&'a self, paper_id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let resp = self
                .request(Method::DELETE, &paper_path(paper_id))
                .send()
                .await?;
            error_for_status(resp).await?;
            Ok(())
        })
    }

    fn update_status<'a>(
        &'a self,
        paper_id: &'a str,
        status: ReviewStatus,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("{}/status", paper_path(paper_id));
            let resp = self
                .request(Method::PATCH, &path)
                .query(&[("status", status.as_str())])
                .send()
                .await?;
            error_for_status(resp).await?;
            Ok(())
        })
    }

    fn generate_queries<'a>(
        &'a self,
        request: &'a GenerateQueriesRequest,
    ) -> BackendFuture<'a, Vec<QuerySuggestion>> {
        Box::pin(async move {
            let resp = self
                .request(Method::POST, "/extension/generate-queries")
                .json(request)
                .send()
                .await?;
            let body: GenerateQueriesResponse = error_for_status(resp).await?.json().await?;
            Ok(body.queries)
        })
    }

    fn log_query<'a>(&'a self, query: &'a str, project_id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let resp = self
                .request(Method::POST, "/extension/query-history")
                .query(&[("query", query), ("project_id", project_id)])
                .send()
                .await?;
            error_for_status(resp).await?;
            Ok(())
        })
    }

    fn query_history<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BackendFuture<'a, Vec<QueryHistoryEntry>> {
        Box::pin(async move {
            let resp = self
                .request(Method::GET, "/extension/query-history")
                .query(&[("project_id", project_id)])
                .send()
                .await?;
            Ok(error_for_status(resp).await?.json().await?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn paper_ids_are_path_encoded() {
        assert_eq!(
            paper_path("https://example.org/a b"),
            "/extension/papers/https%3A%2F%2Fexample.org%2Fa%20b"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // Port 9 (discard) on loopback is closed on test machines.
        let client = BackendClient::new("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let err = client.list_projects().await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
        assert!(matches!(err, CoreError::Unreachable(_)), "unexpected error: {err}");
    }
}
