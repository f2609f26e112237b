//! Search-query generation from an abstract.

use std::process::Command;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::Backend;
use crate::scholar::scholar_search_url;
use crate::{CoreError, GenerateQueriesRequest, QuerySuggestion};

pub const DEFAULT_STRATEGY: &str = "balanced";

/// Strategies the backend understands, as `(value, label)`.
pub const STRATEGIES: &[(&str, &str)] = &[
    ("balanced", "Balanced (precision + recall)"),
    ("broad", "Broad (maximize recall)"),
    ("precise", "Precise (maximize precision)"),
];

/// Sites offered as `site:` restrictions.
pub const DEFAULT_SITES: &[&str] = &[
    "sciencedirect.com",
    "ieeexplore.ieee.org",
    "link.springer.com",
    "dl.acm.org",
    "arxiv.org",
];

pub const NO_QUERIES: &str = "No queries generated. Try a different abstract.";
const GENERIC_FAILURE: &str = "Failed to generate queries";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistantError {
    #[error("Please enter an idea or abstract")]
    MissingAbstract,
    #[error("Please enter your Gemini API key")]
    MissingApiKey,
    #[error("{0}")]
    Backend(String),
}

impl AssistantError {
    /// Input problems are warnings; backend failures are errors.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            AssistantError::MissingAbstract | AssistantError::MissingApiKey
        )
    }
}

/// What the user typed into the assistant panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryForm {
    pub abstract_text: String,
    pub strategy: String,
    pub sites: Vec<String>,
    pub api_key: String,
}

impl QueryForm {
    /// Check the required fields and build the request body.
    pub fn validate(&self) -> Result<GenerateQueriesRequest, AssistantError> {
        let abstract_text = self.abstract_text.trim();
        if abstract_text.is_empty() {
            return Err(AssistantError::MissingAbstract);
        }
        let api_key = self.api_key.trim();
        if api_key.is_empty() {
            return Err(AssistantError::MissingApiKey);
        }
        let strategy = match self.strategy.trim() {
            "" => DEFAULT_STRATEGY,
            s => s,
        };
        Ok(GenerateQueriesRequest {
            abstract_text: abstract_text.to_string(),
            strategy: strategy.to_string(),
            sites: self.sites.clone(),
            api_key: api_key.to_string(),
        })
    }
}

fn failure_message(err: &CoreError) -> String {
    match err {
        CoreError::Status { detail, .. } => detail
            .clone()
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        other => other.to_string(),
    }
}

/// Validate `form` and ask the backend for suggestions.
///
/// Nothing is sent when validation fails. A non-2xx answer surfaces the
/// backend's `detail`, or a generic message when it has none.
pub async fn generate_queries(
    backend: &dyn Backend,
    form: &QueryForm,
) -> Result<Vec<QuerySuggestion>, AssistantError> {
    let request = form.validate()?;
    backend.generate_queries(&request).await.map_err(|e| {
        tracing::error!(error = %e, "query generation failed");
        AssistantError::Backend(failure_message(&e))
    })
}

/// Record an opened query in the project's history without waiting for it.
pub fn log_query_detached(backend: Arc<dyn Backend>, query: String, project_id: String) {
    tokio::spawn(async move {
        if let Err(e) = backend.log_query(&query, &project_id).await {
            tracing::warn!(project_id = %project_id, error = %e, "failed to log query");
        }
    });
}

/// Open `url` with the platform's default handler.
pub fn open_url(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    command.arg(url).spawn()?;
    Ok(())
}

/// Open a Scholar search for `query` and log it to history.
pub fn open_in_scholar(
    backend: Arc<dyn Backend>,
    query: &str,
    project_id: &str,
) -> std::io::Result<()> {
    let url = scholar_search_url(query);
    tracing::info!(%url, "opening scholar search");
    open_url(&url)?;
    log_query_detached(backend, query.to_string(), project_id.to_string());
    Ok(())
}
