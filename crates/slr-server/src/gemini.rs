//! Query generation through the Gemini `generateContent` API.

use std::future::Future;
use std::pin::Pin;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use slr_core::{GenerateQueriesRequest, QuerySuggestion};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-flash-lite-latest";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYSTEM_PROMPT: &str = "You are an expert in academic database search strategies. \
Convert research ideas into effective Google Scholar search queries using quotes for exact \
phrases, OR between synonyms and parentheses for grouping. Always respond in valid JSON.";

/// First `{` through last `}` of a model reply.
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("language model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("could not parse language model reply: {0}")]
    Parse(String),
}

pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<QuerySuggestion>, GenerateError>> + Send + 'a>>;

/// Turns an abstract into search-query suggestions.
pub trait QueryGenerator: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerateQueriesRequest) -> GenerateFuture<'a>;
}

fn strategy_guidance(strategy: &str) -> &'static str {
    match strategy {
        "broad" => "Favour recall: use many synonyms and few required terms.",
        "precise" => "Favour precision: use exact phrases and several required terms.",
        _ => "Balance precision and recall.",
    }
}

pub fn build_prompt(abstract_text: &str, strategy: &str) -> String {
    format!(
        "Research idea or abstract:\n{abstract_text}\n\n\
         Derive 3-5 research questions and write one Google Scholar search query for each. \
         {guidance} Keep queries as simple as possible.\n\n\
         Respond in this exact JSON format:\n\
         {{\"queries\": [{{\"research_question\": \"RQ1: ...\", \"search_query\": \"...\"}}]}}",
        guidance = strategy_guidance(strategy),
    )
}

/// Append a `site:` restriction group to `query`.
pub fn with_sites(query: &str, sites: &[String]) -> String {
    let sites: Vec<_> = sites
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("site:{}", s))
        .collect();
    if sites.is_empty() {
        query.to_string()
    } else {
        format!("{} ({})", query, sites.join(" OR "))
    }
}

fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// Extract suggestions from a model reply that contains a JSON object,
/// possibly wrapped in prose or a code fence.
pub fn parse_reply(reply: &str, sites: &[String]) -> Result<Vec<QuerySuggestion>, GenerateError> {
    let object = JSON_OBJECT
        .find(reply)
        .ok_or_else(|| GenerateError::Parse("no JSON object in reply".into()))?;
    let data: Value =
        serde_json::from_str(object.as_str()).map_err(|e| GenerateError::Parse(e.to_string()))?;

    let items = data
        .get("queries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(items
        .iter()
        .filter_map(|item| {
            let query = string_field(item, &["search_query", "query"])?;
            Some(QuerySuggestion {
                query: with_sites(&query, sites),
                description: string_field(item, &["research_question", "description"]),
            })
        })
        .collect())
}

/// Concatenated text parts of the first candidate.
fn reply_text(body: &Value) -> Option<String> {
    let parts = body
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    model: String,
    api_base: String,
}

impl Default for GeminiGenerator {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl GeminiGenerator {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            api_base: API_BASE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn call(&self, request: &GenerateQueriesRequest) -> Result<String, GenerateError> {
        let url = format!("{}/{}:generateContent", self.api_base, self.model);
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(&request.abstract_text, &request.strategy) }]
            }],
        });
        let resp = self
            .client
            .post(url)
            .query(&[("key", request.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let payload: Value = resp.json().await?;
        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }
        reply_text(&payload).ok_or_else(|| GenerateError::Parse("empty reply".into()))
    }
}

impl QueryGenerator for GeminiGenerator {
    fn generate<'a>(&'a self, request: &'a GenerateQueriesRequest) -> GenerateFuture<'a> {
        Box::pin(async move {
            tracing::info!(model = %self.model, strategy = %request.strategy, "generating queries");
            let reply = self.call(request).await?;
            parse_reply(&reply, &request.sites)
        })
    }
}
