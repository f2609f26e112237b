use std::sync::Arc;

use slr_core::toggle::{AddToggle, ButtonState};
use slr_core::{
    Backend, BackendClient, CoreError, GenerateQueriesRequest, LocalStore, Paper, Project,
    QuerySuggestion, ReviewStatus,
};
use slr_server::gemini::{GenerateError, GenerateFuture, with_sites};
use slr_server::{AppState, DataFile, QueryGenerator, router};

/// Echoes the abstract back as a single query.
struct EchoGenerator;

impl QueryGenerator for EchoGenerator {
    fn generate<'a>(&'a self, request: &'a GenerateQueriesRequest) -> GenerateFuture<'a> {
        Box::pin(async move {
            if request.api_key == "bad" {
                return Err(GenerateError::Api {
                    status: 400,
                    message: "API key not valid".into(),
                });
            }
            Ok(vec![QuerySuggestion {
                query: with_sites(&request.abstract_text, &request.sites),
                description: Some(request.strategy.clone()),
            }])
        })
    }
}

async fn spawn_server() -> (tempfile::TempDir, BackendClient) {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(
        DataFile::new(dir.path().join("data.json")),
        Arc::new(EchoGenerator),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    (dir, BackendClient::new(format!("http://{addr}/")))
}

fn paper(id: &str, title: &str) -> Paper {
    let mut p = Paper::new(id, title);
    p.url = format!("https://example.org/{id}");
    p.authors = "A Author, B Author".into();
    p.year = Some(2021);
    p
}

#[tokio::test]
async fn health_probes_succeed() {
    let (_dir, client) = spawn_server().await;
    assert!(client.health().await.unwrap());
    assert!(client.server_health().await.unwrap());
}

#[tokio::test]
async fn projects_are_seeded_and_unique() {
    let (_dir, client) = spawn_server().await;

    let projects = client.list_projects().await.unwrap();
    assert_eq!(projects, vec![Project::new("default", "Default Project")]);

    let thesis = Project::new("thesis", "Thesis");
    assert_eq!(client.create_project(&thesis).await.unwrap(), thesis);

    let err = client.create_project(&thesis).await.unwrap_err();
    assert!(matches!(err, CoreError::Status { status: 400, .. }));
    assert_eq!(err.detail(), Some("Project ID already exists"));

    let ids: Vec<_> = client
        .list_projects()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec!["default", "thesis"]);
}

#[tokio::test]
async fn paper_lifecycle() {
    let (_dir, client) = spawn_server().await;

    client.save_paper(&paper("a", "First")).await.unwrap();
    client
        .save_paper(&paper("b", "Second").with_project("thesis"))
        .await
        .unwrap();
    client.save_paper(&paper("a", "First, revised")).await.unwrap();

    let papers = client.list_papers("default").await.unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].title, "First, revised");
    assert_eq!(papers[0].year, Some(2021));

    client
        .update_status("a", ReviewStatus::Reviewed)
        .await
        .unwrap();
    assert!(client.list_papers("default").await.unwrap()[0].is_reviewed());

    client.delete_paper("a").await.unwrap();
    assert!(client.list_papers("default").await.unwrap().is_empty());

    let err = client.delete_paper("a").await.unwrap_err();
    assert_eq!(err.detail(), Some("Paper not found"));
}

#[tokio::test]
async fn ids_with_slashes_round_trip() {
    let (_dir, client) = spawn_server().await;
    let id = "https://example.org/paper?id=1";
    client.save_paper(&paper(id, "Linked")).await.unwrap();
    client.update_status(id, ReviewStatus::Reviewed).await.unwrap();
    client.delete_paper(id).await.unwrap();
}

#[tokio::test]
async fn history_is_logged_per_project() {
    let (_dir, client) = spawn_server().await;
    client
        .log_query("\"code review\" LLM", "thesis")
        .await
        .unwrap();
    client.log_query("other", "default").await.unwrap();

    let history = client.query_history("thesis").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].query, "\"code review\" LLM");
    assert!(chrono::DateTime::parse_from_rfc3339(&history[0].timestamp).is_ok());
}

#[tokio::test]
async fn generate_queries_round_trip() {
    let (_dir, client) = spawn_server().await;
    let mut request = GenerateQueriesRequest {
        abstract_text: "LLMs for code review".into(),
        strategy: "precise".into(),
        sites: vec!["arxiv.org".into()],
        api_key: "k".into(),
    };

    let queries = client.generate_queries(&request).await.unwrap();
    assert_eq!(queries[0].query, "LLMs for code review (site:arxiv.org)");
    assert_eq!(queries[0].description.as_deref(), Some("precise"));

    request.api_key = "bad".into();
    let err = client.generate_queries(&request).await.unwrap_err();
    assert!(matches!(err, CoreError::Status { status: 500, .. }));
    assert!(err.detail().unwrap().contains("API key not valid"));
}

#[tokio::test]
async fn toggle_against_live_server() {
    let (_dir, client) = spawn_server().await;
    let store = LocalStore::in_memory();
    let (tx, _rx) = tokio::sync::broadcast::channel(4);
    let mut toggle = AddToggle::new(paper("t", "Toggled"));

    assert_eq!(toggle.activate(&client, &store, &tx).await, ButtonState::Saved);
    assert_eq!(client.list_papers("default").await.unwrap().len(), 1);

    assert_eq!(toggle.activate(&client, &store, &tx).await, ButtonState::New);
    assert!(client.list_papers("default").await.unwrap().is_empty());
}
