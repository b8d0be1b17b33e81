use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use policy_qa_backend::core::config::{AppConfig, AppPaths};
use policy_qa_backend::llm::{ChatRequest, LlmError, LlmProvider};
use policy_qa_backend::rag::HashingEmbedder;
use policy_qa_backend::server::router::router;
use policy_qa_backend::state::AppState;

/// Answers with the prompt it was given, so the answer contains exactly the
/// retrieved context.
struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-model"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        Ok(request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn test_state(root: &Path) -> Arc<AppState> {
    let mut config = AppConfig::default();
    config.rag.source_path = PathBuf::from("data/policies.txt");
    config.rag.index_dir = PathBuf::from("vector_index");
    AppState::with_components(
        Arc::new(AppPaths::with_root(root.to_path_buf())),
        config,
        Arc::new(HashingEmbedder::new("feature-hash-384", 384)),
        Arc::new(EchoLlm),
    )
}

fn write_source(root: &Path, text: &str) {
    std::fs::create_dir_all(root.join("data")).unwrap();
    std::fs::write(root.join("data/policies.txt"), text).unwrap();
}

async fn spawn(state: Arc<AppState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn ask(base: &str, question: &str) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("{base}/query"))
        .json(&json!({ "query": question }))
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn root_reports_liveness() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn(test_state(dir.path())).await;

    let body: Value = reqwest::get(format!("{base}/")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "message": "Domain-Aware Chat API is running" }));
}

#[tokio::test]
async fn query_before_startup_is_not_initialized() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn(test_state(dir.path())).await;

    let (status, body) = ask(&base, "How many vacation days?").await;

    assert_eq!(status, 500);
    assert!(body["detail"].as_str().unwrap().contains("not initialized"));
}

#[tokio::test]
async fn blank_query_is_rejected_before_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "Vacation: 20 days.");
    let state = test_state(dir.path());
    state.startup().await;
    let base = spawn(state).await;

    let (status, body) = ask(&base, "   ").await;

    assert_eq!(status, 400);
    assert_eq!(body, json!({ "detail": "query must not be empty" }));
}

#[tokio::test]
async fn startup_without_source_leaves_service_failed() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    state.startup().await;
    let base = spawn(state).await;

    let (status, body) = ask(&base, "anything").await;
    assert_eq!(status, 500);
    assert!(body["detail"].as_str().unwrap().contains("not initialized"));

    let health: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "failed");
    assert!(health["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn answers_vacation_question_from_policy() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "Vacation: 20 days.\nSick leave: 10 days.");
    let state = test_state(dir.path());
    state.startup().await;
    let base = spawn(state).await;

    let (status, body) = ask(&base, "How many vacation days?").await;

    assert_eq!(status, 200);
    assert!(body["answer"].as_str().unwrap().contains("20"));
    let sources = body["sources"].as_array().unwrap();
    assert!(sources
        .iter()
        .any(|s| s["content"].as_str().unwrap().contains("Vacation: 20 days.")));
    assert!(sources[0]["metadata"]["source"]
        .as_str()
        .unwrap()
        .ends_with("policies.txt"));
}

#[tokio::test]
async fn sources_are_at_most_three_stored_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let text = (0..30)
        .map(|i| format!("Section {i}: remote work requires manager approval form {i}."))
        .collect::<Vec<_>>()
        .join("\n");
    write_source(dir.path(), &text);
    let state = test_state(dir.path());
    state.startup().await;
    let stored: Vec<String> = state
        .current_agent()
        .unwrap()
        .index()
        .chunks()
        .map(|c| c.content.clone())
        .collect();
    assert!(stored.len() > 3);
    let base = spawn(state).await;

    let (status, body) = ask(&base, "remote work approval").await;

    assert_eq!(status, 200);
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 3);
    for source in sources {
        let content = source["content"].as_str().unwrap();
        assert!(stored.iter().any(|c| c == content), "unknown chunk: {content}");
    }
}

#[tokio::test]
async fn rebuild_switches_answers_to_new_document() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "Travel: economy class only.");
    let state = test_state(dir.path());
    state.startup().await;
    let base = spawn(state).await;

    write_source(dir.path(), "Parking: free for all staff.");
    let res = reqwest::Client::new()
        .post(format!("{base}/rebuild-index"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Index rebuilt successfully" }));

    let (status, body) = ask(&base, "What about travel?").await;
    assert_eq!(status, 200);
    let sources = body["sources"].as_array().unwrap();
    assert!(!sources.is_empty());
    for source in sources {
        assert_eq!(source["content"], "Parking: free for all staff.");
    }
}

#[tokio::test]
async fn rebuild_failure_returns_fixed_detail() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn(test_state(dir.path())).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/rebuild-index"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "detail": "Index rebuild failed" }));
}

#[tokio::test]
async fn rebuild_recovers_a_failed_service() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    state.startup().await;
    let base = spawn(state).await;

    write_source(dir.path(), "Vacation: 20 days.");
    let res = reqwest::Client::new()
        .post(format!("{base}/rebuild-index"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let (status, body) = ask(&base, "vacation").await;
    assert_eq!(status, 200);
    assert!(body["answer"].as_str().unwrap().contains("20"));

    let health: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ready");
    assert_eq!(health["chunk_count"], 1);
    assert_eq!(health["llm_model"], "echo-model");
}
