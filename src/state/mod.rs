use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::agent::ChatAgent;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::core::errors::error_chain;
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::rag::{self, build_embedder, CharacterSplitter, Embedder, RagError, Retriever, VectorIndex};

pub mod error;

use error::InitializationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Uninitialized,
    Ready,
    Failed,
}

/// The single "current agent" slot plus the status it implies.
struct AgentSlot {
    agent: Option<Arc<ChatAgent>>,
    status: ServiceStatus,
    last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: ServiceStatus,
    pub chunk_count: Option<usize>,
    pub embedding_model: Option<String>,
    pub llm_model: String,
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

/// Shared state behind every route.
///
/// Queries take a cheap `Arc` clone of the current agent and never hold the
/// lock while working; a rebuild swaps in a complete new agent. Rebuilds are
/// serialised among themselves but do not block queries.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmProvider>,
    slot: RwLock<AgentSlot>,
    rebuild_lock: Mutex<()>,
}

impl AppState {
    /// Loads configuration and constructs the providers. Does not touch the
    /// index; call [`AppState::startup`] for that.
    pub fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load()
            .map_err(InitializationError::Config)?;

        let embedder = build_embedder(&config.embedding);
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatProvider::from_config(&config.llm));

        Ok(Self::with_components(paths, config, embedder, llm))
    }

    pub fn with_components(
        paths: Arc<AppPaths>,
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmProvider>,
    ) -> Arc<Self> {
        Arc::new(AppState {
            paths,
            config: Arc::new(config),
            embedder,
            llm,
            slot: RwLock::new(AgentSlot {
                agent: None,
                status: ServiceStatus::Uninitialized,
                last_error: None,
            }),
            rebuild_lock: Mutex::new(()),
        })
    }

    pub fn source_path(&self) -> PathBuf {
        self.paths.resolve(&self.config.rag.source_path)
    }

    pub fn index_dir(&self) -> PathBuf {
        self.paths.resolve(&self.config.rag.index_dir)
    }

    pub fn splitter(&self) -> CharacterSplitter {
        CharacterSplitter::new(self.config.rag.chunk_size, self.config.rag.chunk_overlap)
    }

    /// Build the index if its directory is absent, otherwise load it. Any
    /// failure is logged and leaves the service in the failed state.
    pub async fn startup(&self) {
        let _guard = self.rebuild_lock.lock().await;
        let index_dir = self.index_dir();

        let result = if tokio::fs::try_exists(&index_dir).await.unwrap_or(false) {
            tracing::info!("Using existing index at {}", index_dir.display());
            self.load_existing(&index_dir).await
        } else {
            tracing::info!(
                "Creating vector index from {}",
                self.source_path().display()
            );
            self.build_fresh(&index_dir).await
        };

        match result {
            Ok(index) => {
                self.install(index);
                tracing::info!("Chat agent ready");
            }
            Err(err) => {
                let message = error_chain(&err);
                tracing::error!("Startup failed: {}", message);
                self.mark_failed(message);
            }
        }
    }

    /// Rebuild from the source document, whatever the current state.
    pub async fn rebuild(&self) -> Result<usize, RagError> {
        let _guard = self.rebuild_lock.lock().await;
        let index = self.build_fresh(&self.index_dir()).await?;
        let chunk_count = index.len();
        self.install(index);
        Ok(chunk_count)
    }

    pub fn current_agent(&self) -> Result<Arc<ChatAgent>, RagError> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.agent.clone().ok_or(RagError::NotInitialized)
    }

    pub fn status(&self) -> StatusSnapshot {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        let index = slot.agent.as_ref().map(|agent| agent.index());

        StatusSnapshot {
            status: slot.status,
            chunk_count: index.map(VectorIndex::len),
            embedding_model: index.map(|i| i.manifest().embedding_model.clone()),
            llm_model: self.llm.model().to_string(),
            built_at: index.map(|i| i.manifest().built_at),
            error: slot.last_error.clone(),
        }
    }

    async fn load_existing(&self, index_dir: &std::path::Path) -> Result<VectorIndex, RagError> {
        let index = rag::load_index(index_dir, self.embedder.as_ref()).await?;

        match rag::index::is_fresh(index.manifest(), &self.source_path()).await {
            Some(false) => tracing::warn!(
                "Index at {} is stale: {} changed since {}; POST /rebuild-index to refresh",
                index_dir.display(),
                self.source_path().display(),
                index.manifest().built_at
            ),
            None => tracing::warn!(
                "Source {} is unreadable; serving the existing index",
                self.source_path().display()
            ),
            Some(true) => {}
        }

        Ok(index)
    }

    async fn build_fresh(&self, index_dir: &std::path::Path) -> Result<VectorIndex, RagError> {
        rag::build_index(
            &self.source_path(),
            index_dir,
            &self.splitter(),
            self.embedder.as_ref(),
        )
        .await
    }

    fn install(&self, index: VectorIndex) {
        let retriever = Retriever::new(Arc::new(index), self.embedder.clone());
        let agent = Arc::new(ChatAgent::new(
            retriever,
            self.llm.clone(),
            self.config.llm.temperature,
        ));

        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.agent = Some(agent);
        slot.status = ServiceStatus::Ready;
        slot.last_error = None;
    }

    fn mark_failed(&self, message: String) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.agent = None;
        slot.status = ServiceStatus::Failed;
        slot.last_error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::llm::{ChatRequest, LlmError};
    use crate::rag::HashingEmbedder;

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
            Ok(request.messages[0].content.clone())
        }
    }

    fn state_in(root: &std::path::Path) -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.rag.source_path = PathBuf::from("policies.txt");
        config.rag.index_dir = PathBuf::from("vector_index");
        AppState::with_components(
            Arc::new(AppPaths::with_root(root.to_path_buf())),
            config,
            Arc::new(HashingEmbedder::new("feature-hash-384", 384)),
            Arc::new(EchoLlm),
        )
    }

    #[tokio::test]
    async fn starts_uninitialized_and_rejects_queries() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        assert_eq!(state.status().status, ServiceStatus::Uninitialized);
        assert!(matches!(state.current_agent(), Err(RagError::NotInitialized)));
    }

    #[tokio::test]
    async fn startup_without_source_fails_and_keeps_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        state.startup().await;

        let status = state.status();
        assert_eq!(status.status, ServiceStatus::Failed);
        assert!(status.error.unwrap().contains("source document not found"));
        assert!(state.current_agent().is_err());
        assert!(!dir.path().join("vector_index").exists());
    }

    #[tokio::test]
    async fn startup_builds_then_later_startups_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("policies.txt"), "Vacation: 20 days.\nSick leave: 10 days.").unwrap();

        let first = state_in(dir.path());
        first.startup().await;
        assert_eq!(first.status().status, ServiceStatus::Ready);
        let built_at = first.status().built_at;

        // Source removed: a second process must load rather than rebuild.
        std::fs::remove_file(dir.path().join("policies.txt")).unwrap();
        let second = state_in(dir.path());
        second.startup().await;

        let status = second.status();
        assert_eq!(status.status, ServiceStatus::Ready);
        assert_eq!(status.chunk_count, Some(1));
        assert_eq!(status.built_at, built_at);
    }

    #[tokio::test]
    async fn rebuild_recovers_from_failed_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        state.startup().await;
        assert_eq!(state.status().status, ServiceStatus::Failed);

        std::fs::write(dir.path().join("policies.txt"), "Vacation: 20 days.").unwrap();
        let chunks = state.rebuild().await.unwrap();

        assert_eq!(chunks, 1);
        assert_eq!(state.status().status, ServiceStatus::Ready);
        assert!(state.status().error.is_none());
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_serving_previous_agent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("policies.txt"), "Vacation: 20 days.").unwrap();
        let state = state_in(dir.path());
        state.startup().await;
        let before = state.current_agent().unwrap();

        std::fs::remove_file(dir.path().join("policies.txt")).unwrap();
        let err = state.rebuild().await.unwrap_err();

        assert!(matches!(err, RagError::SourceMissing(_)));
        let after = state.current_agent().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(state.status().status, ServiceStatus::Ready);
    }

    #[tokio::test]
    async fn in_flight_snapshot_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("policies.txt"), "Old: travel is forbidden.").unwrap();
        let state = state_in(dir.path());
        state.startup().await;
        let old_agent = state.current_agent().unwrap();

        std::fs::write(dir.path().join("policies.txt"), "New: travel needs approval.").unwrap();
        state.rebuild().await.unwrap();

        let old = old_agent.ask("travel").await.unwrap();
        let new = state.current_agent().unwrap().ask("travel").await.unwrap();
        assert_eq!(old.sources[0].content, "Old: travel is forbidden.");
        assert_eq!(new.sources[0].content, "New: travel needs approval.");
    }
}
