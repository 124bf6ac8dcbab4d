//! Reply pipeline: Retrieve -> LLM (if configured) -> heuristic fallback

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::config::FallbackMode;
use crate::config::LLM_API_KEY_ENV;
use crate::database::KnowledgeStore;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::EchoRagError;
use crate::errors::Result;
use crate::llm::LlmOutcome;
use crate::llm::LlmResponseGenerator;
use crate::llm::PromptStore;
use crate::persona::PersonaProfile;
use crate::rag::EmbeddingIndex;
use crate::rag::EmbeddingSource;
use crate::rag::ResponseComposer;
use crate::rag::SimilarityRetriever;

/// Where the persona profile comes from
#[derive(Debug, Clone)]
pub enum PersonaSource {
    /// JSON file read on first use; a missing file means no persona
    File(PathBuf),
    /// Profile supplied up front
    Fixed(Option<PersonaProfile>),
}

/// Data loaded once on first use
struct LoadedState {
    retriever: SimilarityRetriever,
    persona: Option<PersonaProfile>,
}

/// Snapshot of the service for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub initialized: bool,
    pub indexed_messages: usize,
    pub persona_loaded: bool,
    pub llm_configured: bool,
    pub llm_active: bool,
    pub fallback_mode: FallbackMode,
}

/// Top-level reply service
pub struct ResponseService {
    embedder: Arc<dyn Embedder>,
    source: Arc<dyn EmbeddingSource>,
    persona_source: PersonaSource,
    state: OnceCell<LoadedState>,
    composer: ResponseComposer,
    generator: LlmResponseGenerator,
    fallback_mode: FallbackMode,
    default_top_k: usize,
    rng: Mutex<StdRng>,
}

impl ResponseService {
    /// Create a service with no persona, default composer settings and hybrid fallback
    pub fn new(
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn EmbeddingSource>,
        generator: LlmResponseGenerator,
    ) -> Self {
        Self {
            embedder,
            source,
            persona_source: PersonaSource::Fixed(None),
            state: OnceCell::new(),
            composer: ResponseComposer::default(),
            generator,
            fallback_mode: FallbackMode::default(),
            default_top_k: crate::config::default_top_k(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Wire the SQLite store, HTTP embedder, prompt file and LLM client from config
    ///
    /// # Errors
    /// - Database connection errors
    /// - Invalid embedding provider or LLM settings
    /// - Unreadable or malformed prompt file
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = KnowledgeStore::from_config(config).await?;
        store.init_schema().await?;
        let embedder = EmbeddingClient::from_app_config(config)?;
        let prompts = Arc::new(PromptStore::from_file(&config.bot.prompts_path).await?);
        let generator = LlmResponseGenerator::from_config(config, prompts)?;

        Ok(Self::new(Arc::new(embedder), Arc::new(store), generator)
            .with_persona(PersonaSource::File(config.bot.persona_path.clone()))
            .with_composer(ResponseComposer::new(config.composer.clone()))
            .with_fallback_mode(config.fallback_mode())
            .with_default_top_k(config.retrieval.top_k))
    }

    #[must_use]
    pub fn with_persona(mut self, persona_source: PersonaSource) -> Self {
        self.persona_source = persona_source;
        self
    }

    #[must_use]
    pub fn with_composer(mut self, composer: ResponseComposer) -> Self {
        self.composer = composer;
        self
    }

    #[must_use]
    pub fn with_fallback_mode(mut self, fallback_mode: FallbackMode) -> Self {
        self.fallback_mode = fallback_mode;
        self
    }

    #[must_use]
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Replace the random source used for greeting and ending choice
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    pub fn fallback_mode(&self) -> FallbackMode {
        self.fallback_mode
    }

    pub fn generator(&self) -> &LlmResponseGenerator {
        &self.generator
    }

    /// Load the index and persona if that has not happened yet
    pub async fn initialize(&self) -> Result<bool> {
        self.ensure_initialized_with(|| ()).await
    }

    /// Load the index and persona once, calling `on_first_load` just before the load starts.
    ///
    /// Returns `true` when this call performed the load. Concurrent first
    /// callers wait for a single load; a failed load is retried next time,
    /// and the callback runs again for that attempt.
    pub async fn ensure_initialized_with<F>(&self, on_first_load: F) -> Result<bool>
    where
        F: FnOnce(),
    {
        if self.state.initialized() {
            return Ok(false);
        }

        let performed = AtomicBool::new(false);
        let flag = &performed;
        self.state
            .get_or_try_init(|| async move {
                flag.store(true, Ordering::Release);
                on_first_load();
                self.load_state().await
            })
            .await?;

        Ok(performed.load(Ordering::Acquire))
    }

    async fn state(&self) -> Result<&LoadedState> {
        self.state.get_or_try_init(|| self.load_state()).await
    }

    async fn load_state(&self) -> Result<LoadedState> {
        info!("Loading embedding index");
        let messages = self.source.load().await?;
        let index = EmbeddingIndex::from_messages(messages, self.embedder.dimension())?;
        info!("Embedding index ready: {} messages", index.len());
        if index.is_empty() {
            warn!("Embedding index is empty; every query will get the unknown reply");
        }
        let retriever = SimilarityRetriever::new(Arc::clone(&self.embedder), Arc::new(index))?;

        let persona = match &self.persona_source {
            PersonaSource::File(path) => PersonaProfile::load(path).await?,
            PersonaSource::Fixed(profile) => profile.clone(),
        };
        if persona.is_none() {
            info!("No persona profile; heuristic replies use the best match verbatim");
        }

        Ok(LoadedState { retriever, persona })
    }

    /// Retrieval only, without composing a reply
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let state = self.state().await?;
        state.retriever.search_similar(query, top_k).await
    }

    /// Reply to `query` using the configured default `top_k`
    pub async fn generate_response_default(&self, query: &str) -> Result<String> {
        self.generate_response(query, self.default_top_k).await
    }

    /// Reply to `query` from its `top_k` most similar stored messages.
    ///
    /// # Errors
    /// - Index or persona load failures
    /// - Embedding failures for the query
    /// - In strict mode: `ConfigError` without an API key, `LlmError` when the LLM fails
    pub async fn generate_response(&self, query: &str, top_k: usize) -> Result<String> {
        let state = self.state().await?;

        let retrieved = state.retriever.search_similar(query, top_k).await?;
        if retrieved.is_empty() {
            info!("No similar messages found");
            return Ok(self.composer.config().unknown_response.clone());
        }
        debug!("Retrieved {} messages", retrieved.len());

        if self.fallback_mode == FallbackMode::Strict && !self.generator.is_configured() {
            return Err(EchoRagError::ConfigError(format!(
                "{LLM_API_KEY_ENV} is not set; strict mode requires an LLM API key"
            )));
        }

        match self.generator.generate(query, &retrieved).await {
            LlmOutcome::Response(text) => return Ok(text),
            LlmOutcome::Failed(message) => match self.fallback_mode {
                FallbackMode::Strict => return Err(EchoRagError::LlmError(message)),
                FallbackMode::Hybrid => {
                    warn!("LLM failed, falling back to heuristic reply: {}", message);
                }
            },
            LlmOutcome::NotConfigured => debug!("LLM not configured, using heuristic reply"),
        }

        Ok(self.compose(query, &retrieved, state.persona.as_ref()))
    }

    fn compose(&self, query: &str, retrieved: &[String], persona: Option<&PersonaProfile>) -> String {
        let Some(persona) = persona else {
            return retrieved
                .first()
                .cloned()
                .unwrap_or_else(|| self.composer.config().unknown_response.clone());
        };
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.composer.compose(query, retrieved, persona, &mut *rng)
    }

    pub fn status(&self) -> ServiceStatus {
        let state = self.state.get();
        ServiceStatus {
            initialized: state.is_some(),
            indexed_messages: state.map_or(0, |s| s.retriever.index().len()),
            persona_loaded: state.is_some_and(|s| s.persona.is_some()),
            llm_configured: self.generator.is_configured(),
            llm_active: self.generator.has_succeeded(),
            fallback_mode: self.fallback_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::models::EmbeddedMessage;
    use crate::rag::StaticSource;

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// Counts loads so tests can assert single initialization
    struct CountingSource {
        inner: StaticSource,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingSource for CountingSource {
        async fn load(&self) -> Result<Vec<EmbeddedMessage>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.inner.load().await
        }
    }

    fn service(texts: &[&str]) -> ResponseService {
        let messages = texts
            .iter()
            .map(|t| EmbeddedMessage::new(*t, vec![1.0, 0.0]))
            .collect();
        ResponseService::new(
            Arc::new(ConstantEmbedder),
            Arc::new(StaticSource::new(messages)),
            LlmResponseGenerator::disabled(),
        )
    }

    #[tokio::test]
    async fn test_empty_index_returns_unknown() {
        let reply = service(&[]).generate_response("anything", 5).await.unwrap();
        assert_eq!(reply, crate::config::DEFAULT_UNKNOWN_RESPONSE);
    }

    #[tokio::test]
    async fn test_no_persona_returns_top_match() {
        let reply = service(&["Hello there.", "other"])
            .generate_response("hi", 5)
            .await
            .unwrap();
        assert_eq!(reply, "Hello there.");
    }

    #[tokio::test]
    async fn test_strict_mode_without_key_is_config_error() {
        let service = service(&["Hello there."]).with_fallback_mode(FallbackMode::Strict);
        let err = service.generate_response("hi", 5).await.unwrap_err();
        assert!(matches!(err, EchoRagError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_strict_mode_empty_index_still_unknown() {
        let service = service(&[]).with_fallback_mode(FallbackMode::Strict);
        let reply = service.generate_response("hi", 5).await.unwrap();
        assert_eq!(reply, crate::config::DEFAULT_UNKNOWN_RESPONSE);
    }

    #[tokio::test]
    async fn test_ensure_initialized_runs_callback_once() {
        let service = service(&["a"]);
        let mut calls = 0;
        assert!(service.ensure_initialized_with(|| calls += 1).await.unwrap());
        assert!(!service.ensure_initialized_with(|| calls += 1).await.unwrap());
        assert_eq!(calls, 1);
        assert!(service.is_initialized());
    }

    #[tokio::test]
    async fn test_first_load_callback_runs_before_source_load() {
        let source = Arc::new(CountingSource {
            inner: StaticSource::new(vec![EmbeddedMessage::new("only", vec![1.0, 0.0])]),
            loads: AtomicUsize::new(0),
        });
        let service = ResponseService::new(
            Arc::new(ConstantEmbedder),
            source.clone(),
            LlmResponseGenerator::disabled(),
        );

        let mut loads_at_callback = None;
        let performed = service
            .ensure_initialized_with(|| loads_at_callback = Some(source.loads.load(Ordering::SeqCst)))
            .await
            .unwrap();

        assert!(performed);
        assert_eq!(loads_at_callback, Some(0));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_load_once() {
        let source = Arc::new(CountingSource {
            inner: StaticSource::new(vec![EmbeddedMessage::new("only", vec![1.0, 0.0])]),
            loads: AtomicUsize::new(0),
        });
        let service = Arc::new(ResponseService::new(
            Arc::new(ConstantEmbedder),
            source.clone(),
            LlmResponseGenerator::disabled(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.generate_response("q", 1).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "only");
        }
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_persona_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&["a"]).with_persona(PersonaSource::File(dir.path().join("p.json")));
        service.initialize().await.unwrap();
        let status = service.status();
        assert!(status.initialized);
        assert!(!status.persona_loaded);
        assert_eq!(status.indexed_messages, 1);
        assert!(!status.llm_configured);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_loudly() {
        let service = ResponseService::new(
            Arc::new(ConstantEmbedder),
            Arc::new(StaticSource::new(vec![EmbeddedMessage::new("x", vec![1.0])])),
            LlmResponseGenerator::disabled(),
        );
        let err = service.generate_response("q", 1).await.unwrap_err();
        assert!(matches!(err, EchoRagError::DimensionMismatch { .. }));
        assert!(!service.is_initialized());
    }
}
