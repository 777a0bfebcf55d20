//! Question-answering session.
//!
//! A [`QaSession`] owns two index slots. The uploaded slot holds the index
//! built from the latest upload and is replaced wholesale by each new
//! upload. The fallback slot is built from the default corpus the first
//! time a question arrives with nothing uploaded, at most once per process.
//! Every question is answered from the uploaded index when one exists.

use crate::corpus::{CorpusProvider, DirectoryCorpus};
use crate::embeddings::{create_provider, Embedder};
use crate::ingest::IngestPipeline;
use crate::loader::{DocumentLoader, FileLoader};
use crate::retriever::Retriever;
use crate::synthesizer::{AnswerStream, AnswerSynthesizer, SynthesisOptions};
use crate::types::{Answer, IndexSlot, SessionState, UploadSummary};
use crate::vector_index::VectorIndex;
use aidoc_core::{AppConfig, AppError, AppResult};
use aidoc_llm::create_client;
use aidoc_prompt::load_or_default;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OnceCell};

/// Shared session state machine. Safe to use from many tasks at once.
pub struct QaSession {
    pipeline: IngestPipeline,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    corpus: Arc<dyn CorpusProvider>,

    active: RwLock<Option<Arc<VectorIndex>>>,
    fallback: OnceCell<Arc<VectorIndex>>,
    fallback_building: AtomicBool,

    /// Held for the whole of an upload; the only lock held across I/O
    upload_lock: Mutex<()>,
}

impl QaSession {
    pub fn new(
        pipeline: IngestPipeline,
        retriever: Retriever,
        synthesizer: AnswerSynthesizer,
        corpus: Arc<dyn CorpusProvider>,
    ) -> Self {
        Self {
            pipeline,
            retriever,
            synthesizer,
            corpus,
            active: RwLock::new(None),
            fallback: OnceCell::new(),
            fallback_building: AtomicBool::new(false),
            upload_lock: Mutex::new(()),
        }
    }

    /// Wire the default collaborators from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let loader: Arc<dyn DocumentLoader> = Arc::new(FileLoader::new());
        let embedder = Embedder::new(
            create_provider(&config.embedding)?,
            config.embedding.batch_size,
        );

        let api_key = config.resolve_api_key();
        let client = create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            api_key.as_deref(),
        )?;
        let prompt = load_or_default(config.pipeline.prompt_file.as_deref())?;

        let pipeline = IngestPipeline::new(Arc::clone(&loader), embedder.clone(), &config.pipeline);
        let retriever = Retriever::new(embedder, config.pipeline.top_k);
        let synthesizer = AnswerSynthesizer::new(
            client,
            prompt,
            SynthesisOptions::from_settings(&config.llm, &config.pipeline),
        );
        let corpus = Arc::new(DirectoryCorpus::new(config.default_corpus_dir(), loader));

        tracing::debug!(
            "Session configured: llm={}/{}, embedding={}, corpus={}",
            config.llm.provider,
            config.llm.model,
            config.embedding.provider,
            corpus.describe()
        );

        Ok(Self::new(pipeline, retriever, synthesizer, corpus))
    }

    /// Build an index from `paths` and make it the active index.
    ///
    /// Concurrent uploads are serialized: a second caller waits for the
    /// first to finish and then replaces its result. On failure the
    /// session is left exactly as it was.
    pub async fn upload(&self, paths: Vec<PathBuf>) -> AppResult<UploadSummary> {
        check_paths(&paths)?;
        let _guard = self.upload_lock.lock().await;
        self.ingest_and_install(paths).await
    }

    /// Like [`upload`](Self::upload), but returns `Busy` instead of waiting
    /// when another upload is in flight.
    pub async fn try_upload(&self, paths: Vec<PathBuf>) -> AppResult<UploadSummary> {
        check_paths(&paths)?;
        let _guard = self
            .upload_lock
            .try_lock()
            .map_err(|_| AppError::Busy("an upload is already in progress".to_string()))?;
        self.ingest_and_install(paths).await
    }

    async fn ingest_and_install(&self, paths: Vec<PathBuf>) -> AppResult<UploadSummary> {
        tracing::info!("Uploading {} files", paths.len());

        let documents = self.pipeline.load_files(paths).await?;
        let index = self.pipeline.build_index(&documents).await?;

        let summary = UploadSummary {
            files: documents.into_iter().map(|d| d.id).collect(),
            passage_count: index.len(),
            index_id: index.id(),
            indexed_at: Utc::now(),
        };

        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(index));

        if let Some(previous) = previous {
            tracing::debug!("Replaced index {}", previous.id());
        }
        tracing::info!(
            "Upload complete: {} files, {} passages (index {})",
            summary.files.len(),
            summary.passage_count,
            summary.index_id
        );

        Ok(summary)
    }

    /// Answer a question.
    pub async fn ask(&self, question: &str) -> AppResult<Answer> {
        let question = check_question(question)?;
        let (index, slot) = self.resolve_index().await?;

        let passages = self.retriever.retrieve(question, &index).await?;
        let text = self.synthesizer.synthesize(question, &passages).await?;

        tracing::info!(
            "Answered from {} index using {} passages",
            slot.as_str(),
            passages.len()
        );

        Ok(Answer { text, source: slot })
    }

    /// Answer a question as a stream of text increments.
    ///
    /// Retrieval completes before this returns; the stream only carries
    /// synthesis. Dropping it abandons the model call.
    pub async fn ask_streaming(&self, question: &str) -> AppResult<AnswerStream> {
        let question = check_question(question)?;
        let (index, slot) = self.resolve_index().await?;

        let passages = self.retriever.retrieve(question, &index).await?;
        tracing::info!(
            "Streaming answer from {} index using {} passages",
            slot.as_str(),
            passages.len()
        );

        self.synthesizer.synthesize_stream(question, &passages).await
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        if self.active_index().is_some() {
            SessionState::ActiveReady
        } else if self.fallback.initialized() {
            SessionState::FallbackReady
        } else if self.fallback_building.load(Ordering::SeqCst) {
            SessionState::FallbackBuilding
        } else {
            SessionState::NoIndex
        }
    }

    /// Whether an uploaded index is installed.
    pub fn has_active_index(&self) -> bool {
        self.state() == SessionState::ActiveReady
    }

    fn active_index(&self) -> Option<Arc<VectorIndex>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn resolve_index(&self) -> AppResult<(Arc<VectorIndex>, IndexSlot)> {
        if let Some(index) = self.active_index() {
            return Ok((index, IndexSlot::Uploaded));
        }

        let index = self
            .fallback
            .get_or_try_init(|| self.build_fallback())
            .await?;

        Ok((Arc::clone(index), IndexSlot::Fallback))
    }

    /// Runs inside the once-cell initializer, so at most one runs at a time
    /// and a success is never repeated.
    async fn build_fallback(&self) -> AppResult<Arc<VectorIndex>> {
        let _building = BuildingFlag::raise(&self.fallback_building);

        tracing::info!("Building fallback index from {}", self.corpus.describe());

        let documents = self.corpus.default_documents().await?;
        let index = self.pipeline.build_index(&documents).await.map_err(|e| {
            tracing::warn!("Fallback index build failed: {}", e);
            e
        })?;

        Ok(Arc::new(index))
    }
}

/// Marks a fallback build in progress; cleared on drop, including cancellation.
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn check_paths(paths: &[PathBuf]) -> AppResult<()> {
    if paths.is_empty() {
        return Err(AppError::EmptyInput("no files selected".to_string()));
    }
    Ok(())
}

fn check_question(question: &str) -> AppResult<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyInput("question is empty".to_string()));
    }
    Ok(trimmed)
}
