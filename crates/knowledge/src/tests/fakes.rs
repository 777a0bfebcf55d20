//! Hand-written collaborators for tests.

use crate::corpus::CorpusProvider;
use crate::embeddings::providers::trigram::TrigramProvider;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::ingest::IngestPipeline;
use crate::loader::FileLoader;
use crate::retriever::Retriever;
use crate::session::QaSession;
use crate::synthesizer::{AnswerSynthesizer, SynthesisOptions};
use crate::types::Document;
use aidoc_core::config::{EmptyRetrievalPolicy, PipelineSettings};
use aidoc_core::{AppError, AppResult};
use aidoc_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

pub(crate) const EMBEDDING_DIMENSIONS: usize = 64;

/// Language model returning canned output and recording every request.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    reply: String,
    chunks: Vec<String>,
    fail: bool,
    stream_error: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            chunks: vec![reply.to_string()],
            ..Default::default()
        }
    }

    pub(crate) fn streaming(chunks: &[&str]) -> Self {
        Self {
            reply: chunks.concat(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// End the stream with a transport error instead of a final chunk.
    pub(crate) fn with_stream_error(mut self) -> Self {
        self.stream_error = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn record(&self, request: &LlmRequest) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(AppError::Llm("scripted provider failure".to_string()));
        }
        Ok(())
    }

    fn chunk(&self, content: &str, model: &str, done: bool) -> LlmStreamChunk {
        LlmStreamChunk {
            content: content.to_string(),
            model: model.to_string(),
            done,
            usage: done.then(|| LlmUsage::new(1, 1)),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.record(request)?;
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.record(request)?;

        let mut items: Vec<AppResult<LlmStreamChunk>> = self
            .chunks
            .iter()
            .map(|c| Ok(self.chunk(c, &request.model, false)))
            .collect();
        if self.stream_error {
            items.push(Err(AppError::Llm("connection reset".to_string())));
        } else {
            items.push(Ok(self.chunk("", &request.model, true)));
        }
        // Anything after the end must never reach the caller
        items.push(Ok(self.chunk("AFTER-END", &request.model, false)));

        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Default corpus that counts loads and can be slow, gated or failing.
pub(crate) struct CountingCorpus {
    documents: Vec<Document>,
    delay: Duration,
    failures_left: AtomicUsize,
    loads: AtomicUsize,
    pub(crate) entered: Notify,
    gate: Option<Semaphore>,
}

impl CountingCorpus {
    pub(crate) fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            entered: Notify::new(),
            gate: None,
        }
    }

    /// Hold every load until [`CountingCorpus::open`] is called.
    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CorpusProvider for CountingCorpus {
    async fn default_documents(&self) -> AppResult<Vec<Document>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| AppError::Other(e.to_string()))?;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::Other("default corpus unavailable".to_string()));
        }

        Ok(self.documents.clone())
    }

    fn describe(&self) -> String {
        "counting test corpus".to_string()
    }
}

/// Trigram embeddings that can be switched to fail.
#[derive(Debug)]
pub(crate) struct SwitchableProvider {
    inner: TrigramProvider,
    fail: AtomicBool,
}

impl SwitchableProvider {
    pub(crate) fn new() -> Self {
        Self {
            inner: TrigramProvider::new(EMBEDDING_DIMENSIONS),
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for SwitchableProvider {
    fn provider_name(&self) -> &str {
        "switchable"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::EmbeddingService("quota exceeded".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

/// Trigram embeddings that block until released, announcing each entry.
#[derive(Debug)]
pub(crate) struct GatedProvider {
    inner: TrigramProvider,
    pub(crate) entered: Notify,
    release: Semaphore,
}

impl GatedProvider {
    pub(crate) fn new() -> Self {
        Self {
            inner: TrigramProvider::new(EMBEDDING_DIMENSIONS),
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// Let every current and future call through.
    pub(crate) fn open(&self) {
        self.release.add_permits(1);
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GatedProvider {
    fn provider_name(&self) -> &str {
        "gated"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.entered.notify_one();
        let _permit = self
            .release
            .acquire()
            .await
            .map_err(|e| AppError::EmbeddingService(e.to_string()))?;
        self.inner.embed_batch(texts).await
    }
}

/// A session over a file loader, the given collaborators and small chunks.
pub(crate) fn session(
    llm: Arc<ScriptedLlm>,
    corpus: Arc<dyn CorpusProvider>,
    provider: Arc<dyn EmbeddingProvider>,
) -> QaSession {
    session_with_policy(llm, corpus, provider, EmptyRetrievalPolicy::GeneralAnswer)
}

pub(crate) fn session_with_policy(
    llm: Arc<ScriptedLlm>,
    corpus: Arc<dyn CorpusProvider>,
    provider: Arc<dyn EmbeddingProvider>,
    policy: EmptyRetrievalPolicy,
) -> QaSession {
    let settings = PipelineSettings {
        chunk_size: 200,
        chunk_overlap: 40,
        top_k: 3,
        empty_retrieval: policy,
        ..Default::default()
    };

    let embedder = Embedder::new(provider, 8);
    let pipeline = IngestPipeline::new(Arc::new(FileLoader::new()), embedder.clone(), &settings);
    let retriever = Retriever::new(embedder, settings.top_k);
    let synthesizer = AnswerSynthesizer::new(
        llm,
        aidoc_prompt::medical_qa_default(),
        SynthesisOptions {
            model: "scripted-model".to_string(),
            temperature: 0.0,
            max_tokens: 256,
            max_context_chars: settings.max_context_chars,
            empty_retrieval: settings.empty_retrieval,
        },
    );

    QaSession::new(pipeline, retriever, synthesizer, corpus)
}

/// A small default corpus about common conditions.
pub(crate) fn reference_documents() -> Vec<Document> {
    vec![Document::new(
        "reference-manual.txt",
        vec![
            "Hypertension is persistently high blood pressure. Lifestyle changes such as \
             reducing salt and regular exercise lower blood pressure."
                .to_string(),
            "Type 2 diabetes is managed with diet, exercise and medications such as metformin."
                .to_string(),
        ],
    )]
}
