//! Ingestion pipeline: extract → normalize → chunk → embed → replace vectors
//! → replace chunk rows → mark ready.
//!
//! Every step is a hard failure point that transitions the document to
//! `failed` and aborts; the whole run is idempotent so the job queue can
//! retry transient failures from step one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::IngestError;
use crate::models::{Chunk, IngestionConfig, KnowledgeDocument};
use crate::services::chunker::TokenChunker;
use crate::services::embedding::EmbeddingProvider;
use crate::services::extract::SourceExtractor;
use crate::services::vector_index::{VectorIndex, build_points};
use crate::store::DocumentStore;
use crate::utils::text::{count_tokens, normalize_whitespace};

/// Per-document mutex registry: two ingestion runs for the same document
/// serialize, unrelated documents proceed concurrently.
#[derive(Default)]
struct DocumentLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DocumentLocks {
    async fn acquire(&self, document_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("document lock registry poisoned");
            map.entry(document_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Outcome of one successful ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub token_count: usize,
    pub elapsed_ms: u64,
}

/// Owns the document ingestion lifecycle.
pub struct IngestPipeline {
    store: Arc<DocumentStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn SourceExtractor>,
    config: IngestionConfig,
    locks: DocumentLocks,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<DocumentStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn SourceExtractor>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            extractor,
            config,
            locks: DocumentLocks::default(),
        }
    }

    /// Run the full pipeline for one document.
    ///
    /// On failure the document is marked `failed` with the error message and
    /// the error propagates, so the job queue can decide (via `Retryable`)
    /// whether to re-run.
    pub async fn ingest(&self, document_id: &str) -> Result<IngestReport, IngestError> {
        let _guard = self.locks.acquire(document_id).await;
        let started = Instant::now();

        match self.run(document_id).await {
            Ok((chunk_count, token_count)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!(
                    document_id,
                    chunks = chunk_count,
                    tokens = token_count,
                    elapsed_ms,
                    "knowledge ingest complete"
                );
                Ok(IngestReport {
                    document_id: document_id.to_string(),
                    chunk_count,
                    token_count,
                    elapsed_ms,
                })
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if !matches!(err, IngestError::DocumentNotFound(_)) {
                    if let Err(store_err) =
                        self.store.mark_failed(document_id, &err.to_string()).await
                    {
                        warn!(document_id, error = %store_err, "failed to record ingest failure");
                    }
                }
                error!(document_id, elapsed_ms, error = %err, "knowledge ingest failed");
                Err(err)
            }
        }
    }

    async fn run(&self, document_id: &str) -> Result<(usize, usize), IngestError> {
        let document = self
            .store
            .get_document(document_id, None)
            .await?
            .ok_or_else(|| IngestError::DocumentNotFound(document_id.to_string()))?;

        self.store.mark_processing(document_id).await?;

        let raw = self.extractor.extract(&document).await?;
        let content = normalize_whitespace(&raw);
        if content.is_empty() {
            return Err(IngestError::EmptyContent);
        }

        let total_tokens = count_tokens(&content);
        let chunker = TokenChunker::from_config(&self.config)?;
        let spans = chunker.chunk(&content);

        let texts: Vec<String> = spans.iter().map(|span| span.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != spans.len() {
            return Err(IngestError::EmbeddingCountMismatch {
                expected: spans.len(),
                actual: embeddings.len(),
            });
        }

        let chunks = build_chunks(&document, spans, embeddings);

        // Unconditional, even on first ingest: this is the only thing that
        // clears points under a since-removed assistant id.
        self.index.delete_by_document(document_id).await?;
        self.index.upsert(build_points(&document, &chunks)).await?;

        self.store.replace_chunks(document_id, &chunks).await?;
        self.store
            .mark_ready(document_id, total_tokens as u64, chunks.len() as u64)
            .await?;

        Ok((chunks.len(), total_tokens))
    }
}

fn build_chunks(
    document: &KnowledgeDocument,
    spans: Vec<crate::services::chunker::ChunkSpan>,
    embeddings: Vec<Vec<f32>>,
) -> Vec<Chunk> {
    spans
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (span, embedding))| {
            Chunk::from_document(
                document,
                index as u32,
                span.text,
                span.token_count as u32,
                embedding,
            )
        })
        .collect()
}
