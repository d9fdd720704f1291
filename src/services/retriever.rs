//! Scoped knowledge retrieval for the conversational agent.
//!
//! Returns either a formatted context block or an empty string. Failures are
//! logged and swallowed: a degraded retrieval must never break the call flow.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::RetrievalError;
use crate::models::{RetrievalConfig, RetrievalQuery, ScopeFilter};
use crate::services::embedding::EmbeddingProvider;
use crate::services::vector_index::VectorIndex;

const CONTEXT_HEADER: &str = "Relevant Knowledge:";

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Retrieve knowledge context with the configured `top_k` and threshold.
    pub async fn retrieve(&self, assistant_id: &str, workspace_id: &str, query_text: &str) -> String {
        let query = RetrievalQuery::new(assistant_id, workspace_id, query_text)
            .with_top_k(self.config.top_k)
            .with_score_threshold(self.config.score_threshold);
        self.retrieve_query(&query).await
    }

    /// Retrieve knowledge context for an explicit query.
    ///
    /// Exactly one telemetry line is emitted per call, hit or miss or error,
    /// so operators can measure RAG effectiveness independent of outcome.
    pub async fn retrieve_query(&self, query: &RetrievalQuery) -> String {
        let started = Instant::now();

        // Missing scope or a blank query is "no context available", decided
        // before any collaborator is touched.
        if query.assistant_id.trim().is_empty()
            || query.workspace_id.trim().is_empty()
            || query.query_text.trim().is_empty()
        {
            log_outcome(started, 0.0, false);
            return String::new();
        }

        match self.search(query).await {
            Ok((context, top_score)) => {
                log_outcome(started, top_score, !context.is_empty());
                context
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                warn!(
                    retrieval_time_ms = elapsed_ms,
                    top_score = 0.0,
                    rag_applied = false,
                    error = %err,
                    "knowledge retrieval failed"
                );
                String::new()
            }
        }
    }

    async fn search(&self, query: &RetrievalQuery) -> Result<(String, f32), RetrievalError> {
        let query_vector = self.embedder.embed_query(query.query_text.trim()).await?;

        let filter = ScopeFilter::new(query.assistant_id.clone(), query.workspace_id.clone());
        let hits = self
            .index
            .search_filtered(query_vector, &filter, query.top_k)
            .await?;

        let Some(best) = hits.first() else {
            return Ok((String::new(), 0.0));
        };

        let top_score = best.score;
        if top_score < query.score_threshold {
            return Ok((String::new(), top_score));
        }

        // hits arrive best-first from the index; keep that order
        let lines: Vec<String> = hits
            .iter()
            .filter(|hit| !hit.text.trim().is_empty())
            .enumerate()
            .map(|(idx, hit)| format!("{}. {}", idx + 1, hit.text.trim()))
            .collect();

        if lines.is_empty() {
            return Ok((String::new(), top_score));
        }

        Ok((format!("{}\n{}", CONTEXT_HEADER, lines.join("\n")), top_score))
    }
}

fn log_outcome(started: Instant, top_score: f32, applied: bool) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(
        retrieval_time_ms = elapsed_ms,
        top_score,
        rag_applied = applied,
        "knowledge retrieval"
    );
}
