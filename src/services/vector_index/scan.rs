//! Brute-force cosine scan over chunk rows in the metadata store.
//!
//! Dependency-free fallback for deployments without a Qdrant server, and the
//! testing double for everything above the `VectorIndex` seam. The chunk rows
//! written by the ingestion pipeline are its backing storage, so `upsert` has
//! nothing extra to persist.

use std::sync::Arc;

use async_trait::async_trait;

use super::{UNSCOPED_ASSISTANT, VectorIndex, VectorPoint};
use crate::error::VectorStoreError;
use crate::models::{Chunk, ScopeFilter, ScoredHit};
use crate::store::DocumentStore;

/// Cosine similarity between two embedding vectors; 0.0 on dimension
/// mismatch or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// In-metadata-store similarity scan.
pub struct ScanIndex {
    store: Arc<DocumentStore>,
}

impl ScanIndex {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    fn chunk_in_scope(chunk: &Chunk, filter: &ScopeFilter) -> bool {
        if chunk.assistant_ids.is_empty() {
            // unscoped chunks carry the sentinel assistant identity
            filter.assistant_id == UNSCOPED_ASSISTANT
        } else {
            chunk.assistant_ids.iter().any(|id| id == &filter.assistant_id)
        }
    }
}

#[async_trait]
impl VectorIndex for ScanIndex {
    async fn ensure_ready(&self) -> Result<(), VectorStoreError> {
        // the metadata store migrates its tables at connect time
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<(), VectorStoreError> {
        self.store
            .delete_chunks(document_id)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;
        Ok(())
    }

    async fn upsert(&self, _points: Vec<VectorPoint>) -> Result<(), VectorStoreError> {
        // points materialize when the pipeline writes the chunk rows
        Ok(())
    }

    async fn search_filtered(
        &self,
        query_vector: Vec<f32>,
        filter: &ScopeFilter,
        top_k: u64,
    ) -> Result<Vec<ScoredHit>, VectorStoreError> {
        let chunks = self
            .store
            .chunks_for_workspace(&filter.workspace_id)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let mut scored: Vec<ScoredHit> = chunks
            .into_iter()
            .filter(|chunk| Self::chunk_in_scope(chunk, filter))
            .map(|chunk| ScoredHit {
                chunk_id: format!("{}:{}", chunk.document_id, chunk.chunk_index),
                document_id: chunk.document_id.clone(),
                score: cosine_similarity(&query_vector, &chunk.embedding),
                text: chunk.chunk_text,
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k as usize);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentSource, KnowledgeDocument};

    fn document(workspace: Option<&str>, assistants: Vec<&str>) -> KnowledgeDocument {
        KnowledgeDocument::new(
            workspace.map(str::to_string),
            "doc",
            DocumentSource::Text {
                raw_text: "text".to_string(),
            },
            "hash".to_string(),
            4,
            assistants.into_iter().map(str::to_string).collect(),
        )
    }

    fn chunk(doc: &KnowledgeDocument, index: u32, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::from_document(doc, index, text.to_string(), 1, embedding)
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn search_filters_by_assistant_and_workspace() {
        let store = Arc::new(DocumentStore::in_memory().await.unwrap());
        let index = ScanIndex::new(store.clone());

        let doc_a = document(Some("ws-1"), vec!["asst-a"]);
        let doc_b = document(Some("ws-1"), vec!["asst-b"]);
        let doc_other_ws = document(Some("ws-2"), vec!["asst-a"]);

        for doc in [&doc_a, &doc_b, &doc_other_ws] {
            store.insert_document(doc).await.unwrap();
            store
                .replace_chunks(&doc.id, &[chunk(doc, 0, "payload", vec![1.0, 0.0])])
                .await
                .unwrap();
        }

        let hits = index
            .search_filtered(vec![1.0, 0.0], &ScopeFilter::new("asst-a", "ws-1"), 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, doc_a.id);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unscoped_chunks_only_match_sentinel() {
        let store = Arc::new(DocumentStore::in_memory().await.unwrap());
        let index = ScanIndex::new(store.clone());

        let doc = document(Some("ws-1"), vec![]);
        store.insert_document(&doc).await.unwrap();
        store
            .replace_chunks(&doc.id, &[chunk(&doc, 0, "global", vec![1.0, 0.0])])
            .await
            .unwrap();

        let scoped = index
            .search_filtered(vec![1.0, 0.0], &ScopeFilter::new("asst-a", "ws-1"), 10)
            .await
            .unwrap();
        assert!(scoped.is_empty());

        let sentinel = index
            .search_filtered(
                vec![1.0, 0.0],
                &ScopeFilter::new(UNSCOPED_ASSISTANT, "ws-1"),
                10,
            )
            .await
            .unwrap();
        assert_eq!(sentinel.len(), 1);
    }

    #[tokio::test]
    async fn results_are_ranked_and_truncated() {
        let store = Arc::new(DocumentStore::in_memory().await.unwrap());
        let index = ScanIndex::new(store.clone());

        let doc = document(Some("ws-1"), vec!["asst-a"]);
        store.insert_document(&doc).await.unwrap();
        store
            .replace_chunks(
                &doc.id,
                &[
                    chunk(&doc, 0, "orthogonal", vec![0.0, 1.0]),
                    chunk(&doc, 1, "exact", vec![1.0, 0.0]),
                    chunk(&doc, 2, "diagonal", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .search_filtered(vec![1.0, 0.0], &ScopeFilter::new("asst-a", "ws-1"), 2)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "exact");
        assert_eq!(hits[1].text, "diagonal");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn delete_by_document_is_idempotent() {
        let store = Arc::new(DocumentStore::in_memory().await.unwrap());
        let index = ScanIndex::new(store.clone());

        let doc = document(Some("ws-1"), vec!["asst-a"]);
        store.insert_document(&doc).await.unwrap();
        store
            .replace_chunks(&doc.id, &[chunk(&doc, 0, "text", vec![1.0, 0.0])])
            .await
            .unwrap();

        index.delete_by_document(&doc.id).await.unwrap();
        let hits = index
            .search_filtered(vec![1.0, 0.0], &ScopeFilter::new("asst-a", "ws-1"), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());

        // repeated delete of a document with no points is a no-op
        index.delete_by_document(&doc.id).await.unwrap();
        index.delete_by_document("never-existed").await.unwrap();
    }
}
