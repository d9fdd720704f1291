//! Vector index abstraction layer.
//!
//! One `VectorIndex` trait over two backends: an external Qdrant collection
//! and a brute-force cosine scan over the metadata store's chunk rows. Point
//! identity is deterministic so re-ingesting an unchanged document overwrites
//! its points instead of orphaning duplicates.

mod qdrant;
mod scan;

pub use qdrant::QdrantIndex;
pub use scan::ScanIndex;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::VectorStoreError;
use crate::models::{
    Chunk, IndexDriver, KnowledgeDocument, ScopeFilter, ScoredHit, VectorIndexConfig,
};
use crate::store::DocumentStore;

/// Sentinel assistant id for documents with no assigned assistants, keeping
/// their points addressable within the workspace scope.
pub const UNSCOPED_ASSISTANT: &str = "";

/// One embedded chunk under one assistant scope, as stored in the index.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub document_id: String,
    pub assistant_id: String,
    pub workspace_id: String,
    /// Human-readable `document_id:chunk_index`.
    pub chunk_id: String,
    pub text: String,
}

/// Deterministic point identity for `(document, assistant, chunk_index)`.
///
/// Stable across resyncs: the same triple always hashes to the same UUID, so
/// upserts overwrite cleanly.
pub fn point_id(document_id: &str, assistant_id: &str, chunk_index: u32) -> Uuid {
    let name = format!("{}:{}:{}", document_id, assistant_id, chunk_index);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Fan chunks out to one point per (chunk, assigned assistant), or a single
/// sentinel-scoped point per chunk when the document is unscoped.
pub fn build_points(document: &KnowledgeDocument, chunks: &[Chunk]) -> Vec<VectorPoint> {
    let assistant_ids: Vec<&str> = if document.assigned_assistant_ids.is_empty() {
        vec![UNSCOPED_ASSISTANT]
    } else {
        document
            .assigned_assistant_ids
            .iter()
            .map(String::as_str)
            .collect()
    };

    let workspace_id = document.workspace_id.clone().unwrap_or_default();

    chunks
        .iter()
        .flat_map(|chunk| {
            let workspace_id = workspace_id.clone();
            assistant_ids.iter().map(move |assistant_id| VectorPoint {
                id: point_id(&chunk.document_id, assistant_id, chunk.chunk_index),
                vector: chunk.embedding.clone(),
                document_id: chunk.document_id.clone(),
                assistant_id: (*assistant_id).to_string(),
                workspace_id: workspace_id.clone(),
                chunk_id: format!("{}:{}", chunk.document_id, chunk.chunk_index),
                text: chunk.chunk_text.clone(),
            })
        })
        .collect()
}

/// Abstract interface over the similarity index.
///
/// Every search carries both scope predicates; there is no unfiltered path.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Idempotent lazy initialization: create the fixed-dimension cosine
    /// collection only if it does not already exist. Safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), VectorStoreError>;

    /// Remove every point whose payload `document_id` matches, regardless of
    /// assistant scope. Deleting a document with no points is a no-op.
    async fn delete_by_document(&self, document_id: &str) -> Result<(), VectorStoreError>;

    /// Insert or overwrite points by their deterministic ids. No-op on empty
    /// input.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), VectorStoreError>;

    /// Scope-filtered similarity search, best score first.
    async fn search_filtered(
        &self,
        query_vector: Vec<f32>,
        filter: &ScopeFilter,
        top_k: u64,
    ) -> Result<Vec<ScoredHit>, VectorStoreError>;
}

/// Create a vector index backend based on configuration.
pub fn create_index(
    config: &VectorIndexConfig,
    dimension: u64,
    store: Arc<DocumentStore>,
) -> Result<Arc<dyn VectorIndex>, VectorStoreError> {
    match config.driver {
        IndexDriver::Qdrant => Ok(Arc::new(QdrantIndex::new(config, dimension)?)),
        IndexDriver::Scan => Ok(Arc::new(ScanIndex::new(store))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentSource;

    fn document_with_assistants(assistants: Vec<&str>) -> KnowledgeDocument {
        KnowledgeDocument::new(
            Some("ws-1".to_string()),
            "doc",
            DocumentSource::Text {
                raw_text: "text".to_string(),
            },
            "hash".to_string(),
            4,
            assistants.into_iter().map(str::to_string).collect(),
        )
    }

    fn chunks_for(doc: &KnowledgeDocument, n: u32) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk::from_document(doc, i, format!("c{}", i), 1, vec![1.0, 0.0]))
            .collect()
    }

    #[test]
    fn point_id_is_deterministic() {
        let a = point_id("doc-1", "asst-a", 0);
        assert_eq!(a, point_id("doc-1", "asst-a", 0));
        assert_ne!(a, point_id("doc-1", "asst-a", 1));
        assert_ne!(a, point_id("doc-1", "asst-b", 0));
        assert_ne!(a, point_id("doc-2", "asst-a", 0));
    }

    #[test]
    fn one_point_per_chunk_per_assistant() {
        let doc = document_with_assistants(vec!["asst-a", "asst-b"]);
        let points = build_points(&doc, &chunks_for(&doc, 3));
        assert_eq!(points.len(), 6);

        let ids: std::collections::HashSet<Uuid> = points.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 6);
        assert!(points.iter().all(|p| p.workspace_id == "ws-1"));
        assert!(points.iter().any(|p| p.assistant_id == "asst-b"));
        assert_eq!(points[0].chunk_id, format!("{}:0", doc.id));
    }

    #[test]
    fn unscoped_document_gets_sentinel_points() {
        let doc = document_with_assistants(vec![]);
        let points = build_points(&doc, &chunks_for(&doc, 2));
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.assistant_id == UNSCOPED_ASSISTANT));
    }

    #[test]
    fn rebuilding_points_yields_identical_ids() {
        let doc = document_with_assistants(vec!["asst-a"]);
        let chunks = chunks_for(&doc, 4);
        let first: Vec<Uuid> = build_points(&doc, &chunks).iter().map(|p| p.id).collect();
        let second: Vec<Uuid> = build_points(&doc, &chunks).iter().map(|p| p.id).collect();
        assert_eq!(first, second);
    }
}
