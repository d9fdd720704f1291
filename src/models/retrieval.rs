//! Retrieval queries, scope filters, and scored hits. Ephemeral, never
//! persisted.

use serde::{Deserialize, Serialize};

/// Mandatory scope predicates for every similarity search.
///
/// There is deliberately no way to search without both filters: a missing
/// assistant or workspace predicate would leak chunks across tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub assistant_id: String,
    pub workspace_id: String,
}

impl ScopeFilter {
    pub fn new(assistant_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            workspace_id: workspace_id.into(),
        }
    }
}

/// A retrieval request from the conversational agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub assistant_id: String,
    pub workspace_id: String,
    pub query_text: String,
    pub top_k: u64,
    pub score_threshold: f32,
}

impl RetrievalQuery {
    pub fn new(
        assistant_id: impl Into<String>,
        workspace_id: impl Into<String>,
        query_text: impl Into<String>,
    ) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            workspace_id: workspace_id.into(),
            query_text: query_text.into(),
            top_k: 5,
            score_threshold: 0.75,
        }
    }

    /// Set the maximum number of hits.
    #[must_use]
    pub fn with_top_k(mut self, top_k: u64) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum score the best hit must reach.
    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn scope(&self) -> ScopeFilter {
        ScopeFilter::new(self.assistant_id.clone(), self.workspace_id.clone())
    }
}

/// One similarity hit returned by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    /// Human-readable `document_id:chunk_index`.
    pub chunk_id: String,
    pub document_id: String,
    pub score: f32,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_overrides_defaults() {
        let query = RetrievalQuery::new("asst-a", "ws-1", "what is the refund policy?")
            .with_top_k(3)
            .with_score_threshold(0.9);

        assert_eq!(query.top_k, 3);
        assert!((query.score_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(query.scope(), ScopeFilter::new("asst-a", "ws-1"));
    }
}
