//! Qdrant vector index backend.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use tokio::sync::OnceCell;

use super::{VectorIndex, VectorPoint};
use crate::error::VectorStoreError;
use crate::models::{ScopeFilter, ScoredHit, VectorIndexConfig};

/// Qdrant-backed similarity index over one cosine-distance collection.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: u64,
    ready: OnceCell<()>,
}

impl QdrantIndex {
    /// Create a new Qdrant index gateway. Connection and collection setup are
    /// deferred to the first operation.
    pub fn new(config: &VectorIndexConfig, dimension: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension,
            ready: OnceCell::new(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(false)
                } else {
                    Err(VectorStoreError::CollectionError(msg))
                }
            }
        }
    }

    async fn create_collection_if_missing(&self) -> Result<(), VectorStoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.dimension, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    fn scope_conditions(filter: &ScopeFilter) -> Vec<Condition> {
        // Both predicates are always present; dropping either would leak
        // chunks across assistants or workspaces.
        vec![
            Condition::matches("assistant_id", filter.assistant_id.clone()),
            Condition::matches("workspace_id", filter.workspace_id.clone()),
        ]
    }
}

fn payload_str(payload: &HashMap<String, qdrant_client::qdrant::Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.as_str()),
            _ => None,
        })
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_ready(&self) -> Result<(), VectorStoreError> {
        self.ready
            .get_or_try_init(|| self.create_collection_if_missing())
            .await?;
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<(), VectorStoreError> {
        self.ensure_ready().await?;

        let filter = Filter::must([Condition::matches("document_id", document_id.to_string())]);
        let delete = DeletePointsBuilder::new(&self.collection)
            .points(filter)
            .wait(true);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        self.ensure_ready().await?;

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("document_id".to_string(), point.document_id.into());
                payload.insert("assistant_id".to_string(), point.assistant_id.into());
                payload.insert("workspace_id".to_string(), point.workspace_id.into());
                payload.insert("chunk_id".to_string(), point.chunk_id.into());
                payload.insert("text".to_string(), point.text.into());

                PointStruct::new(point.id.to_string(), point.vector, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search_filtered(
        &self,
        query_vector: Vec<f32>,
        filter: &ScopeFilter,
        top_k: u64,
    ) -> Result<Vec<ScoredHit>, VectorStoreError> {
        self.ensure_ready().await?;

        let search = SearchPointsBuilder::new(&self.collection, query_vector, top_k)
            .filter(Filter::must(Self::scope_conditions(filter)))
            .with_payload(true);

        let results = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let hits = results
            .result
            .into_iter()
            .map(|point| ScoredHit {
                chunk_id: payload_str(&point.payload, "chunk_id"),
                document_id: payload_str(&point.payload, "document_id"),
                score: point.score,
                text: payload_str(&point.payload, "text"),
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let config = VectorIndexConfig::default();
        let index = QdrantIndex::new(&config, 384);
        assert!(index.is_ok());
        assert_eq!(index.unwrap().collection(), "knowledge_base");
    }
}
