//! Process-level assembly of the knowledge base.
//!
//! All collaborators are constructed explicitly and injected; nothing hides
//! in module-level singletons. `ensure_ready` is the idempotent warmup for
//! the vector collection.

use std::sync::Arc;

use crate::error::InitError;
use crate::models::Config;
use crate::services::{
    DefaultExtractor, DocumentService, EmbeddingProvider, HttpEmbeddingClient, IngestPipeline,
    IngestWorker, Retriever, VectorIndex, create_index,
};
use crate::store::{DocumentStore, FsObjectStore, ObjectStore};

/// One fully wired knowledge-base subsystem.
pub struct KnowledgeBase {
    pub documents: DocumentService,
    pub worker: IngestWorker,
    pub retriever: Retriever,
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeBase {
    /// Build every component from configuration.
    pub async fn connect(config: &Config) -> Result<Self, InitError> {
        let store = Arc::new(DocumentStore::connect(&config.store).await?);
        let objects: Arc<dyn ObjectStore> =
            Arc::new(FsObjectStore::new(config.store.objects_dir.clone()));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(HttpEmbeddingClient::new(&config.embedding)?);
        let index = create_index(
            &config.vector_index,
            config.embedding.dimension,
            store.clone(),
        )?;
        let extractor = Arc::new(DefaultExtractor::new(&config.ingestion, objects.clone())?);

        let pipeline = Arc::new(IngestPipeline::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            extractor,
            config.ingestion.clone(),
        ));

        Ok(Self {
            documents: DocumentService::new(store, objects, index.clone()),
            worker: IngestWorker::new(pipeline),
            retriever: Retriever::new(embedder, index.clone(), config.retrieval.clone()),
            index,
        })
    }

    /// Idempotent warmup: create the vector collection if it is missing.
    pub async fn ensure_ready(&self) -> Result<(), InitError> {
        self.index.ensure_ready().await?;
        Ok(())
    }
}
