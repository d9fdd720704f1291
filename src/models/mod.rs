mod config;
mod document;
mod retrieval;

pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_URL,
    DEFAULT_QDRANT_URL, EmbeddingConfig, IndexDriver, IngestionConfig, RetrievalConfig,
    StoreConfig, VectorIndexConfig,
};
pub use document::{
    Chunk, DocumentSource, DocumentStatus, DocumentSummary, KnowledgeDocument, SourceKind,
};
pub use retrieval::{RetrievalQuery, ScopeFilter, ScoredHit};
