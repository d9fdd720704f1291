pub mod error;
pub mod kb;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod utils;

pub use error::{
    ChunkingConfigError, ConfigError, DocumentError, EmbeddingError, ExtractionError, IngestError,
    InitError, ObjectStoreError, RetrievalError, StoreError, VectorStoreError,
};
pub use kb::KnowledgeBase;
pub use models::{
    Chunk, Config, DocumentSource, DocumentStatus, DocumentSummary, KnowledgeDocument,
    RetrievalQuery, ScopeFilter, ScoredHit, SourceKind,
};
pub use services::{
    DocumentService, EmbeddingProvider, IngestPipeline, IngestWorker, NewDocumentSource, Retriever,
    VectorIndex,
};
pub use store::{DocumentStore, FsObjectStore, ObjectStore};
