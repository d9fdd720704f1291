mod chunker;
mod documents;
mod embedding;
mod extract;
mod ingest;
mod retriever;
mod vector_index;
mod worker;

pub use chunker::{ChunkSpan, TokenChunker};
pub use documents::{DocumentService, NewDocumentSource};
pub use embedding::{EmbeddingProvider, HttpEmbeddingClient};
pub use extract::{DefaultExtractor, SourceExtractor};
pub use ingest::{IngestPipeline, IngestReport};
pub use retriever::Retriever;
pub use vector_index::{
    QdrantIndex, ScanIndex, UNSCOPED_ASSISTANT, VectorIndex, VectorPoint, build_points,
    create_index, point_id,
};
pub use worker::IngestWorker;
