//! Error types for the knowledge-base subsystem.
//!
//! Each service layer has its own error enum; the `Retryable` impls classify
//! which failures are transient (eligible for job-level retry) and which are
//! terminal (the document stays `failed` until a caller intervenes).

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // Server errors might be transient (e.g., 503 Service Unavailable)
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            // A malformed or short response is a provider contract violation
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector index operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector index: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Errors from the document/chunk metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(e) => {
                matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
            }
            StoreError::Serialization(_) | StoreError::DocumentNotFound(_) => false,
        }
    }
}

/// Errors from blob storage backing file-sourced documents.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object URI: {0}")]
    InvalidUri(String),
}

/// Errors while turning a document source into plain text.
///
/// Always terminal: an unreadable source does not fix itself on retry.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("source is missing or unreadable: {0}")]
    MissingSource(String),

    #[error("failed to fetch url: {0}")]
    Fetch(String),

    #[error("url fetch returned status {0}")]
    HttpStatus(u16),

    #[error("object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("pdf extraction failed: {0}")]
    Pdf(String),

    #[error("docx extraction failed: {0}")]
    Docx(String),
}

/// A chunking configuration whose window would not progress.
#[derive(Debug, Error)]
#[error("chunk overlap {overlap} must be smaller than window size {window_size}")]
pub struct ChunkingConfigError {
    pub window_size: usize,
    pub overlap: usize,
}

/// Errors raised by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("knowledge document not found: {0}")]
    DocumentNotFound(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("no extractable text found in source")]
    EmptyContent,

    #[error(transparent)]
    ChunkingConfig(#[from] ChunkingConfigError),

    #[error("embedding count mismatch: {expected} chunks, {actual} vectors")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Retryable for IngestError {
    fn is_retryable(&self) -> bool {
        match self {
            IngestError::Embedding(e) => e.is_retryable(),
            IngestError::VectorStore(e) => e.is_retryable(),
            IngestError::Store(e) => e.is_retryable(),
            // Extraction, empty content, chunking config, and count mismatch
            // are terminal: re-running the pipeline cannot change the outcome.
            IngestError::DocumentNotFound(_)
            | IngestError::Extraction(_)
            | IngestError::EmptyContent
            | IngestError::ChunkingConfig(_)
            | IngestError::EmbeddingCountMismatch { .. } => false,
        }
    }
}

/// Errors from the document service (upload/resync/delete surface).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
}

/// Internal retrieval failures.
///
/// Never escapes the retriever: every variant is logged and converted to an
/// empty context string.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
}

/// Errors related to configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Errors while assembling a `KnowledgeBase` from configuration.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_timeout_is_retryable() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::ConnectionError("refused".into()).is_retryable());
        assert!(!EmbeddingError::InvalidResponse("short".into()).is_retryable());
    }

    #[test]
    fn vector_store_connection_is_retryable() {
        assert!(VectorStoreError::ConnectionError("down".into()).is_retryable());
        assert!(VectorStoreError::SearchError("request timeout".into()).is_retryable());
        assert!(!VectorStoreError::SearchError("bad filter".into()).is_retryable());
    }

    #[test]
    fn terminal_ingest_errors_never_retry() {
        assert!(!IngestError::EmptyContent.is_retryable());
        assert!(
            !IngestError::EmbeddingCountMismatch {
                expected: 3,
                actual: 2
            }
            .is_retryable()
        );
        assert!(!IngestError::DocumentNotFound("x".into()).is_retryable());
        assert!(IngestError::Embedding(EmbeddingError::Timeout).is_retryable());
    }
}
