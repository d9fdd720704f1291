//! Document lifecycle service: upload, status reads, resync, deletion.
//!
//! This is the surface the HTTP layer calls; ingestion itself runs through
//! `IngestPipeline` once a job is enqueued for the created document.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::DocumentError;
use crate::models::{DocumentSource, DocumentSummary, KnowledgeDocument};
use crate::services::vector_index::VectorIndex;
use crate::store::{DocumentStore, ObjectStore, object_key};

/// Content for a new knowledge document; exactly one source per upload.
#[derive(Debug, Clone)]
pub enum NewDocumentSource {
    File { filename: String, bytes: Vec<u8> },
    Url { url: String },
    Text { text: String },
}

pub struct DocumentService {
    store: Arc<DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    index: Arc<dyn VectorIndex>,
}

impl DocumentService {
    pub fn new(
        store: Arc<DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            store,
            objects,
            index,
        }
    }

    /// Create a knowledge document in `processing` status with zero chunks.
    ///
    /// File bytes are persisted to the object store before the metadata row
    /// exists, so a row never points at a missing blob. The caller is
    /// responsible for enqueueing `ingest(document_id)` afterwards.
    pub async fn create(
        &self,
        workspace_id: Option<String>,
        name: &str,
        assigned_assistant_ids: Vec<String>,
        source: NewDocumentSource,
    ) -> Result<KnowledgeDocument, DocumentError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DocumentError::Validation("name is required".to_string()));
        }

        let (document_source, content_hash, file_size) = match source {
            NewDocumentSource::File { filename, bytes } => {
                if bytes.is_empty() {
                    return Err(DocumentError::Validation(
                        "uploaded file is empty".to_string(),
                    ));
                }
                let content_hash = hex::encode(Sha256::digest(&bytes));
                let key = object_key(workspace_id.as_deref(), &content_hash, &filename);
                let storage_uri = self.objects.put(&key, &bytes).await?;
                (
                    DocumentSource::File { storage_uri },
                    content_hash,
                    bytes.len() as u64,
                )
            }
            NewDocumentSource::Url { url } => {
                let url = url.trim().to_string();
                if url.is_empty() {
                    return Err(DocumentError::Validation(
                        "url is required for source_type=url".to_string(),
                    ));
                }
                let content_hash = hex::encode(Sha256::digest(url.as_bytes()));
                let file_size = url.len() as u64;
                (DocumentSource::Url { url }, content_hash, file_size)
            }
            NewDocumentSource::Text { text } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(DocumentError::Validation(
                        "text content is required for source_type=text".to_string(),
                    ));
                }
                let content_hash = hex::encode(Sha256::digest(trimmed.as_bytes()));
                let file_size = text.len() as u64;
                (DocumentSource::Text { raw_text: text }, content_hash, file_size)
            }
        };

        let document = KnowledgeDocument::new(
            workspace_id,
            name,
            document_source,
            content_hash,
            file_size,
            assigned_assistant_ids,
        );
        self.store.insert_document(&document).await?;

        info!(
            document_id = %document.id,
            workspace = document.workspace_id.as_deref().unwrap_or("global"),
            source = %document.source.kind(),
            "created knowledge document"
        );
        Ok(document)
    }

    /// Status/metadata for one document; no raw text.
    pub async fn get(
        &self,
        document_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<Option<DocumentSummary>, DocumentError> {
        let doc = self.store.get_document(document_id, workspace_id).await?;
        Ok(doc.as_ref().map(DocumentSummary::from))
    }

    /// Documents in a workspace, newest first.
    pub async fn list(
        &self,
        workspace_id: Option<&str>,
    ) -> Result<Vec<DocumentSummary>, DocumentError> {
        Ok(self.store.list_documents(workspace_id).await?)
    }

    /// Resync trigger: back to `processing`, chunk rows cleared. Returns
    /// false when the document does not exist in the workspace. The caller
    /// re-enqueues `ingest(document_id)`.
    pub async fn resync(
        &self,
        document_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<bool, DocumentError> {
        let updated = self
            .store
            .mark_processing_and_clear_chunks(document_id, workspace_id)
            .await?;
        if updated {
            info!(document_id, "resync requested for knowledge document");
        }
        Ok(updated)
    }

    /// Delete a document, its chunk rows, its vector points, and the backing
    /// blob for file sources.
    ///
    /// The unconditional vector delete also cleans up stray points left by an
    /// ingest that raced this deletion.
    pub async fn delete(
        &self,
        document_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<bool, DocumentError> {
        let Some(doc) = self.store.delete_document(document_id, workspace_id).await? else {
            return Ok(false);
        };

        self.index.delete_by_document(document_id).await?;

        if let DocumentSource::File { storage_uri } = &doc.source
            && let Err(e) = self.objects.delete(storage_uri).await
        {
            warn!(document_id, error = %e, "failed to delete backing blob");
        }

        info!(
            document_id,
            workspace = doc.workspace_id.as_deref().unwrap_or("global"),
            "deleted knowledge document"
        );
        Ok(true)
    }
}
