//! Knowledge document and chunk models.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Uploaded file persisted in object storage
    File,
    /// Remote page fetched at ingestion time
    Url,
    /// Raw text submitted inline
    Text,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::Url => write!(f, "url"),
            SourceKind::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SourceKind::File),
            "url" => Ok(SourceKind::Url),
            "text" => Ok(SourceKind::Text),
            other => Err(format!("unknown source kind: {}", other)),
        }
    }
}

impl Serialize for SourceKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SourceKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where a document's content comes from.
///
/// Validated once at the upload boundary; downstream code matches on the
/// variant instead of re-checking locator fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum DocumentSource {
    File { storage_uri: String },
    Url { url: String },
    Text { raw_text: String },
}

impl DocumentSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            DocumentSource::File { .. } => SourceKind::File,
            DocumentSource::Url { .. } => SourceKind::Url,
            DocumentSource::Text { .. } => SourceKind::Text,
        }
    }

    /// The storage URI, URL, or raw text backing this source.
    pub fn locator(&self) -> &str {
        match self {
            DocumentSource::File { storage_uri } => storage_uri,
            DocumentSource::Url { url } => url,
            DocumentSource::Text { raw_text } => raw_text,
        }
    }
}

/// Document lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentStatus {
    #[default]
    Processing,
    Ready,
    Failed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Ready => write!(f, "ready"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

impl Serialize for DocumentStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DocumentStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Metadata for one knowledge source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub workspace_id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub source: DocumentSource,
    /// sha256 of the raw source bytes/text; kept for audit, not dedup.
    pub content_hash: String,
    pub file_size: u64,
    /// Empty set means unscoped (global within the workspace).
    pub assigned_assistant_ids: Vec<String>,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub token_count: u64,
    pub chunk_count: u64,
    pub created_at: String,
    pub last_synced_at: Option<String>,
}

impl KnowledgeDocument {
    pub fn new(
        workspace_id: Option<String>,
        name: impl Into<String>,
        source: DocumentSource,
        content_hash: String,
        file_size: u64,
        assigned_assistant_ids: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id,
            name: name.into(),
            source,
            content_hash,
            file_size,
            assigned_assistant_ids,
            status: DocumentStatus::Processing,
            error_message: None,
            token_count: 0,
            chunk_count: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_synced_at: None,
        }
    }
}

/// Status/metadata view of a document, safe to expose to API callers: no raw
/// text, no storage internals beyond the source kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub workspace_id: Option<String>,
    pub name: String,
    pub source_type: SourceKind,
    pub content_hash: String,
    pub file_size: u64,
    pub assigned_assistant_ids: Vec<String>,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub token_count: u64,
    pub chunk_count: u64,
    pub created_at: String,
    pub last_synced_at: Option<String>,
}

impl From<&KnowledgeDocument> for DocumentSummary {
    fn from(doc: &KnowledgeDocument) -> Self {
        Self {
            id: doc.id.clone(),
            workspace_id: doc.workspace_id.clone(),
            name: doc.name.clone(),
            source_type: doc.source.kind(),
            content_hash: doc.content_hash.clone(),
            file_size: doc.file_size,
            assigned_assistant_ids: doc.assigned_assistant_ids.clone(),
            status: doc.status,
            error_message: doc.error_message.clone(),
            token_count: doc.token_count,
            chunk_count: doc.chunk_count,
            created_at: doc.created_at.clone(),
            last_synced_at: doc.last_synced_at.clone(),
        }
    }
}

/// One embedded chunk, exclusively owned by its document and regenerated on
/// every resync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub workspace_id: Option<String>,
    /// Copy of the owning document's scope at ingestion time.
    pub assistant_ids: Vec<String>,
    pub chunk_index: u32,
    pub chunk_text: String,
    pub token_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Deterministic chunk row identity: the same document and index always
    /// map to the same id, so a resync overwrites instead of duplicating.
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &KnowledgeDocument,
        chunk_index: u32,
        chunk_text: String,
        token_count: u32,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Self::generate_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            document_name: document.name.clone(),
            workspace_id: document.workspace_id.clone(),
            assistant_ids: document.assigned_assistant_ids.clone(),
            chunk_index,
            chunk_text,
            token_count,
            embedding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_document() -> KnowledgeDocument {
        KnowledgeDocument::new(
            Some("ws-1".to_string()),
            "Refund policy",
            DocumentSource::Text {
                raw_text: "All refunds within 30 days.".to_string(),
            },
            "hash".to_string(),
            27,
            vec!["asst-a".to_string()],
        )
    }

    #[test]
    fn new_document_starts_processing() {
        let doc = test_document();
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert_eq!(doc.chunk_count, 0);
        assert!(doc.error_message.is_none());
        assert!(doc.last_synced_at.is_none());
        assert!(!doc.id.is_empty());
    }

    #[test]
    fn chunk_id_is_deterministic() {
        let id = Chunk::generate_id("doc-1", 5);
        assert_eq!(id, Chunk::generate_id("doc-1", 5));
        assert_ne!(id, Chunk::generate_id("doc-1", 6));
        assert_ne!(id, Chunk::generate_id("doc-2", 5));
    }

    #[test]
    fn chunk_copies_document_scope() {
        let doc = test_document();
        let chunk = Chunk::from_document(&doc, 0, "text".to_string(), 1, vec![0.1, 0.2]);
        assert_eq!(chunk.document_id, doc.id);
        assert_eq!(chunk.document_name, "Refund policy");
        assert_eq!(chunk.assistant_ids, vec!["asst-a".to_string()]);
        assert_eq!(chunk.workspace_id, Some("ws-1".to_string()));
    }

    #[test]
    fn status_round_trips_as_string() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Ready,
            DocumentStatus::Failed,
        ] {
            let parsed: DocumentStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("error".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn summary_hides_raw_text() {
        let doc = test_document();
        let summary = DocumentSummary::from(&doc);
        assert_eq!(summary.source_type, SourceKind::Text);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("refunds"));
    }
}
