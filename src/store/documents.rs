//! SQLite-backed metadata store for documents and their chunk rows.
//!
//! Chunk rows are denormalized audit/debugging artifacts and the backing
//! data for the brute-force scan index; the Qdrant query path never reads
//! them.

use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::error::StoreError;
use crate::models::{Chunk, DocumentSource, DocumentStatus, DocumentSummary, KnowledgeDocument, StoreConfig};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS knowledge_documents (
    id TEXT PRIMARY KEY,
    workspace_id TEXT,
    name TEXT NOT NULL,
    source_type TEXT NOT NULL,
    storage_uri TEXT,
    source_url TEXT,
    raw_text TEXT,
    content_hash TEXT NOT NULL,
    file_size INTEGER NOT NULL DEFAULT 0,
    assigned_assistant_ids TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL,
    error_message TEXT,
    token_count INTEGER NOT NULL DEFAULT 0,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_synced_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_documents_workspace
    ON knowledge_documents(workspace_id);

CREATE TABLE IF NOT EXISTS knowledge_chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    document_name TEXT NOT NULL,
    workspace_id TEXT NOT NULL DEFAULT '',
    assistant_ids TEXT NOT NULL DEFAULT '[]',
    chunk_index INTEGER NOT NULL,
    chunk_text TEXT NOT NULL,
    token_count INTEGER NOT NULL DEFAULT 0,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_document ON knowledge_chunks(document_id);
CREATE INDEX IF NOT EXISTS idx_chunks_workspace ON knowledge_chunks(workspace_id);
"#;

/// Encode an embedding as little-endian f32 bytes for BLOB storage.
fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Persistence for document metadata and chunk rows.
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Open (creating if missing) the store at the configured path.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn insert_document(&self, doc: &KnowledgeDocument) -> Result<(), StoreError> {
        let (storage_uri, source_url, raw_text) = match &doc.source {
            DocumentSource::File { storage_uri } => (Some(storage_uri.as_str()), None, None),
            DocumentSource::Url { url } => (None, Some(url.as_str()), None),
            DocumentSource::Text { raw_text } => (None, None, Some(raw_text.as_str())),
        };

        sqlx::query(
            r#"
            INSERT INTO knowledge_documents
                (id, workspace_id, name, source_type, storage_uri, source_url, raw_text,
                 content_hash, file_size, assigned_assistant_ids, status, error_message,
                 token_count, chunk_count, created_at, last_synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.workspace_id)
        .bind(&doc.name)
        .bind(doc.source.kind().to_string())
        .bind(storage_uri)
        .bind(source_url)
        .bind(raw_text)
        .bind(&doc.content_hash)
        .bind(doc.file_size as i64)
        .bind(serde_json::to_string(&doc.assigned_assistant_ids)?)
        .bind(doc.status.to_string())
        .bind(&doc.error_message)
        .bind(doc.token_count as i64)
        .bind(doc.chunk_count as i64)
        .bind(&doc.created_at)
        .bind(&doc.last_synced_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one document, optionally enforcing workspace ownership.
    pub async fn get_document(
        &self,
        document_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<Option<KnowledgeDocument>, StoreError> {
        let row = match workspace_id {
            Some(ws) => {
                sqlx::query(
                    "SELECT * FROM knowledge_documents WHERE id = ?1 AND workspace_id = ?2",
                )
                .bind(document_id)
                .bind(ws)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM knowledge_documents WHERE id = ?1")
                    .bind(document_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        row.map(|r| document_from_row(&r)).transpose()
    }

    /// List document summaries for a workspace, newest first. Raw text never
    /// leaves the store on this path.
    pub async fn list_documents(
        &self,
        workspace_id: Option<&str>,
    ) -> Result<Vec<DocumentSummary>, StoreError> {
        let rows = match workspace_id {
            Some(ws) => {
                sqlx::query(
                    "SELECT * FROM knowledge_documents WHERE workspace_id = ?1
                     ORDER BY created_at DESC",
                )
                .bind(ws)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM knowledge_documents ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|r| document_from_row(r).map(|doc| DocumentSummary::from(&doc)))
            .collect()
    }

    /// Transition to `processing` and clear any previous error. Returns false
    /// when the document does not exist.
    pub async fn mark_processing(&self, document_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE knowledge_documents
             SET status = 'processing', error_message = NULL
             WHERE id = ?1",
        )
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Resync entry point: back to `processing` and drop existing chunk rows
    /// so stale rows never coexist with a fresh ingest.
    pub async fn mark_processing_and_clear_chunks(
        &self,
        document_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = match workspace_id {
            Some(ws) => {
                sqlx::query(
                    "UPDATE knowledge_documents
                     SET status = 'processing', error_message = NULL
                     WHERE id = ?1 AND workspace_id = ?2",
                )
                .bind(document_id)
                .bind(ws)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE knowledge_documents
                     SET status = 'processing', error_message = NULL
                     WHERE id = ?1",
                )
                .bind(document_id)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.delete_chunks(document_id).await?;
        Ok(true)
    }

    pub async fn mark_ready(
        &self,
        document_id: &str,
        token_count: u64,
        chunk_count: u64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE knowledge_documents
             SET status = 'ready', error_message = NULL,
                 token_count = ?2, chunk_count = ?3, last_synced_at = ?4
             WHERE id = ?1",
        )
        .bind(document_id)
        .bind(token_count as i64)
        .bind(chunk_count as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(
        &self,
        document_id: &str,
        error_message: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE knowledge_documents
             SET status = 'failed', error_message = ?2
             WHERE id = ?1",
        )
        .bind(document_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace all chunk rows for a document: delete-all-by-document, then
    /// bulk insert, in one transaction.
    pub async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM knowledge_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO knowledge_chunks
                    (id, document_id, document_name, workspace_id, assistant_ids,
                     chunk_index, chunk_text, token_count, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.document_name)
            .bind(chunk.workspace_id.clone().unwrap_or_default())
            .bind(serde_json::to_string(&chunk.assistant_ids)?)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.chunk_text)
            .bind(chunk.token_count as i64)
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_chunks(&self, document_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM knowledge_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn chunk_count(&self, document_id: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM knowledge_chunks WHERE document_id = ?1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    /// All chunk rows in one workspace, for the brute-force scan index.
    /// The empty string is the global (workspace-less) scope.
    pub async fn chunks_for_workspace(&self, workspace_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM knowledge_chunks WHERE workspace_id = ?1
             ORDER BY document_id, chunk_index",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chunk_from_row).collect()
    }

    /// Remove the document row and its chunk rows. Returns the deleted
    /// document so the caller can cascade vector and blob deletion.
    pub async fn delete_document(
        &self,
        document_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<Option<KnowledgeDocument>, StoreError> {
        let Some(doc) = self.get_document(document_id, workspace_id).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM knowledge_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM knowledge_documents WHERE id = ?1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(doc))
    }
}

fn document_from_row(row: &SqliteRow) -> Result<KnowledgeDocument, StoreError> {
    let source_type: String = row.get("source_type");
    let source = match source_type.as_str() {
        "file" => DocumentSource::File {
            storage_uri: row.get::<Option<String>, _>("storage_uri").unwrap_or_default(),
        },
        "url" => DocumentSource::Url {
            url: row.get::<Option<String>, _>("source_url").unwrap_or_default(),
        },
        _ => DocumentSource::Text {
            raw_text: row.get::<Option<String>, _>("raw_text").unwrap_or_default(),
        },
    };

    let assistant_ids: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("assigned_assistant_ids"))?;
    let status: DocumentStatus = row
        .get::<String, _>("status")
        .parse()
        .unwrap_or(DocumentStatus::Failed);

    Ok(KnowledgeDocument {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        name: row.get("name"),
        source,
        content_hash: row.get("content_hash"),
        file_size: row.get::<i64, _>("file_size") as u64,
        assigned_assistant_ids: assistant_ids,
        status,
        error_message: row.get("error_message"),
        token_count: row.get::<i64, _>("token_count") as u64,
        chunk_count: row.get::<i64, _>("chunk_count") as u64,
        created_at: row.get("created_at"),
        last_synced_at: row.get("last_synced_at"),
    })
}

fn chunk_from_row(row: &SqliteRow) -> Result<Chunk, StoreError> {
    let workspace: String = row.get("workspace_id");
    let assistant_ids: Vec<String> = serde_json::from_str(&row.get::<String, _>("assistant_ids"))?;
    let blob: Vec<u8> = row.get("embedding");

    Ok(Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        document_name: row.get("document_name"),
        workspace_id: if workspace.is_empty() {
            None
        } else {
            Some(workspace)
        },
        assistant_ids,
        chunk_index: row.get::<i64, _>("chunk_index") as u32,
        chunk_text: row.get("chunk_text"),
        token_count: row.get::<i64, _>("token_count") as u32,
        embedding: blob_to_vec(&blob),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentSource;

    fn test_document(workspace: Option<&str>, assistants: Vec<&str>) -> KnowledgeDocument {
        KnowledgeDocument::new(
            workspace.map(str::to_string),
            "Test doc",
            DocumentSource::Text {
                raw_text: "alpha beta gamma".to_string(),
            },
            "hash".to_string(),
            16,
            assistants.into_iter().map(str::to_string).collect(),
        )
    }

    fn test_chunks(doc: &KnowledgeDocument, n: u32) -> Vec<Chunk> {
        (0..n)
            .map(|i| {
                Chunk::from_document(doc, i, format!("chunk {}", i), 2, vec![i as f32, 1.0])
            })
            .collect()
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = DocumentStore::in_memory().await.unwrap();
        let doc = test_document(Some("ws-1"), vec!["asst-a"]);
        store.insert_document(&doc).await.unwrap();

        let loaded = store.get_document(&doc.id, None).await.unwrap().unwrap();
        assert_eq!(loaded.id, doc.id);
        assert_eq!(loaded.name, "Test doc");
        assert_eq!(loaded.status, DocumentStatus::Processing);
        assert_eq!(loaded.assigned_assistant_ids, vec!["asst-a".to_string()]);
        assert_eq!(
            loaded.source,
            DocumentSource::Text {
                raw_text: "alpha beta gamma".to_string()
            }
        );
    }

    #[tokio::test]
    async fn workspace_ownership_is_enforced() {
        let store = DocumentStore::in_memory().await.unwrap();
        let doc = test_document(Some("ws-1"), vec![]);
        store.insert_document(&doc).await.unwrap();

        assert!(store.get_document(&doc.id, Some("ws-1")).await.unwrap().is_some());
        assert!(store.get_document(&doc.id, Some("ws-2")).await.unwrap().is_none());
        assert!(store.list_documents(Some("ws-2")).await.unwrap().is_empty());
        assert_eq!(store.list_documents(Some("ws-1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_transitions() {
        let store = DocumentStore::in_memory().await.unwrap();
        let doc = test_document(None, vec![]);
        store.insert_document(&doc).await.unwrap();

        store.mark_failed(&doc.id, "boom").await.unwrap();
        let failed = store.get_document(&doc.id, None).await.unwrap().unwrap();
        assert_eq!(failed.status, DocumentStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));

        assert!(store.mark_processing(&doc.id).await.unwrap());
        let processing = store.get_document(&doc.id, None).await.unwrap().unwrap();
        assert_eq!(processing.status, DocumentStatus::Processing);
        assert!(processing.error_message.is_none());

        store.mark_ready(&doc.id, 42, 3).await.unwrap();
        let ready = store.get_document(&doc.id, None).await.unwrap().unwrap();
        assert_eq!(ready.status, DocumentStatus::Ready);
        assert_eq!(ready.token_count, 42);
        assert_eq!(ready.chunk_count, 3);
        assert!(ready.last_synced_at.is_some());

        assert!(!store.mark_processing("missing").await.unwrap());
    }

    #[tokio::test]
    async fn replace_chunks_overwrites_previous_rows() {
        let store = DocumentStore::in_memory().await.unwrap();
        let doc = test_document(Some("ws-1"), vec!["asst-a"]);
        store.insert_document(&doc).await.unwrap();

        store.replace_chunks(&doc.id, &test_chunks(&doc, 4)).await.unwrap();
        assert_eq!(store.chunk_count(&doc.id).await.unwrap(), 4);

        store.replace_chunks(&doc.id, &test_chunks(&doc, 2)).await.unwrap();
        assert_eq!(store.chunk_count(&doc.id).await.unwrap(), 2);

        let chunks = store.chunks_for_workspace("ws-1").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].embedding, vec![0.0, 1.0]);
        assert_eq!(chunks[0].assistant_ids, vec!["asst-a".to_string()]);
    }

    #[tokio::test]
    async fn resync_clears_chunks() {
        let store = DocumentStore::in_memory().await.unwrap();
        let doc = test_document(Some("ws-1"), vec![]);
        store.insert_document(&doc).await.unwrap();
        store.replace_chunks(&doc.id, &test_chunks(&doc, 3)).await.unwrap();
        store.mark_ready(&doc.id, 10, 3).await.unwrap();

        assert!(
            store
                .mark_processing_and_clear_chunks(&doc.id, Some("ws-1"))
                .await
                .unwrap()
        );
        assert_eq!(store.chunk_count(&doc.id).await.unwrap(), 0);
        let reloaded = store.get_document(&doc.id, None).await.unwrap().unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Processing);

        // wrong workspace does not match and must not clear anything
        assert!(
            !store
                .mark_processing_and_clear_chunks(&doc.id, Some("ws-2"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn delete_document_removes_rows() {
        let store = DocumentStore::in_memory().await.unwrap();
        let doc = test_document(Some("ws-1"), vec![]);
        store.insert_document(&doc).await.unwrap();
        store.replace_chunks(&doc.id, &test_chunks(&doc, 3)).await.unwrap();

        let deleted = store.delete_document(&doc.id, Some("ws-1")).await.unwrap();
        assert!(deleted.is_some());
        assert!(store.get_document(&doc.id, None).await.unwrap().is_none());
        assert_eq!(store.chunk_count(&doc.id).await.unwrap(), 0);

        // deleting again is a no-op
        assert!(store.delete_document(&doc.id, None).await.unwrap().is_none());
    }

    #[test]
    fn blob_round_trip() {
        let vec = vec![0.25f32, -1.5, 3.0];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
        assert!(blob_to_vec(&[]).is_empty());
    }
}
