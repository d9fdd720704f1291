//! Plain-text extraction from document sources.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::models::{DocumentSource, IngestionConfig, KnowledgeDocument};
use crate::store::ObjectStore;
use crate::utils::text::strip_html;

/// Turns a document source into plain text.
///
/// The pipeline only depends on this seam; PDF/DOCX parsing and URL fetching
/// live behind it.
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    async fn extract(&self, document: &KnowledgeDocument) -> Result<String, ExtractionError>;
}

/// Default extractor: inline text as-is, URLs fetched and stripped of HTML,
/// file blobs from the object store decoded by extension.
pub struct DefaultExtractor {
    http: reqwest::Client,
    objects: Arc<dyn ObjectStore>,
}

impl DefaultExtractor {
    pub fn new(
        config: &IngestionConfig,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self, ExtractionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        Ok(Self { http, objects })
    }

    async fn fetch_url(&self, url: &str) -> Result<String, ExtractionError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        Ok(strip_html(&body))
    }

    async fn extract_file(&self, storage_uri: &str) -> Result<String, ExtractionError> {
        let bytes = self.objects.get(storage_uri).await?;

        match guess_extension(storage_uri) {
            FileKind::Pdf => {
                // pdf parsing is CPU-bound; keep it off the ingestion event loop
                tokio::task::spawn_blocking(move || extract_pdf(&bytes))
                    .await
                    .map_err(|e| ExtractionError::Pdf(e.to_string()))?
            }
            FileKind::Docx => tokio::task::spawn_blocking(move || extract_docx(&bytes))
                .await
                .map_err(|e| ExtractionError::Docx(e.to_string()))?,
            FileKind::Plain => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

#[async_trait]
impl SourceExtractor for DefaultExtractor {
    async fn extract(&self, document: &KnowledgeDocument) -> Result<String, ExtractionError> {
        match &document.source {
            DocumentSource::Text { raw_text } => Ok(raw_text.clone()),
            DocumentSource::Url { url } => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(ExtractionError::MissingSource(
                        "url source has no url".to_string(),
                    ));
                }
                self.fetch_url(url).await
            }
            DocumentSource::File { storage_uri } => {
                if storage_uri.is_empty() {
                    return Err(ExtractionError::MissingSource(
                        "file source has no storage uri".to_string(),
                    ));
                }
                self.extract_file(storage_uri).await
            }
        }
    }
}

enum FileKind {
    Pdf,
    Docx,
    Plain,
}

fn guess_extension(storage_uri: &str) -> FileKind {
    let lowered = storage_uri.to_lowercase();
    if lowered.ends_with(".pdf") {
        FileKind::Pdf
    } else if lowered.ends_with(".docx") {
        FileKind::Docx
    } else {
        FileKind::Plain
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
}

/// Pull the `w:t` text runs out of `word/document.xml`, one line per
/// paragraph.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(e.to_string()))?
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t"
                    && let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                {
                    out.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
