//! Token-windowed text chunking with overlap.

use crate::error::ChunkingConfigError;
use crate::models::IngestionConfig;

/// One window of document text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    pub text: String,
    pub token_count: usize,
}

/// Splits text into overlapping windows of whitespace-delimited tokens.
///
/// Pure and deterministic: the same `(text, window_size, overlap)` always
/// yields the same spans, so ingestion can be re-run safely on resync.
#[derive(Debug, Clone)]
pub struct TokenChunker {
    window_size: usize,
    overlap: usize,
}

impl TokenChunker {
    /// Create a chunker, rejecting configurations whose window would not
    /// progress. `overlap >= window_size` must never silently loop forever.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self, ChunkingConfigError> {
        if window_size == 0 || overlap >= window_size {
            return Err(ChunkingConfigError {
                window_size,
                overlap,
            });
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }

    pub fn from_config(config: &IngestionConfig) -> Result<Self, ChunkingConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk text into overlapping token windows.
    ///
    /// Windows start at offset 0; each subsequent window starts at
    /// `previous_end - overlap`. A trailing remainder of at most `overlap`
    /// tokens is absorbed into the final window instead of emitting a short
    /// chunk that would be nearly all overlap. Empty input yields no spans.
    pub fn chunk(&self, text: &str) -> Vec<ChunkSpan> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut start = 0;

        loop {
            let mut end = (start + self.window_size).min(tokens.len());
            if tokens.len() - end <= self.overlap {
                end = tokens.len();
            }

            spans.push(ChunkSpan {
                text: tokens[start..end].join(" "),
                token_count: end - start,
            });

            if end == tokens.len() {
                break;
            }
            // overlap < window_size guarantees forward progress
            start = end - self.overlap;
        }

        spans
    }
}
