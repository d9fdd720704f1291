//! Ingestion job runner with bounded retry.
//!
//! Stands in for the external job queue: transient failures re-run the whole
//! pipeline with exponential backoff, terminal failures surface immediately.

use std::sync::Arc;

use tracing::warn;

use crate::error::IngestError;
use crate::services::ingest::{IngestPipeline, IngestReport};
use crate::utils::retry::{RetryConfig, RetryResult, with_retry};

pub struct IngestWorker {
    pipeline: Arc<IngestPipeline>,
    retry: RetryConfig,
}

impl IngestWorker {
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        Self {
            pipeline,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run one ingestion job to completion.
    ///
    /// Each attempt restarts the pipeline from step one; the pipeline is
    /// idempotent, so partial progress from a failed attempt is overwritten.
    pub async fn run(&self, document_id: &str) -> Result<IngestReport, IngestError> {
        match with_retry(&self.retry, || self.pipeline.ingest(document_id)).await {
            RetryResult::Success(report) => Ok(report),
            RetryResult::Failed {
                last_error,
                attempts,
            } => {
                warn!(
                    document_id,
                    attempts,
                    error = %last_error,
                    "knowledge ingest job exhausted"
                );
                Err(last_error)
            }
        }
    }
}
