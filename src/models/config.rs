use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "knowledge_base";
pub const DEFAULT_EMBEDDING_DIMENSION: u64 = 384;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_index: VectorIndexConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, crate::error::ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Vector dimensionality is pinned to the deployed embedding model; the
    /// collection is created with it and must never mix dimensionalities.
    #[serde(default = "default_dimension")]
    pub dimension: u64,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_batch_size() -> u32 {
    8
}

fn default_dimension() -> u64 {
    DEFAULT_EMBEDDING_DIMENSION
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
            dimension: default_dimension(),
        }
    }
}

/// Which vector index backend serves similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexDriver {
    /// External Qdrant collection (production).
    #[default]
    Qdrant,
    /// Brute-force cosine scan over chunk rows in the metadata store
    /// (dependency-free fallback).
    Scan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default)]
    pub driver: IndexDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            driver: IndexDriver::default(),
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_objects_dir")]
    pub objects_dir: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/kbase.db")
}

fn default_objects_dir() -> PathBuf {
    PathBuf::from("data/objects")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            objects_dir: default_objects_dir(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Chunk window size in tokens; an ingestion-wide constant, never
    /// per-document.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    700
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_fetch_timeout() -> u64 {
    20
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u64,

    /// Minimum similarity the best hit must reach before any context is
    /// surfaced.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_top_k() -> u64 {
    5
}

fn default_score_threshold() -> f32 {
    0.75
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.vector_index.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_index.collection, DEFAULT_COLLECTION);
        assert_eq!(config.vector_index.driver, IndexDriver::Qdrant);
        assert_eq!(config.ingestion.chunk_size, 700);
        assert_eq!(config.ingestion.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.score_threshold - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [vector_index]
            driver = "scan"

            [retrieval]
            score_threshold = 0.9
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.vector_index.driver, IndexDriver::Scan);
        assert!((config.retrieval.score_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.ingestion.chunk_size, 700);
    }

    #[test]
    fn load_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/kbase.toml")).unwrap();
        assert_eq!(config.embedding.batch_size, 8);
    }
}
