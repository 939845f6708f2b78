//! Configuration loaded once at process start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Chunking knobs, all measured in characters.
///
/// Injected into the chunker at construction; there is no ambient/global
/// lookup of these values anywhere in the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound on chunk content length. A single paragraph longer than
    /// this still becomes one chunk rather than being split mid-sentence.
    pub max_chunk_size: usize,
    /// Trailing characters carried from one chunk into the next.
    pub overlap_size: usize,
    /// Chunks below this length are not emitted.
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1500,
            overlap_size: 200,
            min_chunk_size: 100,
        }
    }
}

impl ChunkingConfig {
    /// Read chunk sizes from `CHUNK_SIZE` / `OVERLAP_SIZE` / `MIN_CHUNK_SIZE`,
    /// falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_chunk_size: env_usize("CHUNK_SIZE", defaults.max_chunk_size),
            overlap_size: env_usize("OVERLAP_SIZE", defaults.overlap_size),
            min_chunk_size: env_usize("MIN_CHUNK_SIZE", defaults.min_chunk_size),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 || self.min_chunk_size == 0 {
            return Err(Error::Config(
                "chunk sizes must be positive".to_string(),
            ));
        }
        if self.overlap_size >= self.max_chunk_size {
            return Err(Error::Config(format!(
                "overlap size {} must be smaller than max chunk size {}",
                self.overlap_size, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Top-level Bookwise configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server port.
    pub port: u16,
    /// Root data directory (holds the document database).
    pub data_dir: PathBuf,
    /// Base URL of the external vector index service.
    pub vector_index_url: String,
    /// Chunking knobs.
    pub chunking: ChunkingConfig,
}

impl AppConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("BOOKWISE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let vector_index_url = std::env::var("BOOKWISE_VECTOR_INDEX_URL")
            .unwrap_or_else(|_| "http://localhost:6333".to_string());

        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self {
            port,
            data_dir,
            vector_index_url,
            chunking: ChunkingConfig::from_env()?,
        })
    }
}
