use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Default maximum length of one chunk, in base64 characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 75_000;

/// Default number of chunk uploads or reads in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 25;

/// Chunking and concurrency settings for a [`BlobStore`](crate::BlobStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_chunk_size: usize,
    pub max_concurrency: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.max_chunk_size == 0 {
            return Err(StoreError::InvalidConfig(
                "max_chunk_size must be at least 1".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(StoreError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
