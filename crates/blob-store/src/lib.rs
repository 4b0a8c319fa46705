//! Chunked blob storage on remote sessions.
//!
//! A blob is base64-encoded and split into chunks. Each chunk becomes the
//! record of its own throwaway session; a final meta session lists the
//! chunk locations in order.
//!
//! # Pipeline
//!
//! 1. **Split** - [`ChunkCodec::split`] the encoded payload
//! 2. **Upload** - one `create_and_commit` per chunk, bounded concurrency
//! 3. **Index** - write the meta record listing every chunk location
//!
//! Retrieval reads the meta record, then the chunks, and joins them.

pub mod codec;
pub mod config;
pub mod error;
pub mod progress;
pub mod store;
pub mod types;

pub use codec::{ChunkCodec, Chunks};
pub use config::StoreConfig;
pub use error::{CodecError, StoreError};
pub use progress::Progress;
pub use store::{BlobStore, ephemeral_name};
pub use types::{BlobDescriptor, RetrievedBlob};
