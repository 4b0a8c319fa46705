//! Store and retrieve blobs as chunk sessions plus one meta session.

use std::future::Future;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use sessvault_protocol::{BlobMetadata, RecordKind, RemoteLocation, SessionRecord};
use sessvault_session::{SessionClient, SessionError};

use crate::codec::ChunkCodec;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::progress::Progress;
use crate::types::{BlobDescriptor, RetrievedBlob};

/// Name for a throwaway session, `Period N` with N in 1..=10.
pub fn ephemeral_name() -> String {
    format!("Period {}", rand::thread_rng().gen_range(1..=10))
}

/// Stores blobs through a [`SessionClient`].
///
/// Cancelling [`cancel_token`](Self::cancel_token) aborts the running call
/// and every later one with [`StoreError::Cancelled`].
pub struct BlobStore {
    client: Arc<dyn SessionClient>,
    config: StoreConfig,
    cancel: CancellationToken,
}

impl BlobStore {
    pub fn new(client: Arc<dyn SessionClient>, config: StoreConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a cancellation token for this store.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Stores `data` and returns the location of its meta record.
    ///
    /// Chunks upload with at most `max_concurrency` in flight. The first
    /// failure aborts the call; in-flight uploads are dropped and no meta
    /// record is written. Chunks already written stay behind.
    pub async fn store<F>(
        &self,
        data: &[u8],
        filename: &str,
        mime_type: &str,
        on_progress: F,
    ) -> Result<BlobDescriptor, StoreError>
    where
        F: Fn(Progress) + Send + Sync,
    {
        self.config.validate()?;
        self.check_cancelled()?;

        let chunks = ChunkCodec::split(data, self.config.max_chunk_size);
        let total = chunks.len();
        info!(filename, bytes = data.len(), chunks = total, "storing blob");

        let client = self.client.as_ref();
        let mut uploads = stream::iter(chunks.enumerate())
            .map(|(index, chunk)| async move {
                let record = SessionRecord::Chunk(chunk);
                let name = ephemeral_name();
                let location = client
                    .create_and_commit(RecordKind::Chunk, &name, &record)
                    .await?;
                trace!(chunk = index, session = %location.id, "chunk stored");
                Ok::<_, SessionError>((index, location))
            })
            .buffer_unordered(self.config.max_concurrency);

        let mut placed = Vec::with_capacity(total);
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(StoreError::Cancelled),
                next = uploads.next() => next,
            };
            let Some(result) = next else { break };
            placed.push(result?);
            on_progress(Progress::new(placed.len(), total));
        }
        drop(uploads);

        placed.sort_unstable_by_key(|(index, _)| *index);
        let meta = SessionRecord::Meta(BlobMetadata {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            chunk_locations: placed.into_iter().map(|(_, location)| location).collect(),
        });

        let name = ephemeral_name();
        let location = self
            .cancellable(client.create_and_commit(RecordKind::Meta, &name, &meta))
            .await?;

        info!(handle = %location, chunks = total, "blob stored");
        Ok(BlobDescriptor { location })
    }

    /// Reads the blob whose meta record lives at `location`.
    pub async fn retrieve<F>(
        &self,
        location: &RemoteLocation,
        on_progress: F,
    ) -> Result<Vec<u8>, StoreError>
    where
        F: Fn(Progress) + Send + Sync,
    {
        Ok(self.retrieve_blob(location, on_progress).await?.data)
    }

    /// Reads a blob along with its recorded filename and MIME type.
    ///
    /// The meta record is validated before any chunk is read. Chunks are
    /// read concurrently but reported and joined in recorded order.
    pub async fn retrieve_blob<F>(
        &self,
        location: &RemoteLocation,
        on_progress: F,
    ) -> Result<RetrievedBlob, StoreError>
    where
        F: Fn(Progress) + Send + Sync,
    {
        self.config.validate()?;
        let meta = self.metadata(location).await?;
        let total = meta.chunk_locations.len();
        debug!(handle = %location, filename = %meta.filename, chunks = total, "retrieving blob");

        let client = self.client.as_ref();
        let mut reads = stream::iter(meta.chunk_locations.iter())
            .map(|chunk_location| async move {
                let value = client.read(chunk_location).await?;
                expect_chunk(value)
            })
            .buffered(self.config.max_concurrency);

        let mut chunks = Vec::with_capacity(total);
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(StoreError::Cancelled),
                next = reads.next() => next,
            };
            let Some(result) = next else { break };
            chunks.push(result?);
            on_progress(Progress::new(chunks.len(), total));
        }
        drop(reads);

        let data = ChunkCodec::join(&chunks)?;
        info!(handle = %location, bytes = data.len(), "blob retrieved");
        Ok(RetrievedBlob {
            filename: meta.filename,
            mime_type: meta.mime_type,
            data,
        })
    }

    /// Reads and validates the meta record at `location`.
    pub async fn metadata(&self, location: &RemoteLocation) -> Result<BlobMetadata, StoreError> {
        self.check_cancelled()?;
        let value = self.cancellable(self.client.read(location)).await?;
        expect_meta(value)
    }

    fn check_cancelled(&self) -> Result<(), StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }

    async fn cancellable<T, E>(
        &self,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, StoreError>
    where
        E: Into<StoreError>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }
}

/// Checks the `type` tag of a raw record before decoding it.
fn check_tag(expected: RecordKind, value: &serde_json::Value) -> Result<(), StoreError> {
    match SessionRecord::type_tag(value) {
        Some(tag) if tag == expected.as_str() => Ok(()),
        Some(tag) => Err(StoreError::Schema {
            expected,
            found: format!("{tag:?}"),
        }),
        None if value.is_null() => Err(StoreError::Schema {
            expected,
            found: "no record".into(),
        }),
        None => Err(StoreError::Schema {
            expected,
            found: "an untyped value".into(),
        }),
    }
}

fn decode(expected: RecordKind, value: serde_json::Value) -> Result<SessionRecord, StoreError> {
    check_tag(expected, &value)?;
    serde_json::from_value(value).map_err(|source| StoreError::Malformed {
        kind: expected,
        source,
    })
}

fn expect_meta(value: serde_json::Value) -> Result<BlobMetadata, StoreError> {
    match decode(RecordKind::Meta, value)? {
        SessionRecord::Meta(meta) => Ok(meta),
        other => Err(StoreError::Schema {
            expected: RecordKind::Meta,
            found: format!("{:?}", other.kind().as_str()),
        }),
    }
}

fn expect_chunk(value: serde_json::Value) -> Result<String, StoreError> {
    match decode(RecordKind::Chunk, value)? {
        SessionRecord::Chunk(data) => Ok(data),
        other => Err(StoreError::Schema {
            expected: RecordKind::Chunk,
            found: format!("{:?}", other.kind().as_str()),
        }),
    }
}
