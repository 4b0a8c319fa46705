//! Command implementations, independent of argument parsing.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use sessvault_blob_store::{BlobStore, Progress};
use sessvault_protocol::{BlobMetadata, RemoteLocation};

use crate::mime;

/// Progress reporter writing `label current/total` to stderr.
fn report(label: &'static str, quiet: bool) -> impl Fn(Progress) + Send + Sync {
    move |p: Progress| {
        if quiet {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{label} {}/{} chunks", p.current, p.total);
        if p.is_complete() {
            let _ = writeln!(err);
        }
    }
}

/// Stores `file` and returns the handle of its meta record.
pub async fn store(
    store: &BlobStore,
    file: &Path,
    mime_type: Option<&str>,
    quiet: bool,
) -> anyhow::Result<RemoteLocation> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("blob")
        .to_string();
    let mime_type = mime::resolve(mime_type, file);

    tracing::debug!(%filename, %mime_type, bytes = data.len(), "storing file");
    let descriptor = store
        .store(&data, &filename, &mime_type, report("storing", quiet))
        .await?;
    Ok(descriptor.location)
}

/// Retrieves the blob at `handle` into `output`, or into its recorded
/// filename in the current directory.
pub async fn fetch(
    store: &BlobStore,
    handle: &RemoteLocation,
    output: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<PathBuf> {
    let blob = store
        .retrieve_blob(handle, report("fetching", quiet))
        .await?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => default_output(&blob.filename, handle),
    };
    tokio::fs::write(&path, &blob.data)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = blob.data.len(), mime = %blob.mime_type, "file written");
    Ok(path)
}

/// Reads the meta record at `handle`.
pub async fn info(store: &BlobStore, handle: &RemoteLocation) -> anyhow::Result<BlobMetadata> {
    Ok(store.metadata(handle).await?)
}

/// Recorded filename stripped to its last component, so a stored name can
/// never point outside the current directory.
fn default_output(filename: &str, handle: &RemoteLocation) -> PathBuf {
    Path::new(filename)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.bin", handle.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Value;
    use sessvault_blob_store::StoreConfig;
    use sessvault_protocol::{RecordKind, SessionRecord};
    use sessvault_session::{BoxFuture, CreatedSession, SessionClient, SessionError};

    #[derive(Default)]
    struct MemoryClient {
        records: Mutex<HashMap<String, Value>>,
        next_id: AtomicUsize,
    }

    impl SessionClient for MemoryClient {
        fn create<'a>(
            &'a self,
            _kind: RecordKind,
            name: &'a str,
        ) -> BoxFuture<'a, Result<CreatedSession, SessionError>> {
            Box::pin(async move {
                Ok(CreatedSession {
                    app_id: "sup".into(),
                    id: format!("ID{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
                    is_active: true,
                    name: name.to_string(),
                    scenario_id: "sup-brewer".into(),
                    scenario_name: String::new(),
                    principal: "host".into(),
                    version: Value::Null,
                })
            })
        }

        fn read<'a>(
            &'a self,
            location: &'a RemoteLocation,
        ) -> BoxFuture<'a, Result<Value, SessionError>> {
            Box::pin(async move {
                Ok(self
                    .records
                    .lock()
                    .unwrap()
                    .get(&location.id)
                    .cloned()
                    .unwrap_or(Value::Null))
            })
        }

        fn write_and_commit<'a>(
            &'a self,
            location: &'a RemoteLocation,
            record: &'a SessionRecord,
        ) -> BoxFuture<'a, Result<(), SessionError>> {
            Box::pin(async move {
                let value = serde_json::to_value(record)?;
                self.records
                    .lock()
                    .unwrap()
                    .insert(location.id.clone(), value);
                Ok(())
            })
        }
    }

    fn memory_store() -> BlobStore {
        BlobStore::new(
            Arc::new(MemoryClient::default()),
            StoreConfig {
                max_chunk_size: 16,
                max_concurrency: 4,
            },
        )
    }

    #[tokio::test]
    async fn store_fetch_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        let content = b"the quick brown fox jumps over the lazy dog".repeat(3);
        std::fs::write(&input, &content).unwrap();

        let store = memory_store();
        let handle = super::store(&store, &input, None, true).await.unwrap();

        let meta = info(&store, &handle).await.unwrap();
        assert_eq!(meta.filename, "notes.txt");
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.chunk_locations.len(), 172usize.div_ceil(16));

        let output = dir.path().join("copy.txt");
        let written = fetch(&store, &handle, Some(&output), true).await.unwrap();
        assert_eq!(written, output);
        assert_eq!(std::fs::read(&output).unwrap(), content);
    }

    #[tokio::test]
    async fn store_uses_explicit_mime() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("blob");
        std::fs::write(&input, [0u8, 1, 2]).unwrap();

        let store = memory_store();
        let handle = super::store(&store, &input, Some("application/x-custom"), true)
            .await
            .unwrap();
        let meta = info(&store, &handle).await.unwrap();
        assert_eq!(meta.mime_type, "application/x-custom");
    }

    #[tokio::test]
    async fn store_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = super::store(&memory_store(), &dir.path().join("absent"), None, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reading"));
    }

    #[test]
    fn default_output_strips_directories() {
        let handle = RemoteLocation::new("AB12", "t");
        assert_eq!(default_output("cat.png", &handle), PathBuf::from("cat.png"));
        assert_eq!(default_output("../../etc/passwd", &handle), PathBuf::from("passwd"));
        assert_eq!(default_output("", &handle), PathBuf::from("AB12.bin"));
        assert_eq!(default_output("..", &handle), PathBuf::from("AB12.bin"));
    }
}
