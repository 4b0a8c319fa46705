//! CLI configuration.
//!
//! Read from `sessvault/config.json` under the platform config directory:
//!
//! ```json
//! {
//!   "remote": { "session_url": "wss://...", "handshake_timeout_secs": 30 },
//!   "store":  { "max_chunk_size": 75000, "max_concurrency": 25 }
//! }
//! ```
//!
//! Every field is optional; missing ones take the built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sessvault_blob_store::StoreConfig;
use sessvault_session::RemoteConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Loads the config file at `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        Self::load_from(&path)
    }

    /// Loads `path`. A missing file yields defaults; an unparsable one
    /// yields defaults with a warning.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Config>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Applies command-line overrides on top of file values.
    pub fn with_overrides(mut self, chunk_size: Option<usize>, concurrency: Option<usize>) -> Self {
        if let Some(size) = chunk_size {
            self.store.max_chunk_size = size;
        }
        if let Some(n) = concurrency {
            self.store.max_concurrency = n;
        }
        self
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("sessvault").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp"))
    }
}
