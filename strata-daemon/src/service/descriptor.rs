//! Result descriptor access
//!
//! Locates the `.result.json` file a tool writes into its output directory
//! and reads it. Tools rewrite the file while they run, so a read can hit a
//! partially written document; reads are retried a bounded number of times
//! with a fixed pause before giving up.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strata_core::domain::result::{
    ExecutionResult, RESULT_FILE_EXTENSION, RESULT_SWAP_FILE_EXTENSION,
};
use thiserror::Error;
use tracing::{error, warn};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Errors raised while loading a descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed descriptor: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of descriptor contents
pub trait DescriptorLoader: Send + Sync {
    /// Loads and parses the descriptor at `path`
    fn load(&self, path: &Path) -> Result<ExecutionResult, DescriptorError>;
}

/// Loads descriptors from the local filesystem
pub struct FsDescriptorLoader;

impl DescriptorLoader for FsDescriptorLoader {
    fn load(&self, path: &Path) -> Result<ExecutionResult, DescriptorError> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }
}

/// Reads descriptors with bounded retries
#[derive(Clone)]
pub struct DescriptorReader {
    loader: Arc<dyn DescriptorLoader>,
    attempts: u32,
    backoff: Duration,
}

impl DescriptorReader {
    pub fn new(loader: Arc<dyn DescriptorLoader>) -> Self {
        Self {
            loader,
            attempts: MAX_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Reads the descriptor at `path`
    ///
    /// Returns `None` once every attempt has failed.
    pub async fn read(&self, path: &Path) -> Option<ExecutionResult> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.loader.load(path) {
                Ok(result) => return Some(result),
                Err(e) if attempt >= self.attempts => {
                    error!("Could not load result file {}: {}", path.display(), e);
                    return None;
                }
                Err(e) => {
                    warn!(
                        "Could not load result file {}. Retry {}/{}. {}",
                        path.display(),
                        attempt,
                        self.attempts,
                        e
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }

    /// Locates and reads the descriptor in `out_dir`, if there is one
    pub async fn read_in(&self, out_dir: &Path) -> Option<ExecutionResult> {
        let path = find_descriptor(out_dir)?;
        self.read(&path).await
    }
}

impl Default for DescriptorReader {
    fn default() -> Self {
        Self::new(Arc::new(FsDescriptorLoader))
    }
}

/// Whether a path is a descriptor or its swap file
pub fn is_descriptor_path(path: &Path) -> bool {
    let path = path.to_string_lossy();
    path.ends_with(RESULT_FILE_EXTENSION) || path.ends_with(RESULT_SWAP_FILE_EXTENSION)
}

/// Finds the descriptor in an output directory
///
/// Swap files are ignored. When several descriptors are present the first
/// in name order wins.
pub fn find_descriptor(out_dir: &Path) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(out_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list output directory {}: {}", out_dir.display(), e);
            return None;
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.to_string_lossy();
            name.ends_with(RESULT_FILE_EXTENSION) && !name.ends_with(RESULT_SWAP_FILE_EXTENSION)
        })
        .filter(|path| path.is_file())
        .collect();

    candidates.sort();
    if candidates.len() > 1 {
        warn!(
            "Found {} result files in {}, using {}",
            candidates.len(),
            out_dir.display(),
            candidates[0].display()
        );
    }
    candidates.into_iter().next()
}
