//! Process-launch backends
//!
//! An executor decides how and where a job's command line actually runs.
//! The daemon only needs two capabilities from it:
//! - `launch`: start the command and return immediately
//! - `status`: report what the backend knows about a job
//!
//! The daemon is never notified when a process finishes; it polls.

mod local;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use strata_core::domain::status::StatusName;
use thiserror::Error;

pub use local::LocalExecutor;

/// Errors raised while launching a job
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A redirect file could not be created
    #[error("Cannot create '{path}': {source}")]
    Redirect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process could not be started
    #[error("Failed to start job {job_id}: {source}")]
    Spawn {
        job_id: String,
        #[source]
        source: std::io::Error,
    },

    /// The job already has a live process
    #[error("Job {0} is already running")]
    AlreadyRunning(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Capability interface of a process-launch backend
#[async_trait]
pub trait Executor: Send + Sync {
    /// Starts a job's command line without waiting for it
    ///
    /// # Arguments
    /// * `job_id` - The job being launched
    /// * `command_line` - Full, credentialed command line
    /// * `stdout` - File receiving the process's standard output
    /// * `stderr` - File receiving the process's standard error
    async fn launch(
        &self,
        job_id: &str,
        command_line: &str,
        stdout: &Path,
        stderr: &Path,
    ) -> Result<(), ExecutorError>;

    /// Reports the backend's view of a job
    ///
    /// Returns `Unknown` when the backend has no information.
    async fn status(&self, job_id: &str) -> StatusName;
}

/// Creates the executor selected by name
pub fn from_name(name: &str) -> anyhow::Result<std::sync::Arc<dyn Executor>> {
    match name {
        "local" => Ok(std::sync::Arc::new(LocalExecutor::new())),
        other => anyhow::bail!("Unknown executor '{}'", other),
    }
}
