//! Status resolution
//!
//! The catalog only knows the status the daemon last wrote. The actual
//! state of a job is inferred, in order of preference, from:
//! 1. The result descriptor the tool writes into its output directory
//! 2. The process-launch backend's own view of the job
//! 3. The presence of the job's error log

use std::sync::Arc;
use strata_core::domain::job::Job;
use strata_core::domain::status::{ExecutionStatus, StatusName};
use tracing::warn;

use crate::executor::Executor;
use crate::service::descriptor::{DescriptorReader, find_descriptor};

/// Derives the ground-truth status of queued and running jobs
#[derive(Clone)]
pub struct StatusResolver {
    executor: Arc<dyn Executor>,
    reader: DescriptorReader,
}

impl StatusResolver {
    pub fn new(executor: Arc<dyn Executor>, reader: DescriptorReader) -> Self {
        Self { executor, reader }
    }

    /// Resolves the current status of a job
    pub async fn current_status(&self, job: &Job) -> ExecutionStatus {
        let out_dir = job.out_dir.as_ref().map(|dir| dir.uri.as_path());

        if let Some(path) = out_dir.and_then(find_descriptor) {
            match self.reader.read(&path).await {
                Some(result) => {
                    let mut status = ExecutionStatus::new(result.status.name);
                    status.step = result.status.step;
                    return status;
                }
                None if path.exists() => {
                    warn!("Result file {} seems corrupted", path.display())
                }
                None => warn!("Could not find result file {}", path.display()),
            }
        }

        let reported = self.executor.status(&job.id).await;
        if reported != StatusName::Unknown {
            return ExecutionStatus::new(reported);
        }

        let Some(out_dir) = out_dir else {
            return ExecutionStatus::with_description(
                StatusName::Unknown,
                "Missing output directory",
            );
        };

        // The process started (its stderr exists) but never produced a
        // descriptor.
        if out_dir.join(job.error_log_file_name()).exists() {
            ExecutionStatus::with_description(StatusName::Error, "Command line error")
        } else {
            ExecutionStatus::new(StatusName::Queued)
        }
    }
}
