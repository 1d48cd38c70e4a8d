//! Job finalization
//!
//! Closes a job once its execution reached a terminal state: the final
//! descriptor is stored on the job, the files left in the output directory
//! are registered in the catalog, and the final status is written.
//! Everything is re-derived from the filesystem, so a finalization that
//! fails halfway is simply repeated on the next cycle.

use std::path::Path;
use std::sync::Arc;
use strata_catalog::Catalog;
use strata_core::domain::file::File;
use strata_core::domain::job::Job;
use strata_core::domain::status::{ExecutionStatus, StatusName};
use strata_core::dto::job::JobUpdate;
use tracing::{error, info};

use crate::service::descriptor::{DescriptorReader, is_descriptor_path};

/// Marker of tool scratch directories, never registered as outputs
pub const SCRATCH_MARKER: &str = "/scratch_";

/// Registers outputs and persists the final status of finished jobs
#[derive(Clone)]
pub struct Finalizer {
    catalog: Arc<dyn Catalog>,
    reader: DescriptorReader,
}

impl Finalizer {
    pub fn new(catalog: Arc<dyn Catalog>, reader: DescriptorReader) -> Self {
        Self { catalog, reader }
    }

    /// Finalizes a job
    ///
    /// Returns 1 once the final update has been attempted, 0 if an earlier
    /// step failed and the job must be finalized again.
    pub async fn finalize(&self, job: &Job) -> u32 {
        info!("{} - Processing finished job", job.id);

        let Some(study) = job.study_fqn() else {
            error!("{} - Cannot finalize job without study", job.id);
            return 0;
        };
        let Some(out_dir) = &job.out_dir else {
            error!("{} - Cannot finalize job without output directory", job.id);
            return 0;
        };

        info!("{} - Registering job results from '{}'", job.id, out_dir.uri.display());

        let result = self.reader.read_in(&out_dir.uri).await;
        if let Some(result) = &result {
            if let Err(e) = self
                .catalog
                .update_job(&job.id, JobUpdate::result(result.clone()))
                .await
            {
                error!(
                    "{} - Catastrophic error. Could not store final result: {}",
                    job.id, e
                );
                return 0;
            }
        }

        let registered = match self
            .catalog
            .sync_untracked_files(study, &out_dir.path, &is_output_file)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                error!("{} - Could not register files in catalog: {}", job.id, e);
                return 0;
            }
        };

        let mut update = partition_files(job, registered);
        update.status = Some(match &result {
            None => ExecutionStatus::with_description(
                StatusName::Error,
                "Job could not finish successfully. Missing analysis result",
            ),
            Some(result) if result.is_error() => ExecutionStatus::with_description(
                StatusName::Error,
                "Job could not finish successfully",
            ),
            Some(_) => ExecutionStatus::new(StatusName::Done),
        });

        info!("{} - Updating job information", job.id);
        if let Err(e) = self.catalog.update_job(&job.id, update).await {
            error!(
                "{} - Catastrophic error. Could not store final status: {}",
                job.id, e
            );
        }

        1
    }
}

/// Whether a file left in an output directory is a job output
pub fn is_output_file(path: &Path) -> bool {
    !is_descriptor_path(path) && !path.to_string_lossy().contains(SCRATCH_MARKER)
}

/// Splits registered files into the job's log, error log and outputs
fn partition_files(job: &Job, files: Vec<File>) -> JobUpdate {
    let log_name = job.log_file_name();
    let error_log_name = job.error_log_file_name();

    let mut update = JobUpdate::default();
    let mut output = Vec::with_capacity(files.len());
    for file in files {
        if file.name == log_name {
            update.log = Some(file);
        } else if file.name == error_log_name {
            update.error_log = Some(file);
        } else {
            output.push(file);
        }
    }
    update.output = Some(output);
    update
}
