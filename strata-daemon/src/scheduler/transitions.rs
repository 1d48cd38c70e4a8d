//! Per-job transitions
//!
//! Each check returns 1 when the job was moved forward (or aborted) and 0
//! when it was left as it was. Failures are logged and never propagated so
//! one job cannot block the rest of a sweep.

use serde_json::Value;
use strata_core::domain::job::{Job, OUTDIR_PARAM};
use strata_core::domain::status::{ExecutionStatus, StatusName};
use strata_core::dto::job::JobUpdate;
use tracing::{error, info, warn};

use super::daemon::ExecutionDaemon;
use crate::service::ToolCountCache;

impl ExecutionDaemon {
    /// Admits a PENDING job: PENDING -> QUEUED, then launch
    pub async fn check_pending_job(&self, job: &Job, cache: &mut ToolCountCache) -> u32 {
        let Some(study) = job.study_fqn() else {
            return self
                .abort_job(job, "Missing mandatory 'study' field")
                .await;
        };

        if !self.tools.contains(&job.tool_id) {
            return self
                .abort_job(job, &format!("Tool id '{}' not found.", job.tool_id))
                .await;
        }

        if !self.admission.can_admit(&job.tool_id, cache).await {
            return 0;
        }

        let token = match self.catalog.user_token(&job.user_id).await {
            Ok(token) => token,
            Err(e) => {
                error!("{} - Could not obtain token for user {}: {}", job.id, job.user_id, e);
                return self
                    .abort_job(
                        job,
                        &format!(
                            "Internal error. Could not obtain token for user '{}'",
                            job.user_id
                        ),
                    )
                    .await;
            }
        };

        let out_dir = match self.outdirs.resolve(study, job).await {
            Ok(out_dir) => out_dir,
            Err(e) => {
                return self
                    .abort_job(job, &format!("Cannot create output directory. {}", e))
                    .await;
            }
        };

        let mut params = job.params.clone();
        params.insert(
            OUTDIR_PARAM.to_string(),
            Value::String(out_dir.uri.to_string_lossy().into_owned()),
        );
        let command = match self.commands.build(&job.tool_id, &params, &token) {
            Ok(command) => command,
            Err(e) => return self.abort_job(job, &e.to_string()).await,
        };

        let stdout = out_dir.uri.join(job.log_file_name());
        let stderr = out_dir.uri.join(job.error_log_file_name());

        // Persisted before the launch; a crash in between leaves a QUEUED
        // job without a process.
        let update = JobUpdate {
            status: Some(ExecutionStatus::new(StatusName::Queued)),
            command_line: Some(command.redacted),
            out_dir: Some(out_dir),
            ..Default::default()
        };
        if let Err(e) = self.catalog.update_job(&job.id, update).await {
            error!("{} - Catastrophic error. Could not queue job: {}", job.id, e);
            return 0;
        }
        self.admission.admitted(&job.tool_id, cache);

        info!("{} - Running job", job.id);
        if let Err(e) = self
            .executor
            .launch(&job.id, &command.authenticated, &stdout, &stderr)
            .await
        {
            error!("{} - Error executing job: {}", job.id, e);
            return self
                .abort_job(job, &format!("Error executing job. {}", e))
                .await;
        }

        1
    }

    /// Reconciles a QUEUED job
    pub async fn check_queued_job(&self, job: &Job) -> u32 {
        let status = self.status.current_status(job).await;

        match status.name {
            StatusName::Queued => 0,
            StatusName::Running => {
                info!("{} - Updating status from QUEUED to RUNNING", job.id);
                self.set_status(job, status).await
            }
            name if name.is_terminal() => {
                info!("{} - Updating status from QUEUED to {}", job.id, name);
                self.finalizer.finalize(job).await
            }
            other => {
                info!(
                    "{} - Unexpected status {} for QUEUED job. {}",
                    job.id, other, status.description
                );
                0
            }
        }
    }

    /// Reconciles a RUNNING job
    pub async fn check_running_job(&self, job: &Job) -> u32 {
        let status = self.status.current_status(job).await;

        match status.name {
            StatusName::Running => {
                self.refresh_result(job).await;
                1
            }
            name if name.is_terminal() => {
                info!("{} - Updating status from RUNNING to {}", job.id, name);
                self.finalizer.finalize(job).await
            }
            StatusName::Queued => {
                info!("{} - Status back to QUEUED", job.id);
                self.set_status(job, status).await
            }
            other => {
                info!(
                    "{} - Unexpected status {} for RUNNING job. {}",
                    job.id, other, status.description
                );
                0
            }
        }
    }

    /// Moves a job to ABORTED
    pub async fn abort_job(&self, job: &Job, description: &str) -> u32 {
        info!("{} - Aborting job: {}", job.id, description);
        self.set_status(
            job,
            ExecutionStatus::with_description(StatusName::Aborted, description),
        )
        .await
    }

    /// Persists a new status
    ///
    /// Returns 1 on success. On failure the job keeps its stored status and
    /// is checked again on the next cycle.
    pub async fn set_status(&self, job: &Job, status: ExecutionStatus) -> u32 {
        let name = status.name;
        match self.catalog.update_job(&job.id, JobUpdate::status(status)).await {
            Ok(()) => 1,
            Err(e) => {
                error!(
                    "{} - Catastrophic error. Could not set status to {}: {}",
                    job.id, name, e
                );
                0
            }
        }
    }

    /// Stores the latest descriptor snapshot of a running job
    async fn refresh_result(&self, job: &Job) {
        let Some(out_dir) = &job.out_dir else {
            return;
        };
        let Some(result) = self.reader.read_in(&out_dir.uri).await else {
            return;
        };
        if let Err(e) = self.catalog.update_job(&job.id, JobUpdate::result(result)).await {
            warn!("{} - Could not update job result: {}", job.id, e);
        }
    }
}
