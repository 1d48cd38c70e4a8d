//! Execution daemon
//!
//! Sleeps for the poll interval, then sweeps the PENDING, QUEUED and
//! RUNNING queues in that fixed order. Each sweep handles at most
//! `jobs_per_cycle` jobs. A failing cycle is logged and the loop goes on;
//! only the shutdown token stops it.

use anyhow::{Context as AnyhowContext, Result};
use std::sync::Arc;
use strata_catalog::Catalog;
use strata_core::domain::job::Job;
use strata_core::domain::status::StatusName;
use strata_core::dto::job::JobQuery;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::executor::Executor;
use crate::service::{
    AdmissionController, CommandBuilder, DescriptorReader, Finalizer, OutputDirectoryResolver,
    StatusResolver, ToolCountCache,
};
use crate::tools::ToolRegistry;

/// Number of jobs each sweep of a cycle moved forward
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub pending: u32,
    pub queued: u32,
    pub running: u32,
}

/// Polling loop driving jobs from PENDING to a terminal status
pub struct ExecutionDaemon {
    pub(super) config: Config,
    pub(super) catalog: Arc<dyn Catalog>,
    pub(super) executor: Arc<dyn Executor>,
    pub(super) tools: Arc<ToolRegistry>,
    pub(super) admission: AdmissionController,
    pub(super) outdirs: OutputDirectoryResolver,
    pub(super) commands: CommandBuilder,
    pub(super) reader: DescriptorReader,
    pub(super) status: StatusResolver,
    pub(super) finalizer: Finalizer,
    shutdown: CancellationToken,
}

impl ExecutionDaemon {
    /// Creates a new execution daemon
    ///
    /// # Arguments
    /// * `config` - Daemon configuration
    /// * `catalog` - Store of record for jobs and files
    /// * `executor` - Backend the job processes are launched with
    /// * `tools` - Tool id to CLI fragment lookup
    pub fn new(
        config: Config,
        catalog: Arc<dyn Catalog>,
        executor: Arc<dyn Executor>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let reader = DescriptorReader::default();

        Self {
            admission: AdmissionController::new(
                catalog.clone(),
                config.tool_limits.clone(),
                config.block_log_interval,
            ),
            outdirs: OutputDirectoryResolver::new(catalog.clone(), config.job_dir.clone()),
            commands: CommandBuilder::new(config.internal_cli(), tools.clone()),
            status: StatusResolver::new(executor.clone(), reader.clone()),
            finalizer: Finalizer::new(catalog.clone(), reader.clone()),
            reader,
            config,
            catalog,
            executor,
            tools,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs cycles until the shutdown token is cancelled
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting execution daemon (interval: {:?}, jobs per cycle: {})",
            self.config.poll_interval, self.config.jobs_per_cycle
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Execution daemon stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            let summary = self.check_jobs().await;
            debug!("Cycle finished: {:?}", summary);
        }
    }

    /// Runs a single cycle
    ///
    /// A queue that cannot be listed is logged and skipped; the other
    /// queues are still swept.
    pub async fn check_jobs(&self) -> CycleSummary {
        // Every queue is listed up front so a job moved by one sweep is not
        // picked up again by the next sweep of the same cycle
        let pending = self.listed(StatusName::Pending).await;
        let queued = self.listed(StatusName::Queued).await;
        let running = self.listed(StatusName::Running).await;
        info!(
            "----- EXECUTION DAEMON ----- pending={}, queued={}, running={}",
            pending.len(),
            queued.len(),
            running.len()
        );

        CycleSummary {
            pending: self.sweep_pending(pending).await,
            queued: self.sweep_queued(queued).await,
            running: self.sweep_running(running).await,
        }
    }

    /// Tries to admit PENDING jobs
    pub async fn check_pending_jobs(&self) -> Result<u32> {
        let jobs = self.jobs_with_status(StatusName::Pending).await?;
        Ok(self.sweep_pending(jobs).await)
    }

    /// Reconciles QUEUED jobs with their actual state
    pub async fn check_queued_jobs(&self) -> Result<u32> {
        let jobs = self.jobs_with_status(StatusName::Queued).await?;
        Ok(self.sweep_queued(jobs).await)
    }

    /// Reconciles RUNNING jobs with their actual state
    pub async fn check_running_jobs(&self) -> Result<u32> {
        let jobs = self.jobs_with_status(StatusName::Running).await?;
        Ok(self.sweep_running(jobs).await)
    }

    async fn sweep_pending(&self, jobs: Vec<Job>) -> u32 {
        let mut cache = ToolCountCache::new();
        let mut handled: u32 = 0;
        for job in jobs {
            if handled as usize >= self.config.jobs_per_cycle {
                break;
            }
            handled += self.check_pending_job(&job, &mut cache).await;
        }
        handled
    }

    async fn sweep_queued(&self, jobs: Vec<Job>) -> u32 {
        let mut handled: u32 = 0;
        for job in jobs {
            if handled as usize >= self.config.jobs_per_cycle {
                break;
            }
            handled += self.check_queued_job(&job).await;
        }
        handled
    }

    async fn sweep_running(&self, jobs: Vec<Job>) -> u32 {
        let mut handled: u32 = 0;
        for job in jobs {
            if handled as usize >= self.config.jobs_per_cycle {
                break;
            }
            handled += self.check_running_job(&job).await;
        }
        handled
    }

    async fn listed(&self, status: StatusName) -> Vec<Job> {
        self.jobs_with_status(status).await.unwrap_or_else(|e| {
            error!("Error during execution cycle: {:#}", e);
            vec![]
        })
    }

    async fn jobs_with_status(&self, status: StatusName) -> Result<Vec<Job>> {
        self.catalog
            .find_jobs(&JobQuery::with_status(status))
            .await
            .with_context(|| format!("Failed to fetch {} jobs", status))
    }
}

