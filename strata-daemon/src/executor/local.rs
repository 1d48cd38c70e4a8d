//! Local process executor
//!
//! Runs each job as a `sh -c` child of the daemon with stdout and stderr
//! redirected to the job's log files. Child handles are kept until the
//! process is reaped; after that only its outcome is remembered, and only
//! for the retention window.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use strata_core::domain::status::StatusName;
use tracing::{debug, info, warn};

use super::{Executor, ExecutorError};

/// How long the outcome of a reaped process is reported
const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

/// What the executor knows about a launched job
enum Process {
    Running(Child),
    Exited { success: bool, at: Instant },
}

/// Executor spawning jobs as local processes
pub struct LocalExecutor {
    shell: String,
    retention: Duration,

    /// job id -> process
    processes: Mutex<HashMap<String, Process>>,
}

impl LocalExecutor {
    /// Creates an executor running commands through `sh`
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    /// Creates an executor running commands through another shell
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            retention: DEFAULT_RETENTION,
            processes: Mutex::new(HashMap::new()),
        }
    }

    fn processes(&self) -> Result<MutexGuard<'_, HashMap<String, Process>>, ExecutorError> {
        self.processes
            .lock()
            .map_err(|e| ExecutorError::Internal(format!("Failed to lock process table: {}", e)))
    }

    fn expired(&self, process: &Process) -> bool {
        matches!(process, Process::Exited { at, .. } if at.elapsed() >= self.retention)
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Reaps a running child, replacing it by its outcome once it exited
fn refresh(job_id: &str, process: &mut Process) {
    let Process::Running(child) = process else {
        return;
    };

    match child.try_wait() {
        Ok(None) => {}
        Ok(Some(exit)) => {
            if !exit.success() {
                debug!("Job {} exited with {}", job_id, exit);
            }
            *process = Process::Exited {
                success: exit.success(),
                at: Instant::now(),
            };
        }
        Err(e) => warn!("Failed to query process of job {}: {}", job_id, e),
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn launch(
        &self,
        job_id: &str,
        command_line: &str,
        stdout: &Path,
        stderr: &Path,
    ) -> Result<(), ExecutorError> {
        let mut processes = self.processes()?;

        for (id, process) in processes.iter_mut() {
            refresh(id, process);
        }
        processes.retain(|_, process| !self.expired(process));

        if matches!(processes.get(job_id), Some(Process::Running(_))) {
            return Err(ExecutorError::AlreadyRunning(job_id.to_string()));
        }

        let out = File::create(stdout).map_err(|source| ExecutorError::Redirect {
            path: stdout.to_path_buf(),
            source,
        })?;
        let err = File::create(stderr).map_err(|source| ExecutorError::Redirect {
            path: stderr.to_path_buf(),
            source,
        })?;

        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                job_id: job_id.to_string(),
                source,
            })?;

        info!("Launched job {} as process {}", job_id, child.id());
        processes.insert(job_id.to_string(), Process::Running(child));
        Ok(())
    }

    async fn status(&self, job_id: &str) -> StatusName {
        let mut processes = match self.processes() {
            Ok(processes) => processes,
            Err(e) => {
                warn!("{}", e);
                return StatusName::Unknown;
            }
        };

        let Some(process) = processes.get_mut(job_id) else {
            return StatusName::Unknown;
        };
        refresh(job_id, process);

        if self.expired(process) {
            processes.remove(job_id);
            return StatusName::Unknown;
        }
        match process {
            Process::Running(_) => StatusName::Running,
            Process::Exited { success: true, .. } => StatusName::Done,
            Process::Exited { success: false, .. } => StatusName::Error,
        }
    }
}
