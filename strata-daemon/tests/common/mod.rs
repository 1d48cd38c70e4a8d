#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata_catalog::{Catalog, CatalogError, InMemoryCatalog, PathFilter};
use strata_core::domain::file::{File, FilePermission};
use strata_core::domain::job::{Job, Priority};
use strata_core::domain::status::{ExecutionStatus, StatusName};
use strata_core::domain::study::Study;
use strata_core::dto::job::{JobQuery, JobUpdate};
use strata_daemon::executor::{Executor, ExecutorError};
use strata_daemon::{Config, ExecutionDaemon, ToolRegistry};
use tempfile::TempDir;

pub const STUDY: &str = "alice@cancer:wgs";
pub const USER: &str = "bob";
pub const USER_TOKEN: &str = "bob-secret-token";

/// A launch the fake executor received
#[derive(Debug, Clone)]
pub struct Launch {
    pub job_id: String,
    pub command_line: String,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// Executor that records launches and answers scripted statuses
#[derive(Default)]
pub struct ScriptedExecutor {
    pub launches: Mutex<Vec<Launch>>,
    pub statuses: Mutex<HashMap<String, StatusName>>,
    pub fail_launch: AtomicBool,
}

impl ScriptedExecutor {
    pub fn set_status(&self, job_id: &str, status: StatusName) {
        self.statuses
            .lock()
            .unwrap()
            .insert(job_id.to_string(), status);
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn launch(
        &self,
        job_id: &str,
        command_line: &str,
        stdout: &Path,
        stderr: &Path,
    ) -> Result<(), ExecutorError> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(ExecutorError::Internal("backend unavailable".to_string()));
        }
        self.launches.lock().unwrap().push(Launch {
            job_id: job_id.to_string(),
            command_line: command_line.to_string(),
            stdout: stdout.to_path_buf(),
            stderr: stderr.to_path_buf(),
        });
        Ok(())
    }

    async fn status(&self, job_id: &str) -> StatusName {
        self.statuses
            .lock()
            .unwrap()
            .get(job_id)
            .copied()
            .unwrap_or(StatusName::Unknown)
    }
}

/// Catalog whose job updates and listings can be made to fail
pub struct FlakyCatalog {
    pub inner: Arc<InMemoryCatalog>,
    pub fail_updates: AtomicBool,
    pub failing_listings: Mutex<Vec<StatusName>>,
}

impl FlakyCatalog {
    pub fn new(inner: Arc<InMemoryCatalog>) -> Self {
        Self {
            inner,
            fail_updates: AtomicBool::new(false),
            failing_listings: Mutex::new(vec![]),
        }
    }

    pub fn fail_listing(&self, status: StatusName) {
        self.failing_listings.lock().unwrap().push(status);
    }
}

#[async_trait]
impl Catalog for FlakyCatalog {
    async fn find_jobs(&self, query: &JobQuery) -> strata_catalog::Result<Vec<Job>> {
        let failing = self.failing_listings.lock().unwrap().clone();
        if query.statuses.iter().any(|s| failing.contains(s)) {
            return Err(CatalogError::InternalError("query timed out".to_string()));
        }
        self.inner.find_jobs(query).await
    }

    async fn count_jobs(&self, query: &JobQuery) -> strata_catalog::Result<u64> {
        self.inner.count_jobs(query).await
    }

    async fn update_job(&self, job_id: &str, update: JobUpdate) -> strata_catalog::Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(CatalogError::InternalError("database unavailable".to_string()));
        }
        self.inner.update_job(job_id, update).await
    }

    async fn user_token(&self, user_id: &str) -> strata_catalog::Result<String> {
        self.inner.user_token(user_id).await
    }

    async fn get_study(&self, study: &str) -> strata_catalog::Result<Study> {
        self.inner.get_study(study).await
    }

    async fn get_file(&self, study: &str, path: &str) -> strata_catalog::Result<File> {
        self.inner.get_file(study, path).await
    }

    async fn create_folder(
        &self,
        study: &str,
        path: &str,
        parents: bool,
        description: &str,
    ) -> strata_catalog::Result<File> {
        self.inner
            .create_folder(study, path, parents, description)
            .await
    }

    async fn link(
        &self,
        study: &str,
        uri: &Path,
        path: &str,
        parents: bool,
    ) -> strata_catalog::Result<File> {
        self.inner.link(study, uri, path, parents).await
    }

    async fn update_acl(
        &self,
        study: &str,
        path: &str,
        member: &str,
        permissions: Vec<FilePermission>,
    ) -> strata_catalog::Result<()> {
        self.inner
            .update_acl(study, path, member, permissions)
            .await
    }

    async fn sync_untracked_files(
        &self,
        study: &str,
        path: &str,
        filter: PathFilter<'_>,
    ) -> strata_catalog::Result<Vec<File>> {
        self.inner.sync_untracked_files(study, path, filter).await
    }
}

/// A study on disk, its catalog and a daemon driving it
pub struct Harness {
    pub dir: TempDir,
    pub catalog: Arc<InMemoryCatalog>,
    pub executor: Arc<ScriptedExecutor>,
    pub daemon: ExecutionDaemon,
}

pub fn config(dir: &Path) -> Config {
    let mut config = Config::new();
    config.poll_interval = Duration::from_millis(10);
    config.app_home = dir.join("app");
    config.job_dir = dir.join("jobs");
    config
}

pub fn catalog(dir: &Path) -> Arc<InMemoryCatalog> {
    let root = dir.join("study");
    std::fs::create_dir_all(&root).unwrap();

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog
        .add_study(Study {
            fqn: STUDY.to_string(),
            uid: 2,
            project_uid: 1,
            uri: root,
        })
        .unwrap();
    catalog.set_user_token(USER, USER_TOKEN).unwrap();
    catalog
}

pub fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(dir.path());
    let executor = Arc::new(ScriptedExecutor::default());
    let daemon = ExecutionDaemon::new(
        config(dir.path()),
        catalog.clone(),
        executor.clone(),
        Arc::new(ToolRegistry::builtin()),
    );

    Harness {
        dir,
        catalog,
        executor,
        daemon,
    }
}

/// Daemon over the harness' study whose catalog can be made to fail
pub fn flaky_daemon(h: &Harness) -> (Arc<FlakyCatalog>, ExecutionDaemon) {
    let catalog = Arc::new(FlakyCatalog::new(h.catalog.clone()));
    let daemon = ExecutionDaemon::new(
        config(h.dir.path()),
        catalog.clone(),
        h.executor.clone(),
        Arc::new(ToolRegistry::builtin()),
    );
    (catalog, daemon)
}

pub fn job(id: &str, tool_id: &str, status: StatusName) -> Job {
    Job {
        id: id.to_string(),
        tool_id: tool_id.to_string(),
        user_id: USER.to_string(),
        study: Some(STUDY.to_string()),
        status: ExecutionStatus::new(status),
        params: HashMap::new(),
        attributes: HashMap::new(),
        command_line: None,
        out_dir: None,
        result: None,
        output: vec![],
        log: None,
        error_log: None,
        priority: Priority::Medium,
        created_at: chrono::Utc::now(),
    }
}

/// Writes a result descriptor into a job's output directory
pub fn write_descriptor(out_dir: &Path, job_id: &str, status: &str, outputs: &[&str]) {
    let output_files: Vec<serde_json::Value> = outputs
        .iter()
        .map(|path| serde_json::json!({ "path": path, "type": "FILE" }))
        .collect();
    let descriptor = serde_json::json!({
        "id": job_id,
        "start": "2024-03-01T10:00:00Z",
        "end": "2024-03-01T10:05:00Z",
        "status": { "name": status },
        "outputFiles": output_files,
    });
    std::fs::write(
        out_dir.join(format!("{}.result.json", job_id)),
        serde_json::to_vec_pretty(&descriptor).unwrap(),
    )
    .unwrap();
}
