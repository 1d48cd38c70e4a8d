//! In-memory catalog
//!
//! Reference implementation of [`Catalog`] for a single host. Catalog
//! records live in memory behind a mutex and can be mirrored to a JSON
//! snapshot so a daemon restart picks up where it left off. Folder URIs
//! point at real directories on the local filesystem.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use strata_core::domain::file::{File, FilePermission, FileType};
use strata_core::domain::job::Job;
use strata_core::domain::study::Study;
use strata_core::dto::job::{JobQuery, JobUpdate};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::catalog::{Catalog, PathFilter};
use crate::error::{CatalogError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    studies: HashMap<String, StudyRecord>,
    jobs: HashMap<String, Job>,
    tokens: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StudyRecord {
    study: Study,
    files: BTreeMap<String, File>,
    /// path -> member -> permissions
    acls: BTreeMap<String, BTreeMap<String, Vec<FilePermission>>>,
}

impl State {
    fn study(&self, fqn: &str) -> Result<&StudyRecord> {
        self.studies
            .get(fqn)
            .ok_or_else(|| CatalogError::StudyNotFound(fqn.to_string()))
    }

    fn study_mut(&mut self, fqn: &str) -> Result<&mut StudyRecord> {
        self.studies
            .get_mut(fqn)
            .ok_or_else(|| CatalogError::StudyNotFound(fqn.to_string()))
    }
}

impl StudyRecord {
    fn find(&self, path: &str) -> Option<&File> {
        let path = path.trim().trim_start_matches('/');
        self.files
            .get(path)
            .or_else(|| self.files.get(&folder_path(path)))
    }

    fn create_folder(&mut self, path: &str, parents: bool, description: &str) -> Result<File> {
        let path = folder_path(path);
        if path.is_empty() || self.files.contains_key(&path) {
            return Err(CatalogError::AlreadyExists(path));
        }

        let parent_path = parent_path(&path);
        let parent = match self.files.get(&parent_path) {
            Some(parent) => parent.clone(),
            None if parents => self.create_folder(&parent_path, true, "")?,
            None => return Err(CatalogError::FileNotFound(parent_path)),
        };
        if !parent.is_directory() {
            return Err(CatalogError::InvalidRequest(format!(
                "Parent '{}' is not a folder",
                parent.path
            )));
        }

        let uri = parent.uri.join(leaf_name(&path));
        let folder = new_file(&path, uri, FileType::Directory, description);
        self.files.insert(path, folder.clone());
        Ok(folder)
    }
}

/// Catalog held in memory, optionally mirrored to a JSON snapshot
pub struct InMemoryCatalog {
    state: Mutex<State>,
    snapshot: Option<PathBuf>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog that is never persisted
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            snapshot: None,
        }
    }

    /// Opens a catalog mirrored to `snapshot`, loading it if it exists
    pub fn open(snapshot: impl Into<PathBuf>) -> Result<Self> {
        let snapshot = snapshot.into();
        let state = if snapshot.exists() {
            let content = std::fs::read_to_string(&snapshot)?;
            let state: State = serde_json::from_str(&content)?;
            info!(
                "Loaded catalog snapshot {} ({} studies, {} jobs)",
                snapshot.display(),
                state.studies.len(),
                state.jobs.len()
            );
            state
        } else {
            info!("Catalog snapshot {} not found, starting empty", snapshot.display());
            State::default()
        };

        Ok(Self {
            state: Mutex::new(state),
            snapshot: Some(snapshot),
        })
    }

    /// Registers a study together with its root folder
    pub fn add_study(&self, study: Study) -> Result<()> {
        let mut state = self.lock()?;
        let root = new_file("", study.uri.clone(), FileType::Directory, "Study root");
        let mut files = BTreeMap::new();
        files.insert(String::new(), root);
        state.studies.insert(
            study.fqn.clone(),
            StudyRecord {
                study,
                files,
                acls: BTreeMap::new(),
            },
        );
        self.persist(&state)
    }

    /// Registers a job, replacing any job with the same id
    pub fn add_job(&self, job: Job) -> Result<()> {
        let mut state = self.lock()?;
        state.jobs.insert(job.id.clone(), job);
        self.persist(&state)
    }

    /// Sets the system token handed out for a user
    pub fn set_user_token(&self, user_id: &str, token: &str) -> Result<()> {
        let mut state = self.lock()?;
        state
            .tokens
            .insert(user_id.to_string(), token.to_string());
        self.persist(&state)
    }

    /// Returns a job by id
    pub fn job(&self, job_id: &str) -> Result<Job> {
        let state = self.lock()?;
        state
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| CatalogError::JobNotFound(job_id.to_string()))
    }

    /// Returns every file and folder registered in a study
    pub fn files(&self, study: &str) -> Result<Vec<File>> {
        let state = self.lock()?;
        Ok(state.study(study)?.files.values().cloned().collect())
    }

    /// Returns the permissions a member holds on a path, if any were set
    pub fn acl(&self, study: &str, path: &str, member: &str) -> Result<Option<Vec<FilePermission>>> {
        let state = self.lock()?;
        let record = state.study(study)?;
        Ok(record
            .acls
            .get(&folder_path(path))
            .or_else(|| record.acls.get(path))
            .and_then(|members| members.get(member))
            .cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| CatalogError::InternalError(format!("Failed to lock catalog state: {}", e)))
    }

    fn persist(&self, state: &State) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let tmp = snapshot.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, snapshot)?;
        Ok(())
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>> {
        let state = self.lock()?;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| matches_query(job, query))
            .cloned()
            .collect();

        jobs.sort_by(|a, b| {
            (a.priority, a.created_at, &a.id).cmp(&(b.priority, b.created_at, &b.id))
        });
        Ok(jobs)
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64> {
        let state = self.lock()?;
        Ok(state
            .jobs
            .values()
            .filter(|job| matches_query(job, query))
            .count() as u64)
    }

    async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| CatalogError::JobNotFound(job_id.to_string()))?;
        update.apply_to(job);
        debug!("Job {} updated (status {})", job_id, job.status.name);

        self.persist(&state)
    }

    async fn user_token(&self, user_id: &str) -> Result<String> {
        let state = self.lock()?;
        state
            .tokens
            .get(user_id)
            .cloned()
            .ok_or_else(|| CatalogError::NoToken(user_id.to_string()))
    }

    async fn get_study(&self, study: &str) -> Result<Study> {
        let state = self.lock()?;
        Ok(state.study(study)?.study.clone())
    }

    async fn get_file(&self, study: &str, path: &str) -> Result<File> {
        let state = self.lock()?;
        state
            .study(study)?
            .find(path)
            .cloned()
            .ok_or_else(|| CatalogError::FileNotFound(path.to_string()))
    }

    async fn create_folder(
        &self,
        study: &str,
        path: &str,
        parents: bool,
        description: &str,
    ) -> Result<File> {
        let mut state = self.lock()?;
        let folder = state
            .study_mut(study)?
            .create_folder(path, parents, description)?;
        debug!("Registered folder {} in study {}", folder.path, study);

        self.persist(&state)?;
        Ok(folder)
    }

    async fn link(&self, study: &str, uri: &Path, path: &str, parents: bool) -> Result<File> {
        if !uri.is_dir() {
            return Err(CatalogError::InvalidRequest(format!(
                "'{}' is not a directory",
                uri.display()
            )));
        }
        let name = uri
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                CatalogError::InvalidRequest(format!("'{}' has no name", uri.display()))
            })?;

        let mut state = self.lock()?;
        let record = state.study_mut(study)?;

        let destination = folder_path(path);
        let linked_path = format!("{}{}/", destination, name);
        if let Some(existing) = record.files.get(&linked_path) {
            if existing.uri == uri {
                return Ok(existing.clone());
            }
            return Err(CatalogError::AlreadyExists(linked_path));
        }

        if !record.files.contains_key(&destination) {
            if !parents {
                return Err(CatalogError::FileNotFound(destination));
            }
            record.create_folder(&destination, true, "")?;
        }

        let folder = new_file(&linked_path, uri.to_path_buf(), FileType::Directory, "");
        record.files.insert(linked_path, folder.clone());
        info!("Linked {} as {} in study {}", uri.display(), folder.path, study);

        self.persist(&state)?;
        Ok(folder)
    }

    async fn update_acl(
        &self,
        study: &str,
        path: &str,
        member: &str,
        mut permissions: Vec<FilePermission>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let record = state.study_mut(study)?;
        let file_path = record
            .find(path)
            .map(|f| f.path.clone())
            .ok_or_else(|| CatalogError::FileNotFound(path.to_string()))?;

        permissions.sort();
        permissions.dedup();
        record
            .acls
            .entry(file_path)
            .or_default()
            .insert(member.to_string(), permissions);

        self.persist(&state)
    }

    async fn sync_untracked_files(
        &self,
        study: &str,
        path: &str,
        filter: PathFilter<'_>,
    ) -> Result<Vec<File>> {
        let mut state = self.lock()?;
        let record = state.study_mut(study)?;
        let folder = record
            .find(path)
            .cloned()
            .ok_or_else(|| CatalogError::FileNotFound(path.to_string()))?;
        if !folder.is_directory() {
            return Err(CatalogError::InvalidRequest(format!(
                "'{}' is not a folder",
                folder.path
            )));
        }

        let mut registered = 0;
        for entry in WalkDir::new(&folder.uri).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let physical = entry.path();
            if !filter(physical) {
                continue;
            }

            let relative = physical
                .strip_prefix(&folder.uri)
                .map_err(|e| CatalogError::InternalError(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            let (catalog_path, file_type) = if entry.file_type().is_dir() {
                (format!("{}{}/", folder.path, relative), FileType::Directory)
            } else {
                (format!("{}{}", folder.path, relative), FileType::File)
            };

            if record.files.contains_key(&catalog_path) {
                continue;
            }
            let file = new_file(&catalog_path, physical.to_path_buf(), file_type, "");
            record.files.insert(catalog_path, file);
            registered += 1;
        }

        let tracked: Vec<File> = record
            .files
            .values()
            .filter(|f| {
                f.file_type == FileType::File
                    && f.path.starts_with(&folder.path)
                    && filter(f.uri.as_path())
            })
            .cloned()
            .collect();

        if registered > 0 {
            debug!(
                "Registered {} untracked file(s) under {} in study {}",
                registered, folder.path, study
            );
            self.persist(&state)?;
        }
        Ok(tracked)
    }
}

fn matches_query(job: &Job, query: &JobQuery) -> bool {
    (query.statuses.is_empty() || query.statuses.contains(&job.status.name))
        && query
            .tool_id
            .as_ref()
            .is_none_or(|tool_id| &job.tool_id == tool_id)
}

fn new_file(path: &str, uri: PathBuf, file_type: FileType, description: &str) -> File {
    let trimmed = path.trim_end_matches('/');
    File {
        id: trimmed.replace('/', ":"),
        name: leaf_name(path).to_string(),
        path: path.to_string(),
        uri,
        file_type,
        description: description.to_string(),
        created_at: Utc::now(),
    }
}

/// Normalizes a folder path: no leading separator, one trailing separator
fn folder_path(path: &str) -> String {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

fn parent_path(folder: &str) -> String {
    let without = folder.trim_end_matches('/');
    match without.rfind('/') {
        Some(idx) => without[..=idx].to_string(),
        None => String::new(),
    }
}

fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use strata_core::domain::job::Priority;
    use strata_core::domain::status::{ExecutionStatus, StatusName};
    use tempfile::TempDir;

    const STUDY: &str = "alice@cancer:wgs";

    fn study(root: &Path) -> Study {
        Study {
            fqn: STUDY.to_string(),
            uid: 2,
            project_uid: 1,
            uri: root.to_path_buf(),
        }
    }

    fn job(id: &str, status: StatusName, priority: Priority, age_secs: i64) -> Job {
        Job {
            id: id.to_string(),
            tool_id: "variant-index".to_string(),
            user_id: "alice".to_string(),
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
            priority,
            created_at: Utc::now() - chrono::Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(folder_path("/JOBS/alice"), "JOBS/alice/");
        assert_eq!(folder_path("JOBS/"), "JOBS/");
        assert_eq!(folder_path("/"), "");
        assert_eq!(parent_path("JOBS/alice/"), "JOBS/");
        assert_eq!(parent_path("JOBS/"), "");
        assert_eq!(leaf_name("JOBS/alice/"), "alice");
        assert_eq!(leaf_name("data/a.vcf"), "a.vcf");
    }

    #[tokio::test]
    async fn test_find_jobs_sorted_by_priority_then_age() {
        let catalog = InMemoryCatalog::new();
        catalog.add_job(job("old-low", StatusName::Pending, Priority::Low, 100)).unwrap();
        catalog.add_job(job("new-high", StatusName::Pending, Priority::High, 1)).unwrap();
        catalog.add_job(job("old-high", StatusName::Pending, Priority::High, 50)).unwrap();
        catalog.add_job(job("running", StatusName::Running, Priority::Urgent, 10)).unwrap();

        let jobs = catalog
            .find_jobs(&JobQuery::with_status(StatusName::Pending))
            .await
            .unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();

        assert_eq!(ids, vec!["old-high", "new-high", "old-low"]);
    }

    #[tokio::test]
    async fn test_count_active_jobs_for_tool() {
        let catalog = InMemoryCatalog::new();
        catalog.add_job(job("a", StatusName::Queued, Priority::Medium, 3)).unwrap();
        catalog.add_job(job("b", StatusName::Running, Priority::Medium, 2)).unwrap();
        catalog.add_job(job("c", StatusName::Done, Priority::Medium, 1)).unwrap();
        let mut other = job("d", StatusName::Running, Priority::Medium, 1);
        other.tool_id = "alignment-index".to_string();
        catalog.add_job(other).unwrap();

        let count = catalog
            .count_jobs(&JobQuery::active_for_tool("variant-index"))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_create_folder_requires_parent_unless_requested() {
        let dir = TempDir::new().unwrap();
        let catalog = InMemoryCatalog::new();
        catalog.add_study(study(dir.path())).unwrap();

        let err = catalog
            .create_folder(STUDY, "results/run1/", false, "")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let folder = catalog
            .create_folder(STUDY, "results/run1", true, "run")
            .await
            .unwrap();
        assert_eq!(folder.path, "results/run1/");
        assert_eq!(folder.uri, dir.path().join("results").join("run1"));

        let parent = catalog.get_file(STUDY, "results").await.unwrap();
        assert!(parent.is_directory());
    }

    #[tokio::test]
    async fn test_link_resolves_children_against_linked_uri() {
        let root = TempDir::new().unwrap();
        let jobs_root = TempDir::new().unwrap();
        let jobs_dir = jobs_root.path().join("JOBS");
        std::fs::create_dir_all(&jobs_dir).unwrap();

        let catalog = InMemoryCatalog::new();
        catalog.add_study(study(root.path())).unwrap();

        let linked = catalog.link(STUDY, &jobs_dir, "/", true).await.unwrap();
        assert_eq!(linked.path, "JOBS/");

        let again = catalog.link(STUDY, &jobs_dir, "/", true).await.unwrap();
        assert_eq!(again, linked);

        let user = catalog
            .create_folder(STUDY, "JOBS/alice/", false, "")
            .await
            .unwrap();
        assert_eq!(user.uri, jobs_dir.join("alice"));
    }

    #[tokio::test]
    async fn test_update_acl_replaces_permissions() {
        let dir = TempDir::new().unwrap();
        let catalog = InMemoryCatalog::new();
        catalog.add_study(study(dir.path())).unwrap();
        catalog.create_folder(STUDY, "shared/", false, "").await.unwrap();

        catalog
            .update_acl(STUDY, "shared/", "bob", FilePermission::all())
            .await
            .unwrap();
        catalog
            .update_acl(STUDY, "shared/", "bob", vec![FilePermission::View])
            .await
            .unwrap();

        assert_eq!(
            catalog.acl(STUDY, "shared/", "bob").unwrap(),
            Some(vec![FilePermission::View])
        );
        assert_eq!(catalog.acl(STUDY, "shared/", "carol").unwrap(), None);
    }

    #[tokio::test]
    async fn test_sync_untracked_files_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let catalog = InMemoryCatalog::new();
        catalog.add_study(study(dir.path())).unwrap();
        let out = catalog.create_folder(STUDY, "out/", false, "").await.unwrap();
        std::fs::create_dir_all(out.uri.join("scratch_1")).unwrap();
        std::fs::write(out.uri.join("a.txt"), "a").unwrap();
        std::fs::write(out.uri.join("skip.json"), "{}").unwrap();
        std::fs::write(out.uri.join("scratch_1").join("tmp"), "t").unwrap();

        let filter = |p: &Path| {
            let s = p.to_string_lossy();
            !s.ends_with(".json") && !s.contains("/scratch_")
        };

        let first = catalog.sync_untracked_files(STUDY, "out/", &filter).await.unwrap();
        let second = catalog.sync_untracked_files(STUDY, "out/", &filter).await.unwrap();

        let paths: Vec<&str> = first.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["out/a.txt"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("catalog.json");

        {
            let catalog = InMemoryCatalog::open(&snapshot).unwrap();
            catalog.add_study(study(dir.path())).unwrap();
            catalog.add_job(job("j1", StatusName::Pending, Priority::Medium, 0)).unwrap();
            catalog
                .update_job(
                    "j1",
                    JobUpdate::status(ExecutionStatus::new(StatusName::Queued)),
                )
                .await
                .unwrap();
        }

        let reopened = InMemoryCatalog::open(&snapshot).unwrap();
        assert_eq!(reopened.job("j1").unwrap().status.name, StatusName::Queued);
        assert_eq!(reopened.get_study(STUDY).await.unwrap().uid, 2);
    }
}
