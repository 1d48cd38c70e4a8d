//! Output directory resolution
//!
//! Every job gets a private working directory before it is queued. Either
//! the submitter names one through the `outdir` parameter, or the daemon
//! creates `JOBS/<user>/<job id>/` under the study's jobs root.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_catalog::{Catalog, CatalogError};
use strata_core::domain::file::{File, FilePermission, OTHERS_MEMBER};
use strata_core::domain::job::Job;
use thiserror::Error;
use tracing::{debug, info};

/// Catalog path of the per-study jobs root
const JOBS_FOLDER: &str = "JOBS/";

/// Errors raised while resolving an output directory
#[derive(Debug, Error)]
pub enum OutDirError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("outdir seems not to be a directory")]
    NotADirectory,

    #[error("outdir {0} is not an empty directory")]
    NotEmpty(String),

    #[error("Directory '{0}' is not writable")]
    NotWritable(PathBuf),

    #[error("Cannot create '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Computes and creates job output directories
#[derive(Clone)]
pub struct OutputDirectoryResolver {
    catalog: Arc<dyn Catalog>,
    job_dir: PathBuf,
}

impl OutputDirectoryResolver {
    /// # Arguments
    /// * `catalog` - Catalog the folders are registered in
    /// * `job_dir` - Physical root of the default study jobs roots
    pub fn new(catalog: Arc<dyn Catalog>, job_dir: PathBuf) -> Self {
        Self { catalog, job_dir }
    }

    /// Resolves the output directory of a job, creating it if needed
    pub async fn resolve(&self, study: &str, job: &Job) -> Result<File, OutDirError> {
        match job.requested_out_dir() {
            Some(requested) => {
                self.user_out_dir(study, requested, job.create_parents())
                    .await
            }
            None => self.default_out_dir(study, job).await,
        }
    }

    async fn user_out_dir(
        &self,
        study: &str,
        requested: &str,
        parents: bool,
    ) -> Result<File, OutDirError> {
        let path = normalize_folder_path(requested);

        let folder = match self.catalog.get_file(study, &path).await {
            Ok(folder) => folder,
            Err(e) if e.is_not_found() => {
                self.catalog
                    .create_folder(study, &path, parents, "")
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

        if !folder.is_directory() {
            return Err(OutDirError::NotADirectory);
        }
        create_dir(&folder.uri)?;

        let mut entries = std::fs::read_dir(&folder.uri).map_err(|source| OutDirError::Io {
            path: folder.uri.clone(),
            source,
        })?;
        if entries.next().is_some() {
            return Err(OutDirError::NotEmpty(folder.path));
        }

        Ok(folder)
    }

    async fn default_out_dir(&self, study: &str, job: &Job) -> Result<File, OutDirError> {
        let root = self.jobs_root(study).await?;

        let user_path = format!("{}{}/", root.path, job.user_id);
        let user_folder = match self.catalog.get_file(study, &user_path).await {
            Ok(folder) => folder,
            Err(e) if e.is_not_found() => self.create_user_folder(study, &user_path, job).await?,
            Err(e) => return Err(e.into()),
        };
        create_dir(&user_folder.uri)?;

        let job_path = format!("{}{}/", user_folder.path, job.id);
        let description = format!(
            "Directory containing the results of the execution of job {}",
            job.id
        );
        let folder = self
            .catalog
            .create_folder(study, &job_path, false, &description)
            .await?;
        create_dir(&folder.uri)?;

        debug!("Job {} will write to {}", job.id, folder.uri.display());
        Ok(folder)
    }

    async fn create_user_folder(
        &self,
        study: &str,
        path: &str,
        job: &Job,
    ) -> Result<File, OutDirError> {
        let description = format!("Directory containing the jobs of {}", job.user_id);
        let folder = self
            .catalog
            .create_folder(study, path, false, &description)
            .await?;
        create_dir(&folder.uri)?;

        // Only the owner may see their jobs
        self.catalog
            .update_acl(study, path, &job.user_id, FilePermission::all())
            .await?;
        self.catalog
            .update_acl(study, path, OTHERS_MEMBER, Vec::new())
            .await?;

        info!("Created jobs folder {} for user {}", path, job.user_id);
        Ok(folder)
    }

    /// Returns the study's `JOBS/` folder, linking it on first use
    async fn jobs_root(&self, study: &str) -> Result<File, OutDirError> {
        match self.catalog.get_file(study, JOBS_FOLDER).await {
            Ok(root) => return Ok(root),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let record = self.catalog.get_study(study).await?;
        let uri = self
            .job_dir
            .join(record.owner())
            .join(record.project_uid.to_string())
            .join(record.uid.to_string())
            .join("JOBS");
        create_dir(&uri)?;
        check_writable(&uri)?;

        let root = self.catalog.link(study, &uri, "/", true).await?;
        info!("Linked jobs root {} into study {}", uri.display(), study);
        Ok(root)
    }
}

/// Turns a submitted outdir into a catalog folder path
///
/// `:` is accepted as a separator, leading separators are dropped and a
/// trailing one is added.
pub fn normalize_folder_path(requested: &str) -> String {
    let path = requested.trim().replace(':', "/");
    let path = path.trim_start_matches('/');
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

fn create_dir(path: &Path) -> Result<(), OutDirError> {
    std::fs::create_dir_all(path).map_err(|source| OutDirError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn check_writable(path: &Path) -> Result<(), OutDirError> {
    let metadata = std::fs::metadata(path).map_err(|source| OutDirError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.permissions().readonly() {
        return Err(OutDirError::NotWritable(path.to_path_buf()));
    }
    Ok(())
}
