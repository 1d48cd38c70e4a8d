//! Catalog interface
//!
//! The catalog is the store of record for studies, files and jobs. The
//! execution daemon only needs the slice of it defined here:
//! - Listing, counting and partially updating jobs
//! - Resolving, creating and linking folders
//! - Updating folder ACLs
//! - Registering files a job left in its output directory

use async_trait::async_trait;
use std::path::Path;
use strata_core::domain::file::{File, FilePermission};
use strata_core::domain::job::Job;
use strata_core::domain::study::Study;
use strata_core::dto::job::{JobQuery, JobUpdate};

use crate::error::Result;

/// Predicate over physical paths deciding which files a sync may register
pub type PathFilter<'a> = &'a (dyn Fn(&Path) -> bool + Send + Sync);

/// Catalog operations used by the execution daemon
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Finds jobs matching a query
    ///
    /// Jobs are returned sorted by priority and then creation time, both
    /// ascending.
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>>;

    /// Counts jobs matching a query
    async fn count_jobs(&self, query: &JobQuery) -> Result<u64>;

    /// Applies a partial update to a job
    ///
    /// # Arguments
    /// * `job_id` - The ID of the job to update
    /// * `update` - Fields to overwrite; `None` fields are left untouched
    async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<()>;

    /// Returns a system token acting on behalf of a user
    async fn user_token(&self, user_id: &str) -> Result<String>;

    /// Resolves a study by its fully qualified name
    async fn get_study(&self, study: &str) -> Result<Study>;

    /// Looks up a file or folder by catalog path
    async fn get_file(&self, study: &str, path: &str) -> Result<File>;

    /// Registers a new folder
    ///
    /// Only the catalog entry is created; the caller creates the physical
    /// directory.
    ///
    /// # Arguments
    /// * `study` - Study owning the folder
    /// * `path` - Catalog path of the new folder
    /// * `parents` - Whether missing parent folders may be created
    /// * `description` - Free text stored with the folder
    async fn create_folder(
        &self,
        study: &str,
        path: &str,
        parents: bool,
        description: &str,
    ) -> Result<File>;

    /// Links an existing physical directory into the catalog
    ///
    /// The directory is registered under `path` using its own name.
    async fn link(&self, study: &str, uri: &Path, path: &str, parents: bool) -> Result<File>;

    /// Sets the permissions a member holds on a file, replacing previous ones
    async fn update_acl(
        &self,
        study: &str,
        path: &str,
        member: &str,
        permissions: Vec<FilePermission>,
    ) -> Result<()>;

    /// Registers files under a folder that the catalog does not track yet
    ///
    /// Returns every tracked file under the folder accepted by `filter`,
    /// so repeating a sync yields the same set.
    async fn sync_untracked_files(
        &self,
        study: &str,
        path: &str,
        filter: PathFilter<'_>,
    ) -> Result<Vec<File>>;
}
