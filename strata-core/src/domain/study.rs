//! Study domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A study registered in the catalog
///
/// The fully qualified name has the form `owner@project:study`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub fqn: String,
    pub uid: u64,
    pub project_uid: u64,
    /// Physical root the study's catalog paths resolve against
    pub uri: PathBuf,
}

impl Study {
    /// User owning the study's project
    pub fn owner(&self) -> &str {
        self.fqn.split('@').next().unwrap_or(&self.fqn)
    }
}
