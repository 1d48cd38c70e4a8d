//! Catalog file domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file or folder registered in the catalog
///
/// `path` is the catalog path relative to the study root; folder paths end
/// with `/`. `uri` is the physical location on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    pub path: String,
    pub uri: PathBuf,
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl File {
    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    File,
    Directory,
}

/// Permissions that can be granted on a catalog file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilePermission {
    View,
    ViewHeader,
    ViewContent,
    Write,
    Delete,
    Download,
    Upload,
    ViewAnnotations,
    WriteAnnotations,
    DeleteAnnotations,
}

impl FilePermission {
    /// Every permission, used to give a job owner full control of their folder
    pub fn all() -> Vec<FilePermission> {
        vec![
            FilePermission::View,
            FilePermission::ViewHeader,
            FilePermission::ViewContent,
            FilePermission::Write,
            FilePermission::Delete,
            FilePermission::Download,
            FilePermission::Upload,
            FilePermission::ViewAnnotations,
            FilePermission::WriteAnnotations,
            FilePermission::DeleteAnnotations,
        ]
    }
}

/// ACL member standing for every user without an explicit entry
pub const OTHERS_MEMBER: &str = "*";
