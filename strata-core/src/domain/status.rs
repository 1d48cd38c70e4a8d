//! Execution status types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of an execution status
///
/// Shared by jobs in the catalog and by the result descriptor a launched
/// tool writes. Names the daemon does not know deserialize as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusName {
    Pending,
    Queued,
    Running,
    Done,
    /// Legacy synonym for `Done` still reported by some tools
    Ready,
    Error,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl StatusName {
    /// Whether the job has stopped executing
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatusName::Done | StatusName::Ready | StatusName::Error | StatusName::Aborted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusName::Pending => "PENDING",
            StatusName::Queued => "QUEUED",
            StatusName::Running => "RUNNING",
            StatusName::Done => "DONE",
            StatusName::Ready => "READY",
            StatusName::Error => "ERROR",
            StatusName::Aborted => "ABORTED",
            StatusName::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for StatusName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a job: a name plus a human description and when it was set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub name: StatusName,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    /// Step the job is currently executing, if it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl ExecutionStatus {
    pub fn new(name: StatusName) -> Self {
        Self::with_description(name, "")
    }

    pub fn with_description(name: StatusName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            date: Utc::now(),
            step: None,
        }
    }
}
