//! Job DTOs

use serde::{Deserialize, Serialize};

use crate::domain::file::File;
use crate::domain::job::Job;
use crate::domain::result::ExecutionResult;
use crate::domain::status::{ExecutionStatus, StatusName};

/// Partial update of a job
///
/// Only the fields that are `Some` are written; everything else keeps its
/// stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    pub status: Option<ExecutionStatus>,
    pub command_line: Option<String>,
    pub out_dir: Option<File>,
    pub result: Option<ExecutionResult>,
    pub output: Option<Vec<File>>,
    pub log: Option<File>,
    pub error_log: Option<File>,
}

impl JobUpdate {
    pub fn status(status: ExecutionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn result(result: ExecutionResult) -> Self {
        Self {
            result: Some(result),
            ..Default::default()
        }
    }

    /// Writes the set fields into a job record
    pub fn apply_to(self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(command_line) = self.command_line {
            job.command_line = Some(command_line);
        }
        if let Some(out_dir) = self.out_dir {
            job.out_dir = Some(out_dir);
        }
        if let Some(result) = self.result {
            job.result = Some(result);
        }
        if let Some(output) = self.output {
            job.output = output;
        }
        if let Some(log) = self.log {
            job.log = Some(log);
        }
        if let Some(error_log) = self.error_log {
            job.error_log = Some(error_log);
        }
    }
}

/// Filter for listing and counting jobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobQuery {
    /// Matches any of these statuses; empty matches all
    pub statuses: Vec<StatusName>,
    pub tool_id: Option<String>,
}

impl JobQuery {
    pub fn with_status(status: StatusName) -> Self {
        Self {
            statuses: vec![status],
            tool_id: None,
        }
    }

    /// Jobs of a tool that hold an execution slot
    pub fn active_for_tool(tool_id: &str) -> Self {
        Self {
            statuses: vec![StatusName::Queued, StatusName::Running],
            tool_id: Some(tool_id.to_string()),
        }
    }
}
