//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::file::File;
use crate::domain::result::ExecutionResult;
use crate::domain::status::ExecutionStatus;

/// Attribute holding the study a job was submitted against
pub const STUDY_ATTRIBUTE: &str = "study";

/// Attribute allowing parent folders of a user-specified outdir to be created
pub const PARENTS_ATTRIBUTE: &str = "create-parent-dirs";

/// Parameter naming a user-specified output directory
pub const OUTDIR_PARAM: &str = "outdir";

/// Analysis job record
///
/// Created PENDING by the submission path and from then on mutated only by
/// the execution daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub tool_id: String,
    pub user_id: String,
    #[serde(default)]
    pub study: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub command_line: Option<String>,
    #[serde(default)]
    pub out_dir: Option<File>,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
    #[serde(default)]
    pub output: Vec<File>,
    #[serde(default)]
    pub log: Option<File>,
    #[serde(default)]
    pub error_log: Option<File>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Study the job belongs to
    ///
    /// The declared study attribute wins over the study reference; empty
    /// values count as missing.
    pub fn study_fqn(&self) -> Option<&str> {
        self.attributes
            .get(STUDY_ATTRIBUTE)
            .and_then(|v| v.as_str())
            .or(self.study.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Whether parent folders of a user-specified outdir may be created
    pub fn create_parents(&self) -> bool {
        self.attributes
            .get(PARENTS_ATTRIBUTE)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// User-specified output directory, if any
    pub fn requested_out_dir(&self) -> Option<&str> {
        self.params
            .get(OUTDIR_PARAM)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// File name the tool's stdout is redirected to
    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.id)
    }

    /// File name the tool's stderr is redirected to
    pub fn error_log_file_name(&self) -> String {
        format!("{}.err", self.id)
    }
}

/// Job priority; lower sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::StatusName;
    use serde_json::json;

    fn job() -> Job {
        Job {
            id: "job-1".to_string(),
            tool_id: "variant-index".to_string(),
            user_id: "alice".to_string(),
            study: None,
            status: ExecutionStatus::new(StatusName::Pending),
            params: HashMap::new(),
            attributes: HashMap::new(),
            command_line: None,
            out_dir: None,
            result: None,
            output: vec![],
            log: None,
            error_log: None,
            priority: Priority::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_study_attribute_wins() {
        let mut job = job();
        job.study = Some("alice@p1:s0".to_string());
        assert_eq!(job.study_fqn(), Some("alice@p1:s0"));

        job.attributes
            .insert(STUDY_ATTRIBUTE.to_string(), json!("alice@p1:s1"));
        assert_eq!(job.study_fqn(), Some("alice@p1:s1"));
    }

    #[test]
    fn test_blank_study_is_missing() {
        let mut job = job();
        job.attributes.insert(STUDY_ATTRIBUTE.to_string(), json!(" "));
        assert_eq!(job.study_fqn(), None);
    }

    #[test]
    fn test_log_file_names() {
        let job = job();
        assert_eq!(job.log_file_name(), "job-1.log");
        assert_eq!(job.error_log_file_name(), "job-1.err");
    }

    #[test]
    fn test_priority_order() {
        let mut priorities = vec![Priority::Low, Priority::Urgent, Priority::Medium, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
        );
    }
}
