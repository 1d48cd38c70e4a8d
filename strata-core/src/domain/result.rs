//! Result descriptor types
//!
//! A launched tool writes `<job id>.result.json` into its output directory
//! and keeps it up to date while it runs. The daemon only ever reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::status::StatusName;

/// Extension of the result descriptor
pub const RESULT_FILE_EXTENSION: &str = ".result.json";

/// Extension of the descriptor while a tool is rewriting it
pub const RESULT_SWAP_FILE_EXTENSION: &str = ".result.json.swap";

/// Self-reported state of an analysis execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub id: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub status: ResultStatus,
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
    #[serde(default)]
    pub output_files: Vec<FileResult>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub executor: Option<ExecutorInfo>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl ExecutionResult {
    /// Whether the tool reported a failed execution
    pub fn is_error(&self) -> bool {
        self.status.name == StatusName::Error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultStatus {
    pub name: StatusName,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub status: StatusName,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

/// An output file declared by the tool, relative to its output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorInfo {
    pub id: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}
