//! Per-tool admission control
//!
//! Some tools are heavy enough that only a few of them may hold an execution
//! slot (QUEUED or RUNNING) at any time. Pending jobs of such a tool wait in
//! PENDING until a slot frees up. Waiting is not an error; the block is
//! logged at most once per interval and tool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use strata_catalog::Catalog;
use strata_core::dto::job::JobQuery;
use tracing::{error, info};

/// Active job counts gathered during one check-pending pass
///
/// Entries are dropped once a job of the tool is admitted so the next job
/// sees a fresh count.
#[derive(Debug, Default)]
pub struct ToolCountCache {
    counts: HashMap<String, u64>,
}

impl ToolCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tool_id: &str) -> Option<u64> {
        self.counts.get(tool_id).copied()
    }

    pub fn insert(&mut self, tool_id: &str, count: u64) {
        self.counts.insert(tool_id.to_string(), count);
    }

    pub fn invalidate(&mut self, tool_id: &str) {
        self.counts.remove(tool_id);
    }
}

/// Gates PENDING jobs on their tool's concurrency ceiling
pub struct AdmissionController {
    catalog: Arc<dyn Catalog>,
    limits: HashMap<String, u64>,
    block_log_interval: Duration,

    /// tool id -> last time a block was logged
    last_block_log: Mutex<HashMap<String, Instant>>,
}

impl AdmissionController {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        limits: HashMap<String, u64>,
        block_log_interval: Duration,
    ) -> Self {
        Self {
            catalog,
            limits,
            block_log_interval,
            last_block_log: Mutex::new(HashMap::new()),
        }
    }

    /// Concurrency ceiling of a tool, if it has one
    pub fn limit(&self, tool_id: &str) -> Option<u64> {
        self.limits.get(tool_id).copied()
    }

    /// Whether a job of `tool_id` may take an execution slot now
    ///
    /// A failed count keeps the job pending.
    pub async fn can_admit(&self, tool_id: &str, cache: &mut ToolCountCache) -> bool {
        let Some(limit) = self.limit(tool_id) else {
            return true;
        };

        let active = match cache.get(tool_id) {
            Some(count) => count,
            None => match self
                .catalog
                .count_jobs(&JobQuery::active_for_tool(tool_id))
                .await
            {
                Ok(count) => {
                    cache.insert(tool_id, count);
                    count
                }
                Err(e) => {
                    error!("Could not count active jobs of tool {}: {}", tool_id, e);
                    return false;
                }
            },
        };

        if active < limit {
            return true;
        }

        self.log_block(tool_id, active, limit);
        false
    }

    /// Records that a job of `tool_id` took a slot
    ///
    /// Also resets the tool's block-log throttle.
    pub fn admitted(&self, tool_id: &str, cache: &mut ToolCountCache) {
        if !self.limits.contains_key(tool_id) {
            return;
        }
        cache.invalidate(tool_id);
        if let Ok(mut last) = self.last_block_log.lock() {
            last.remove(tool_id);
        }
    }

    /// Logs a blocked admission unless one was logged recently
    ///
    /// Returns whether a line was written.
    fn log_block(&self, tool_id: &str, active: u64, limit: u64) -> bool {
        let Ok(mut last) = self.last_block_log.lock() else {
            return false;
        };

        let now = Instant::now();
        let due = last
            .get(tool_id)
            .is_none_or(|at| now.duration_since(*at) >= self.block_log_interval);
        if due {
            info!(
                "There are {} {} jobs running or queued already (limit {}). \
                 Current limit will be increased once they finish",
                active, tool_id, limit
            );
            last.insert(tool_id.to_string(), now);
        }
        due
    }
}
