//! Daemon configuration
//!
//! Defines all configurable parameters for the execution daemon including
//! the polling cadence, per-cycle caps, filesystem roots and per-tool
//! concurrency ceilings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the internal CLI script under `<app_home>/bin`
const INTERNAL_CLI: &str = "strata-internal.sh";

/// Execution daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// How long to sleep between two check cycles
    pub poll_interval: Duration,

    /// Maximum number of jobs handled per queue and cycle
    pub jobs_per_cycle: usize,

    /// Installation directory; the internal CLI lives in `<app_home>/bin`
    pub app_home: PathBuf,

    /// Physical root under which default study `JOBS/` folders are created
    pub job_dir: PathBuf,

    /// Maximum number of QUEUED + RUNNING jobs per tool
    pub tool_limits: HashMap<String, u64>,

    /// Minimum time between two "admission blocked" log lines for a tool
    pub block_log_interval: Duration,

    /// JSON snapshot backing the catalog, if any
    pub catalog_snapshot: Option<PathBuf>,

    /// Process-launch backend name
    pub executor: String,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        let mut tool_limits = HashMap::new();
        tool_limits.insert("variant-index".to_string(), 1);

        Self {
            poll_interval: Duration::from_secs(5),
            jobs_per_cycle: 50,
            app_home: PathBuf::from("/opt/strata"),
            job_dir: PathBuf::from("/opt/strata/sessions/jobs"),
            tool_limits,
            block_log_interval: Duration::from_secs(60),
            catalog_snapshot: None,
            executor: "local".to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - STRATA_POLL_INTERVAL (optional, seconds, default: 5)
    /// - STRATA_JOBS_PER_CYCLE (optional, default: 50)
    /// - STRATA_APP_HOME (optional, default: /opt/strata)
    /// - STRATA_JOB_DIR (optional, default: /opt/strata/sessions/jobs)
    /// - STRATA_TOOL_LIMITS (optional, `tool=N,tool=N`, default: variant-index=1)
    /// - STRATA_BLOCK_LOG_INTERVAL (optional, seconds, default: 60)
    /// - STRATA_CATALOG_SNAPSHOT (optional)
    /// - STRATA_EXECUTOR (optional, default: local)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Some(secs) = env_parse::<u64>("STRATA_POLL_INTERVAL") {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(jobs) = env_parse::<usize>("STRATA_JOBS_PER_CYCLE") {
            config.jobs_per_cycle = jobs;
        }
        if let Ok(home) = std::env::var("STRATA_APP_HOME") {
            config.app_home = PathBuf::from(home);
        }
        if let Ok(dir) = std::env::var("STRATA_JOB_DIR") {
            config.job_dir = PathBuf::from(dir);
        }
        if let Ok(limits) = std::env::var("STRATA_TOOL_LIMITS") {
            config.tool_limits = parse_tool_limits(&limits)?;
        }
        if let Some(secs) = env_parse::<u64>("STRATA_BLOCK_LOG_INTERVAL") {
            config.block_log_interval = Duration::from_secs(secs);
        }
        if let Ok(snapshot) = std::env::var("STRATA_CATALOG_SNAPSHOT") {
            config.catalog_snapshot = Some(PathBuf::from(snapshot));
        }
        if let Ok(executor) = std::env::var("STRATA_EXECUTOR") {
            config.executor = executor;
        }

        Ok(config)
    }

    /// Sets the concurrency ceiling of a tool
    pub fn with_tool_limit(mut self, tool_id: &str, limit: u64) -> Self {
        self.tool_limits.insert(tool_id.to_string(), limit);
        self
    }

    /// Path of the internal CLI every job command starts with
    pub fn internal_cli(&self) -> PathBuf {
        self.app_home.join("bin").join(INTERNAL_CLI)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.jobs_per_cycle == 0 {
            anyhow::bail!("jobs_per_cycle must be greater than 0");
        }

        if !self.job_dir.is_absolute() {
            anyhow::bail!("job_dir must be an absolute path");
        }

        if let Some((tool, _)) = self.tool_limits.iter().find(|(_, limit)| **limit == 0) {
            anyhow::bail!("tool limit for '{}' must be greater than 0", tool);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `tool=N,tool=N` into a map of ceilings
pub fn parse_tool_limits(value: &str) -> anyhow::Result<HashMap<String, u64>> {
    let mut limits = HashMap::new();

    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (tool, limit) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid tool limit '{}', expected tool=N", entry))?;
        let limit = limit
            .trim()
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("invalid limit for tool '{}': {}", tool.trim(), e))?;
        limits.insert(tool.trim().to_string(), limit);
    }

    Ok(limits)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}
