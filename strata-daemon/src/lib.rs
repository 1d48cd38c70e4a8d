//! Strata Execution Daemon
//!
//! Turns PENDING analysis jobs into launched processes and reconciles their
//! outcome back into the catalog.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Tools: Registry of the internal CLI subcommands jobs run
//! - Executor: Process-launch backends
//! - Services: Admission, output directories, command lines, status, finalization
//! - Scheduler: The polling loop and per-job transitions

pub mod config;
pub mod executor;
pub mod scheduler;
pub mod service;
pub mod tools;

pub use config::Config;
pub use scheduler::{CycleSummary, ExecutionDaemon};
pub use tools::ToolRegistry;
