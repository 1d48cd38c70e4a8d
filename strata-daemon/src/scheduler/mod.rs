//! Scheduler layer for the daemon
//!
//! This layer drives the polling loop and the per-job state transitions.
//! It sequences the services but holds no job state between cycles apart
//! from the admission log throttle.

mod daemon;
mod transitions;

pub use daemon::{CycleSummary, ExecutionDaemon};
