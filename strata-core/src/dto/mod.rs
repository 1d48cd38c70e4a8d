//! Data Transfer Objects
//!
//! Lightweight payloads exchanged between the daemon and the catalog.

pub mod job;
