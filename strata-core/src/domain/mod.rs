//! Core domain types
//!
//! These types represent the entities the daemon reads from and writes back
//! to the catalog. They carry structure only: persistence lives in the
//! catalog crate, lifecycle decisions in the daemon.

pub mod file;
pub mod job;
pub mod result;
pub mod status;
pub mod study;
