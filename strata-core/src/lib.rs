//! Strata Core
//!
//! Core types shared by the Strata catalog and execution daemon.
//!
//! This crate contains:
//! - Domain types: Jobs, execution statuses, catalog files and the result
//!   descriptor written by launched analysis tools
//! - DTOs: Partial job updates sent from the daemon to the catalog

pub mod domain;
pub mod dto;
