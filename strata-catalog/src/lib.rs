//! Strata Catalog
//!
//! The catalog collaborator as seen by the execution daemon.
//!
//! This crate provides:
//! - [`Catalog`]: the operations the daemon performs on jobs, folders,
//!   ACLs and output files
//! - [`InMemoryCatalog`]: a single-host implementation backed by the local
//!   filesystem, used by the daemon binary and by tests

mod catalog;
pub mod error;
mod memory;

pub use catalog::{Catalog, PathFilter};
pub use error::{CatalogError, Result};
pub use memory::InMemoryCatalog;
