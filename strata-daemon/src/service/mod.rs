//! Service layer
//!
//! Services hold the decisions the daemon makes about a single job: whether
//! it may take a slot, where it writes, how it is invoked, what state it is
//! really in and how it is closed. The poll loop only sequences them.

pub mod admission;
pub mod command;
pub mod descriptor;
pub mod finalizer;
pub mod outdir;
pub mod status;

pub use admission::{AdmissionController, ToolCountCache};
pub use command::{CommandBuilder, CommandLine, REDACTED_TOKEN};
pub use descriptor::{DescriptorLoader, DescriptorReader, FsDescriptorLoader};
pub use finalizer::Finalizer;
pub use outdir::{OutDirError, OutputDirectoryResolver};
pub use status::StatusResolver;
