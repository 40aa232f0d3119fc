//! Hierarchical stores for Strata result containers.
//!
//! # Architecture
//!
//! - [`MemoryStore`] keeps the group tree in memory
//! - [`FileStore`] loads a container file into a [`MemoryStore`] and
//!   rewrites it atomically on [`commit`](strata_core::Store::commit)
//! - [`ContainerBuilder`] lays out geometry, mapping and increments the
//!   way a solver writes them
//! - All file I/O uses a custom binary codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "STRA"] [VERSION u8] [name] [root group]
//! group   := [u32 n_groups] ([name] group)* [u32 n_arrays] ([name] dataset)*
//! dataset := [dtype u8] [u32 ndim] [u64 dim]* [u64 n] [element]* [attributes]
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod codec;
pub mod file;
pub mod memory;

pub use builder::ContainerBuilder;
pub use file::FileStore;
pub use memory::{Group, MemoryStore};

/// Magic bytes at the start of every container file.
pub const MAGIC: [u8; 4] = *b"STRA";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
