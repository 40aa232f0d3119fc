//! Core types and traits for the Strata result container.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Strata workspace:
//! datasets and their attributes, store paths and group identifiers,
//! lattice metadata, error types, and the [`Store`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dataset;
pub mod error;
pub mod id;
pub mod lattice;
pub mod traits;

pub use dataset::{Attributes, Dataset, Dtype, Shape, Values};
pub use error::{ExprError, MechError, ResultError, ShapeError, StoreError};
pub use id::{GroupKey, IncrementId, PartitionKind, StorePath};
pub use lattice::{CrystalFamily, Lattice};
pub use traits::{Store, WriteOutcome};
