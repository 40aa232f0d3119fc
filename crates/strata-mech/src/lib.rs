//! Pure kernels that derive new fields from stored ones.
//!
//! Every kernel maps one or two [`Dataset`](strata_core::Dataset)s whose
//! leading axis counts samples to a new dataset with the same number of
//! samples. Kernels check per-sample shapes and return
//! [`MechError`](strata_core::MechError) rather than panicking; they never
//! touch a store.
//!
//! - [`tensor`]: invariants and decompositions of second-order tensors,
//!   and vector/matrix norms
//! - [`mechanics`]: stress measures, polar decomposition, stretch and
//!   Seth-Hill strain
//! - [`orientation`]: inverse-pole-figure colors and pole projections of
//!   quaternion orientation data

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod kinds;
pub mod mechanics;
pub mod orientation;
pub mod tensor;

pub use kinds::{EigenRank, MisesKind, NormOrder, StretchKind};
