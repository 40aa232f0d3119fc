//! Strata: a view, derive and placement engine for hierarchical
//! simulation result containers.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Strata sub-crates. For most users, adding `strata` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! // Two points, one phase, one increment with a deformation gradient.
//! let mut b = ContainerBuilder::new("shear", [2, 1, 1], [1.0; 3], [0.0; 3], 1);
//! b.phase_mapping("A", vec![[0, 0, 0], [1, 0, 1]]).unwrap()
//!     .increment(0, 0.0).unwrap();
//! let f = Dataset::from_float(
//!     &[2, 3, 3],
//!     vec![
//!         1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
//!         2.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
//!     ],
//! ).unwrap();
//! b.field(0, PartitionKind::Phase, "A", "F", f).unwrap();
//!
//! let results = Results::new(b.build()).unwrap();
//! let report = results.add_determinant("F").unwrap();
//! assert_eq!(report.written().count(), 1);
//!
//! let det = results.place("det(F)", Layout::default(), Constituents::All).unwrap();
//! assert_eq!(det.leaf().unwrap().as_float().unwrap(), &[1.0, 2.0]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strata-core` | Datasets, paths, lattices, errors, the `Store` trait |
//! | [`store`] | `strata-store` | In-memory and file-backed stores, container builder |
//! | [`expr`] | `strata-expr` | Formula parsing, broadcasting, function tables |
//! | [`mech`] | `strata-mech` | Tensor, continuum mechanics and orientation kernels |
//! | [`result`] | `strata-result` | Views, derived fields, placement, export |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and errors (`strata-core`).
///
/// Contains [`types::Dataset`] with its attributes, store paths and
/// group keys, [`types::Lattice`], and the [`types::Store`] trait.
pub use strata_core as types;

/// Store backends (`strata-store`).
///
/// [`store::MemoryStore`] keeps a container in memory,
/// [`store::FileStore`] persists it to a single file, and
/// [`store::ContainerBuilder`] assembles well-formed containers.
pub use strata_store as store;

/// Formula language (`strata-expr`).
///
/// Parse and validate formulas with [`expr::Formula`] and register
/// functions in an [`expr::FunctionTable`].
pub use strata_expr as expr;

/// Numeric kernels (`strata-mech`).
pub use strata_mech as mech;

/// The result view (`strata-result`).
///
/// [`result::Results`] selects, derives, reads and places fields.
pub use strata_result as result;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use strata_core::{
        Attributes, Dataset, Dtype, GroupKey, IncrementId, Lattice, PartitionKind, Store,
        StorePath,
    };

    // Errors
    pub use strata_core::{ExprError, MechError, ResultError, StoreError};

    // Stores
    pub use strata_store::{ContainerBuilder, FileStore, MemoryStore};

    // Kernel options
    pub use strata_mech::{EigenRank, MisesKind, NormOrder, StretchKind};

    // Result view
    pub use strata_result::{
        CalculationReport, Constituents, ExportMode, GridEncoder, GroupOutcome, Labels, Layout,
        Results, Tree,
    };
}
