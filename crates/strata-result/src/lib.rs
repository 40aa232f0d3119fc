//! View, derive and placement engine over Strata result containers.
//!
//! [`Results`] is an immutable view of a container: which increments,
//! phases and homogenizations are visible, and whether existing data may
//! be modified. Through it, callers
//!
//! - narrow or widen the selection ([`Results::view`],
//!   [`Results::view_more`], [`Results::view_less`]),
//! - derive new fields in every visible group, either from a formula
//!   ([`Results::add_calculation`]) or from a built-in template
//!   (`add_stress_cauchy`, `add_norm`, `add_ipf_color`, ...), each stamped
//!   with unit, description, creator, timestamp and formula,
//! - read fields per partition ([`Results::read`]) or placed on the
//!   global point order ([`Results::place`]), and
//! - hand placed fields to a [`GridEncoder`] ([`Results::export`]).
//!
//! A locked view never changes existing data: deriving a field that
//! already exists keeps it, and renaming or removing is refused.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod calc;
mod catalog;
pub mod derived;
pub mod export;
pub mod grid;
pub mod guard;
pub mod mapping;
pub mod place;
mod results;
pub mod view;

pub use calc::{CalculationReport, GroupOutcome};
pub use export::{ExportMode, GridEncoder};
pub use grid::Grid;
pub use guard::{Clock, SystemClock};
pub use mapping::Mapping;
pub use place::{Constituents, Labels, Layout, Tree};
pub use results::Results;
pub use view::{Axis, Key, Selection, Selector};
