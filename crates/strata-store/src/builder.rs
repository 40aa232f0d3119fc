//! Programmatic construction of well-formed containers.

use strata_core::id::{GEOMETRY, MAPPING, TIME};
use strata_core::{
    Attributes, Dataset, GroupKey, IncrementId, PartitionKind, Store, StoreError, StorePath,
    Values,
};

use crate::memory::{Group, MemoryStore};

/// Builds a container with geometry, partition mappings, increments and
/// solver fields.
///
/// Mapping rows are `(point, constituent, entry)` for phases and
/// `(point, entry)` for homogenizations: point `point` (and constituent
/// `constituent`) takes sample `entry` of the partition's fields.
///
/// # Examples
///
/// ```
/// use strata_core::{Dataset, PartitionKind, Store, StorePath};
/// use strata_store::ContainerBuilder;
///
/// let mut b = ContainerBuilder::new("demo", [2, 1, 1], [1.0, 0.5, 0.5], [0.0; 3], 1);
/// b.phase_mapping("A", vec![[0, 0, 0], [1, 0, 1]]).unwrap()
///     .increment(0, 0.0).unwrap()
///     .field(0, PartitionKind::Phase, "A", "T",
///            Dataset::from_float(&[2], vec![300.0, 310.0]).unwrap()).unwrap();
/// let store = b.build();
/// assert_eq!(store.list_arrays(&StorePath::parse("increment_0/phase/A")), vec!["T"]);
/// ```
#[derive(Debug)]
pub struct ContainerBuilder {
    store: MemoryStore,
}

impl ContainerBuilder {
    /// Start a container on a regular grid of `cells` with physical
    /// `size` and `origin`, holding `constituents` constituents per point.
    pub fn new(
        name: impl Into<String>,
        cells: [usize; 3],
        size: [f64; 3],
        origin: [f64; 3],
        constituents: usize,
    ) -> Self {
        let mut geometry = Group::new();
        geometry.insert_array(
            "cells",
            Dataset::column(Values::Int(cells.iter().map(|&c| c as i64).collect())),
        );
        geometry.insert_array("size", Dataset::column(Values::Float(size.to_vec())));
        geometry.insert_array("origin", Dataset::column(Values::Float(origin.to_vec())));
        geometry.insert_array("constituents", Dataset::scalar_int(constituents as i64));
        let mut root = Group::new();
        root.insert_group(GEOMETRY, geometry);
        Self {
            store: MemoryStore::from_root(name, root),
        }
    }

    /// Add the mapping of a phase.
    pub fn phase_mapping(
        &mut self,
        name: &str,
        rows: Vec<[usize; 3]>,
    ) -> Result<&mut Self, StoreError> {
        let n = rows.len();
        let flat = rows.into_iter().flatten().map(|v| v as i64).collect();
        self.write_mapping(PartitionKind::Phase, name, Dataset::from_int(&[n, 3], flat)?)
    }

    /// Add the mapping of a homogenization.
    pub fn homogenization_mapping(
        &mut self,
        name: &str,
        rows: Vec<[usize; 2]>,
    ) -> Result<&mut Self, StoreError> {
        let n = rows.len();
        let flat = rows.into_iter().flatten().map(|v| v as i64).collect();
        self.write_mapping(
            PartitionKind::Homogenization,
            name,
            Dataset::from_int(&[n, 2], flat)?,
        )
    }

    fn write_mapping(
        &mut self,
        kind: PartitionKind,
        name: &str,
        mapping: Dataset,
    ) -> Result<&mut Self, StoreError> {
        let path = StorePath::root()
            .join(GEOMETRY)
            .join(MAPPING)
            .join(kind.as_str())
            .join(name);
        self.store.write_array(&path, mapping, true)?;
        Ok(self)
    }

    /// Add an increment saved at simulation time `time`.
    pub fn increment(&mut self, index: u32, time: f64) -> Result<&mut Self, StoreError> {
        let path = IncrementId(index).path().join(TIME);
        let stamp = Dataset::scalar(time).with_attrs(Attributes::described("s", "time"));
        self.store.write_array(&path, stamp, true)?;
        Ok(self)
    }

    /// Add a solver field to one partition of one increment.
    pub fn field(
        &mut self,
        increment: u32,
        kind: PartitionKind,
        name: &str,
        label: &str,
        dataset: Dataset,
    ) -> Result<&mut Self, StoreError> {
        let key = GroupKey::new(IncrementId(increment), kind, name);
        self.store.write_array(&key.field(label), dataset, true)?;
        Ok(self)
    }

    /// Finish the container.
    pub fn build(self) -> MemoryStore {
        self.store
    }
}
