//! Constituent mapping: which sample of which partition sits at which
//! material point.

use indexmap::IndexMap;
use strata_core::id::{GEOMETRY, MAPPING};
use strata_core::{PartitionKind, ResultError, Store, StorePath};

use crate::grid::missing;

/// Precomputed scatter for one partition and constituent: sample
/// `from[i]` of the partition's field belongs at point `at[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gather {
    /// Destination points.
    pub at: Vec<usize>,
    /// Source samples.
    pub from: Vec<usize>,
}

impl Gather {
    /// Number of points covered.
    pub fn len(&self) -> usize {
        self.at.len()
    }

    /// Returns `true` if no point is covered.
    pub fn is_empty(&self) -> bool {
        self.at.is_empty()
    }
}

/// The container's constituent mapping, read once from
/// `geometry/mapping`.
///
/// Phase rows are `(point, constituent, entry)`, homogenization rows
/// `(point, entry)`. The mapping is shared by all increments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    constituents: usize,
    phases: IndexMap<String, Vec<[usize; 3]>>,
    homogenizations: IndexMap<String, Vec<[usize; 2]>>,
}

impl Mapping {
    /// Read the mapping and check it against `points` material points.
    pub fn load<S: Store + ?Sized>(store: &S, points: usize) -> Result<Self, ResultError> {
        let geometry = StorePath::root().join(GEOMETRY);
        let constituents = store
            .read_array(&geometry.join("constituents"))
            .and_then(|d| d.as_int().and_then(|v| v.first().copied()))
            .ok_or_else(|| missing(format!("{geometry}/constituents not found")))?;
        let constituents = usize::try_from(constituents)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| missing(format!("invalid constituent count {constituents}")))?;

        let mut mapping = Self {
            constituents,
            ..Self::default()
        };
        let root = geometry.join(MAPPING);
        for kind in PartitionKind::ALL {
            let dir = root.join(kind.as_str());
            for name in store.list_arrays(&dir) {
                let path = dir.join(name.clone());
                match kind {
                    PartitionKind::Phase => {
                        let rows = read_rows(store, &path, 3)?
                            .chunks_exact(3)
                            .map(|r| [r[0], r[1], r[2]])
                            .collect::<Vec<_>>();
                        let out_of_range = rows.iter().find(|r| r[0] >= points || r[1] >= constituents);
                        if let Some(r) = out_of_range {
                            return Err(missing(format!("{path}: row {r:?} out of range")));
                        }
                        mapping.phases.insert(name, rows);
                    }
                    PartitionKind::Homogenization => {
                        let rows = read_rows(store, &path, 2)?
                            .chunks_exact(2)
                            .map(|r| [r[0], r[1]])
                            .collect::<Vec<_>>();
                        if let Some(r) = rows.iter().find(|r| r[0] >= points) {
                            return Err(missing(format!("{path}: row {r:?} out of range")));
                        }
                        mapping.homogenizations.insert(name, rows);
                    }
                }
            }
        }
        Ok(mapping)
    }

    /// Constituents per material point.
    pub fn constituents(&self) -> usize {
        self.constituents
    }

    /// Names of the mapped partitions of `kind`.
    pub fn names(&self, kind: PartitionKind) -> Vec<&str> {
        match kind {
            PartitionKind::Phase => self.phases.keys().map(String::as_str).collect(),
            PartitionKind::Homogenization => {
                self.homogenizations.keys().map(String::as_str).collect()
            }
        }
    }

    /// Scatter plan for partition `name`. `constituent` is ignored for
    /// homogenizations. `None` if the partition is not mapped.
    pub fn gather(&self, kind: PartitionKind, name: &str, constituent: usize) -> Option<Gather> {
        let mut plan = Gather::default();
        match kind {
            PartitionKind::Phase => {
                for &[point, c, entry] in self.phases.get(name)? {
                    if c == constituent {
                        plan.at.push(point);
                        plan.from.push(entry);
                    }
                }
            }
            PartitionKind::Homogenization => {
                for &[point, entry] in self.homogenizations.get(name)? {
                    plan.at.push(point);
                    plan.from.push(entry);
                }
            }
        }
        Some(plan)
    }
}

fn read_rows<S: Store + ?Sized>(
    store: &S,
    path: &StorePath,
    width: usize,
) -> Result<Vec<usize>, ResultError> {
    let dataset = store
        .read_array(path)
        .ok_or_else(|| missing(format!("{path} not found")))?;
    let values = dataset
        .as_int()
        .ok_or_else(|| missing(format!("{path} must hold integers")))?;
    if dataset.sample_shape() != [width] {
        return Err(missing(format!(
            "{path} must have shape [K, {width}], found {:?}",
            dataset.shape()
        )));
    }
    values
        .iter()
        .map(|&v| usize::try_from(v).map_err(|_| missing(format!("{path}: negative entry {v}"))))
        .collect()
}
