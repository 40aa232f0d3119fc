//! Index of what a container holds, read once when it is opened.

use std::collections::BTreeSet;

use strata_core::id::{GEOMETRY, TIME};
use strata_core::{Dataset, IncrementId, PartitionKind, ResultError, Store, StorePath};

use crate::grid::{missing, Grid};
use crate::mapping::Mapping;

/// Container-wide index: increments with their times, partition names,
/// grid and mapping. Adding fields never changes it.
#[derive(Clone, Debug)]
pub(crate) struct Catalog {
    pub(crate) grid: Grid,
    pub(crate) mapping: Mapping,
    /// Ascending by index.
    pub(crate) increments: Vec<(IncrementId, f64)>,
    pub(crate) phases: BTreeSet<String>,
    pub(crate) homogenizations: BTreeSet<String>,
}

impl Catalog {
    pub(crate) fn load<S: Store + ?Sized>(store: &S) -> Result<Self, ResultError> {
        let grid = Grid::load(store)?;
        let mapping = Mapping::load(store, grid.points())?;

        let mut increments = Vec::new();
        for name in store.list_groups(&StorePath::root()) {
            if name == GEOMETRY {
                continue;
            }
            let Some(id) = IncrementId::from_group_name(&name) else {
                log::debug!("ignoring group '{name}'");
                continue;
            };
            let time = store
                .read_array(&id.path().join(TIME))
                .and_then(|d| first_value(&d))
                .ok_or_else(|| missing(format!("{id} has no {TIME}")))?;
            increments.push((id, time));
        }
        increments.sort_by_key(|&(id, _)| id);

        let mut phases: BTreeSet<String> = mapping
            .names(PartitionKind::Phase)
            .into_iter()
            .map(str::to_owned)
            .collect();
        let mut homogenizations: BTreeSet<String> = mapping
            .names(PartitionKind::Homogenization)
            .into_iter()
            .map(str::to_owned)
            .collect();
        for &(id, _) in &increments {
            let base = id.path();
            phases.extend(store.list_groups(&base.join(PartitionKind::Phase.as_str())));
            homogenizations
                .extend(store.list_groups(&base.join(PartitionKind::Homogenization.as_str())));
        }

        Ok(Self {
            grid,
            mapping,
            increments,
            phases,
            homogenizations,
        })
    }

    pub(crate) fn names(&self, kind: PartitionKind) -> &BTreeSet<String> {
        match kind {
            PartitionKind::Phase => &self.phases,
            PartitionKind::Homogenization => &self.homogenizations,
        }
    }

    pub(crate) fn time(&self, id: IncrementId) -> Option<f64> {
        self.increments
            .iter()
            .find(|&&(i, _)| i == id)
            .map(|&(_, t)| t)
    }

    pub(crate) fn contains(&self, id: IncrementId) -> bool {
        self.time(id).is_some()
    }

    pub(crate) fn increments_in_range(&self, lo: f64, hi: f64) -> Vec<IncrementId> {
        self.increments
            .iter()
            .filter(|&&(id, _)| (lo..=hi).contains(&f64::from(id.0)))
            .map(|&(id, _)| id)
            .collect()
    }

    pub(crate) fn times_in_range(&self, lo: f64, hi: f64) -> Vec<f64> {
        self.increments
            .iter()
            .filter(|&&(_, t)| (lo..=hi).contains(&t))
            .map(|&(_, t)| t)
            .collect()
    }
}

fn first_value(d: &Dataset) -> Option<f64> {
    d.to_float().first().copied()
}
