//! Regular-grid geometry of a container.

use strata_core::id::GEOMETRY;
use strata_core::{Dataset, ResultError, Store, StorePath};

/// Regular grid of `cells[0] × cells[1] × cells[2]` cells spanning `size`
/// from `origin`. Points are numbered with x fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    /// Number of cells along x, y, z.
    pub cells: [usize; 3],
    /// Physical edge lengths.
    pub size: [f64; 3],
    /// Coordinates of the lower corner.
    pub origin: [f64; 3],
}

impl Grid {
    /// Read `geometry/cells`, `geometry/size` and `geometry/origin`.
    pub fn load<S: Store + ?Sized>(store: &S) -> Result<Self, ResultError> {
        let cells = triple(store, "cells")?;
        let size = triple(store, "size")?;
        let origin = triple(store, "origin")?;
        let mut c = [0usize; 3];
        for (dst, &v) in c.iter_mut().zip(&cells) {
            if v < 0.0 || v.fract() != 0.0 {
                return Err(missing(format!("cells must be non-negative integers, got {cells:?}")));
            }
            *dst = v as usize;
        }
        Ok(Self {
            cells: c,
            size,
            origin,
        })
    }

    /// Number of cells (material points).
    pub fn points(&self) -> usize {
        self.cells.iter().product()
    }

    /// Edge lengths of one cell.
    pub fn spacing(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.size[i] / self.cells[i] as f64)
    }

    /// Cell-centre coordinates in the undeformed configuration,
    /// `[points, 3]`, x fastest.
    pub fn coordinates0_point(&self) -> Vec<[f64; 3]> {
        let d = self.spacing();
        lattice_points(self.cells, |i, n| self.origin[i] + (n as f64 + 0.5) * d[i])
    }

    /// Node coordinates in the undeformed configuration,
    /// `[(cells[0]+1)(cells[1]+1)(cells[2]+1), 3]`, x fastest.
    pub fn coordinates0_node(&self) -> Vec<[f64; 3]> {
        let d = self.spacing();
        let nodes = self.cells.map(|c| c + 1);
        lattice_points(nodes, |i, n| self.origin[i] + n as f64 * d[i])
    }
}

fn lattice_points(counts: [usize; 3], coordinate: impl Fn(usize, usize) -> f64) -> Vec<[f64; 3]> {
    let mut out = Vec::with_capacity(counts.iter().product());
    for z in 0..counts[2] {
        for y in 0..counts[1] {
            for x in 0..counts[0] {
                out.push([coordinate(0, x), coordinate(1, y), coordinate(2, z)]);
            }
        }
    }
    out
}

fn triple<S: Store + ?Sized>(store: &S, name: &str) -> Result<[f64; 3], ResultError> {
    let path = StorePath::root().join(GEOMETRY).join(name);
    let dataset: Dataset = store
        .read_array(&path)
        .ok_or_else(|| missing(format!("{path} not found")))?;
    let values = dataset.to_float();
    match values.as_ref() {
        [a, b, c] => Ok([*a, *b, *c]),
        other => Err(missing(format!(
            "{path} must hold 3 values, found {}",
            other.len()
        ))),
    }
}

pub(crate) fn missing(detail: String) -> ResultError {
    ResultError::MissingGeometry { detail }
}
