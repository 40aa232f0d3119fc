//! Reusable result containers.
//!
//! - [`polycrystal`]: 3×2×1 grid, one constituent, phases `alpha`,
//!   `beta`, `gamma` (two points each), homogenization `SX`, increments
//!   0 and 10.
//! - [`dual_phase`]: 2×1×1 grid with two constituents per point.
//!
//! Field values follow small closed forms ([`shear`], [`pressure`]) so
//! tests can compute expectations instead of hard-coding them.

use strata_core::{Attributes, Dataset, Lattice, PartitionKind};
use strata_store::{ContainerBuilder, MemoryStore};

pub const PHASES: [&str; 3] = ["alpha", "beta", "gamma"];
pub const HOMOGENIZATION: &str = "SX";
pub const INCREMENTS: [(u32, f64); 2] = [(0, 0.0), (10, 2.5)];

/// Shear component `F[0][1]` of entry `row` of `phase` in `increment`.
pub fn shear(increment: u32, phase: usize, row: usize) -> f64 {
    0.1 * (phase + 1) as f64 + 0.05 * row as f64 + 0.01 * increment as f64
}

/// `P[0][0]` of `phase`; every other component is zero.
pub fn pressure(phase: usize) -> f64 {
    1.0e6 * (phase + 1) as f64
}

/// Largest singular value of a simple shear by `gamma`.
pub fn spectral_norm_of_shear(gamma: f64) -> f64 {
    (gamma + (gamma * gamma + 4.0).sqrt()) / 2.0
}

/// Temperature at `point` of `increment`.
pub fn temperature(increment: u32, point: usize) -> f64 {
    300.0 + point as f64 + increment as f64
}

fn deformation(increment: u32, phase: usize) -> Dataset {
    let mut values = Vec::with_capacity(18);
    for row in 0..2 {
        let g = shear(increment, phase, row);
        values.extend_from_slice(&[1.0, g, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }
    Dataset::from_float(&[2, 3, 3], values)
        .expect("deformation shape")
        .with_attrs(Attributes::described("1", "deformation gradient"))
}

fn stress(phase: usize) -> Dataset {
    let p = pressure(phase);
    let mut values = vec![0.0; 18];
    values[0] = p;
    values[9] = p;
    Dataset::from_float(&[2, 3, 3], values)
        .expect("stress shape")
        .with_attrs(Attributes::described("Pa", "first Piola-Kirchhoff stress"))
}

fn orientation(lattice: Option<Lattice>) -> Dataset {
    let h = std::f64::consts::FRAC_1_SQRT_2;
    Dataset::from_float(&[2, 4], vec![1.0, 0.0, 0.0, 0.0, h, 0.0, 0.0, h])
        .expect("orientation shape")
        .with_attrs(Attributes {
            lattice,
            ..Attributes::described("q_0 (q_1 q_2 q_3)", "crystal orientation")
        })
}

/// The three-phase container.
///
/// Per phase group (two entries each):
///
/// | label   | shape     | present in          |
/// |---------|-----------|---------------------|
/// | `F`     | `[2,3,3]` | all phases          |
/// | `P`     | `[2,3,3]` | all phases          |
/// | `O`     | `[2,4]`   | all; `gamma` has no lattice |
/// | `v`     | `[2,3]`   | `alpha`, `beta`     |
/// | `grain` | `[2]` int | `alpha`             |
///
/// `SX` holds `T` (one value per point, kelvin).
pub fn polycrystal() -> MemoryStore {
    let mut b = ContainerBuilder::new("polycrystal", [3, 2, 1], [3.0, 2.0, 1.0], [0.0; 3], 1);
    for (i, name) in PHASES.iter().enumerate() {
        b.phase_mapping(name, vec![[2 * i, 0, 0], [2 * i + 1, 0, 1]])
            .expect("phase mapping");
    }
    b.homogenization_mapping(HOMOGENIZATION, (0..6).map(|p| [p, p]).collect())
        .expect("homogenization mapping");

    for (inc, t) in INCREMENTS {
        b.increment(inc, t).expect("increment");
        for (i, name) in PHASES.iter().enumerate() {
            let lattice = (i < 2).then_some(Lattice::CI);
            b.field(inc, PartitionKind::Phase, name, "F", deformation(inc, i))
                .and_then(|b| b.field(inc, PartitionKind::Phase, name, "P", stress(i)))
                .and_then(|b| b.field(inc, PartitionKind::Phase, name, "O", orientation(lattice)))
                .expect("phase fields");
        }
        for name in &PHASES[..2] {
            let v = Dataset::from_float(&[2, 3], vec![3.0, 4.0, 12.0, 1.0, 2.0, 2.0])
                .expect("vector shape")
                .with_attrs(Attributes::described("m/s", "velocity"));
            b.field(inc, PartitionKind::Phase, name, "v", v)
                .expect("vector field");
        }
        let grain = Dataset::from_int(&[2], vec![7, 8]).expect("grain shape");
        b.field(inc, PartitionKind::Phase, PHASES[0], "grain", grain)
            .expect("grain field");
        let t = Dataset::from_float(&[6], (0..6).map(|p| temperature(inc, p)).collect())
            .expect("temperature shape")
            .with_attrs(Attributes::described("K", "temperature"));
        b.field(inc, PartitionKind::Homogenization, HOMOGENIZATION, "T", t)
            .expect("temperature field");
    }
    b.build()
}

/// Two points, two constituents each.
///
/// Phase `A` covers point 0 (both constituents) and point 1
/// (constituent 0); phase `B` covers point 1, constituent 1. Both carry
/// a scalar `x`: `A` holds `[10, 11, 12]`, `B` holds `[20]`.
pub fn dual_phase() -> MemoryStore {
    let mut b = ContainerBuilder::new("dual", [2, 1, 1], [2.0, 1.0, 1.0], [0.0; 3], 2);
    b.phase_mapping("A", vec![[0, 0, 0], [0, 1, 1], [1, 0, 2]])
        .and_then(|b| b.phase_mapping("B", vec![[1, 1, 0]]))
        .and_then(|b| b.homogenization_mapping("H", vec![[0, 0], [1, 1]]))
        .and_then(|b| b.increment(0, 0.0))
        .expect("dual-phase layout");
    let a = Dataset::from_float(&[3], vec![10.0, 11.0, 12.0]).expect("A shape");
    let bx = Dataset::from_float(&[1], vec![20.0]).expect("B shape");
    b.field(0, PartitionKind::Phase, "A", "x", a)
        .and_then(|b| b.field(0, PartitionKind::Phase, "B", "x", bx))
        .expect("dual-phase fields");
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{Store, StorePath};

    #[test]
    fn polycrystal_layout() {
        let store = polycrystal();
        assert_eq!(
            store.list_groups(&StorePath::root()),
            vec!["geometry", "increment_0", "increment_10"]
        );
        assert_eq!(
            store.list_arrays(&StorePath::parse("increment_10/phase/alpha")),
            vec!["F", "O", "P", "grain", "v"]
        );
        assert_eq!(
            store.list_arrays(&StorePath::parse("increment_0/phase/gamma")),
            vec!["F", "O", "P"]
        );
    }

    #[test]
    fn shear_norm_closed_form() {
        assert!((spectral_norm_of_shear(0.0) - 1.0).abs() < 1e-12);
        assert!(spectral_norm_of_shear(0.5) > 1.0);
    }
}
