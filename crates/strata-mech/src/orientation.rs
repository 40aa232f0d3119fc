//! Crystal orientation kernels.
//!
//! Orientations are unit quaternions `(q0, q1, q2, q3)` with real part
//! first, stored as `[N, 4]`, describing the passive rotation from the
//! sample frame into the crystal frame. The crystal lattice is read from
//! the dataset's `lattice` attribute.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use strata_core::{CrystalFamily, Dataset, Lattice, MechError};

use crate::tensor::expect_sample_shape;

/// Components below this count as zero when testing triangle membership.
const SST_TOLERANCE: f64 = 1e-9;

/// Passive rotation matrices of every orientation in `q`.
fn passive_matrices(q: &Dataset, kernel: &'static str) -> Result<Vec<Matrix3<f64>>, MechError> {
    expect_sample_shape(q, kernel, &[4])?;
    Ok(q.to_float()
        .chunks_exact(4)
        .map(|c| {
            let unit = UnitQuaternion::from_quaternion(Quaternion::new(c[0], c[1], c[2], c[3]));
            unit.to_rotation_matrix().into_inner().transpose()
        })
        .collect())
}

fn unit_direction(d: [f64; 3]) -> Result<Vector3<f64>, MechError> {
    let v = Vector3::from(d);
    let n = v.norm();
    if n == 0.0 || !n.is_finite() {
        return Err(MechError::InvalidArgument {
            reason: format!("direction {d:?} has no length"),
        });
    }
    Ok(v / n)
}

/// Proper rotations of the point group of a crystal family.
pub fn symmetry_operations(family: CrystalFamily) -> Result<Vec<Matrix3<f64>>, MechError> {
    let signed_permutations = |keep_z: bool| {
        let perms: [[usize; 3]; 6] = [[0, 1, 2], [1, 0, 2], [0, 2, 1], [2, 1, 0], [1, 2, 0], [2, 0, 1]];
        let mut ops = Vec::new();
        for p in perms {
            if keep_z && p[2] != 2 {
                continue;
            }
            for bits in 0..8u8 {
                let m = Matrix3::from_fn(|r, c| {
                    let s = if bits & (1 << r) != 0 { -1.0 } else { 1.0 };
                    if p[r] == c {
                        s
                    } else {
                        0.0
                    }
                });
                if m.determinant() > 0.0 {
                    ops.push(m);
                }
            }
        }
        ops
    };
    match family {
        CrystalFamily::Cubic => Ok(signed_permutations(false)),
        CrystalFamily::Tetragonal => Ok(signed_permutations(true)),
        CrystalFamily::Orthorhombic => Ok(signed_permutations(true)
            .into_iter()
            .filter(|m| (0..3).all(|r| (0..3).all(|c| r == c || m[(r, c)] == 0.0)))
            .collect()),
        CrystalFamily::Hexagonal => {
            let mut ops = Vec::with_capacity(12);
            for k in 0..6 {
                let a = f64::from(k) * std::f64::consts::FRAC_PI_3;
                let (s, c) = a.sin_cos();
                ops.push(Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0));
            }
            for k in 0..6 {
                let a = f64::from(k) * std::f64::consts::FRAC_PI_6;
                let axis = Vector3::new(a.cos(), a.sin(), 0.0);
                ops.push(axis * axis.transpose() * 2.0 - Matrix3::identity());
            }
            Ok(ops)
        }
        other => Err(MechError::InvalidArgument {
            reason: format!("no standard triangle defined for {other} lattices"),
        }),
    }
}

/// Rows map a direction (with non-negative z) onto the barycentric
/// components of the standard stereographic triangle.
fn sst_basis(family: CrystalFamily) -> Result<Matrix3<f64>, MechError> {
    let r2 = 2f64.sqrt();
    let r3 = 3f64.sqrt();
    match family {
        CrystalFamily::Cubic => Ok(Matrix3::new(-1.0, 0.0, 1.0, r2, -r2, 0.0, 0.0, r3, 0.0)),
        CrystalFamily::Hexagonal => Ok(Matrix3::new(0.0, 0.0, 1.0, 1.0, -r3, 0.0, 0.0, 2.0, 0.0)),
        CrystalFamily::Tetragonal => Ok(Matrix3::new(0.0, 0.0, 1.0, 1.0, -1.0, 0.0, 0.0, r2, 0.0)),
        CrystalFamily::Orthorhombic => {
            Ok(Matrix3::new(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0))
        }
        other => Err(MechError::InvalidArgument {
            reason: format!("no standard triangle defined for {other} lattices"),
        }),
    }
}

/// RGB intensities in `[0, 1]` for a crystal-frame direction, or `None`
/// if no symmetric equivalent falls into the standard triangle.
fn sst_color(pole: &Vector3<f64>, ops: &[Matrix3<f64>], basis: &Matrix3<f64>) -> Option<[f64; 3]> {
    for op in ops {
        let mut v = op * pole;
        v.z = v.z.abs();
        let comps = basis * v;
        if comps.iter().all(|&c| c >= -SST_TOLERANCE) {
            let comps = comps.map(|c| c.max(0.0));
            let n = comps.norm();
            if n == 0.0 {
                return None;
            }
            let rgb = comps.map(|c| (c / n).sqrt().min(1.0));
            let max = rgb.max();
            return Some([rgb[0] / max, rgb[1] / max, rgb[2] / max]);
        }
    }
    None
}

/// Inverse pole figure color of the sample direction `direction` for
/// every orientation in `q`: `[N, 4] -> [N, 3]` 8-bit RGB integers.
///
/// The lattice attribute of `q` selects the crystal symmetry; without it
/// the call fails with [`MechError::MissingLattice`].
pub fn ipf_color(q: &Dataset, direction: [f64; 3]) -> Result<Dataset, MechError> {
    let lattice: Lattice = q.attrs().lattice.ok_or(MechError::MissingLattice)?;
    let family = lattice.family();
    let ops = symmetry_operations(family)?;
    let basis = sst_basis(family)?;
    let d = unit_direction(direction)?;
    let mut out = Vec::with_capacity(q.rows() * 3);
    for om in passive_matrices(q, "ipf_color")? {
        let rgb = sst_color(&(om * d), &ops, &basis).unwrap_or([0.0; 3]);
        out.extend(rgb.iter().map(|c| (c * 255.0) as i64));
    }
    Ok(Dataset::from_int(&[out.len() / 3, 3], out)?)
}

/// Stereographic projection of the crystal direction `uvw` for every
/// orientation in `q`: `[N, 4] -> [N, 2]`, as `(x, y)` or, with `polar`,
/// as `(r, φ)`.
pub fn pole(q: &Dataset, uvw: [f64; 3], polar: bool) -> Result<Dataset, MechError> {
    let d = unit_direction(uvw)?;
    let denominator = 1.0 + d.z.abs();
    let mut out = Vec::with_capacity(q.rows() * 2);
    for om in passive_matrices(q, "pole")? {
        let p = om * d;
        let (x, y) = (p.x / denominator, p.y / denominator);
        if polar {
            out.extend([x.hypot(y), y.atan2(x)]);
        } else {
            out.extend([x, y]);
        }
    }
    Ok(Dataset::from_float(&[out.len() / 2, 2], out)?)
}

/// Render a direction as space-separated components, scaled to coprime
/// integers when all components are integral (`[2, 0, 2]` -> `"1 0 1"`).
pub fn direction_label(d: [f64; 3]) -> String {
    let integral = d.iter().all(|x| x.fract() == 0.0 && x.abs() < 1e12);
    if !integral {
        return format!("{} {} {}", d[0], d[1], d[2]);
    }
    let ints = d.map(|x| x as i64);
    let g = ints.iter().fold(0, |acc, &x| gcd(acc, x.abs()));
    let g = if g == 0 { 1 } else { g };
    format!("{} {} {}", ints[0] / g, ints[1] / g, ints[2] / g)
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Attributes;

    fn orientations(qs: &[[f64; 4]], lattice: Option<Lattice>) -> Dataset {
        Dataset::from_float(&[qs.len(), 4], qs.concat())
            .unwrap()
            .with_attrs(Attributes {
                lattice,
                ..Attributes::default()
            })
    }

    const IDENTITY: [f64; 4] = [1.0, 0.0, 0.0, 0.0];

    #[test]
    fn group_orders() {
        let order = |f| symmetry_operations(f).unwrap().len();
        assert_eq!(order(CrystalFamily::Cubic), 24);
        assert_eq!(order(CrystalFamily::Hexagonal), 12);
        assert_eq!(order(CrystalFamily::Tetragonal), 8);
        assert_eq!(order(CrystalFamily::Orthorhombic), 4);
        assert!(symmetry_operations(CrystalFamily::Triclinic).is_err());
    }

    #[test]
    fn symmetry_operations_are_rotations() {
        for family in [CrystalFamily::Cubic, CrystalFamily::Hexagonal] {
            for op in symmetry_operations(family).unwrap() {
                assert!((op.determinant() - 1.0).abs() < 1e-12);
                assert!((op * op.transpose() - Matrix3::identity()).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn cubic_corners_are_primary_colors() {
        let q = orientations(&[IDENTITY], Some(Lattice::CF));
        let color = |d| ipf_color(&q, d).unwrap().as_int().unwrap().to_vec();
        assert_eq!(color([0.0, 0.0, 1.0]), vec![255, 0, 0]);
        assert_eq!(color([1.0, 0.0, 1.0]), vec![0, 255, 0]);
        assert_eq!(color([1.0, 1.0, 1.0]), vec![0, 0, 255]);
        // Symmetric equivalents share a color.
        assert_eq!(color([0.0, -1.0, 0.0]), vec![255, 0, 0]);
    }

    #[test]
    fn hexagonal_basal_pole_is_red() {
        let q = orientations(&[IDENTITY], Some(Lattice::HP));
        assert_eq!(
            ipf_color(&q, [0.0, 0.0, 1.0]).unwrap().as_int().unwrap(),
            &[255, 0, 0]
        );
    }

    #[test]
    fn rotated_crystal_changes_color() {
        // 90 degrees about x maps sample z onto crystal y (cubic: still <100>),
        // 45 degrees about x maps it onto a <110> direction.
        let h = std::f64::consts::FRAC_PI_8;
        let q = orientations(&[[h.cos(), h.sin(), 0.0, 0.0]], Some(Lattice::CI));
        assert_eq!(
            ipf_color(&q, [0.0, 0.0, 1.0]).unwrap().as_int().unwrap(),
            &[0, 255, 0]
        );
    }

    #[test]
    fn missing_lattice_is_an_error() {
        let q = orientations(&[IDENTITY], None);
        assert_eq!(
            ipf_color(&q, [0.0, 0.0, 1.0]).unwrap_err(),
            MechError::MissingLattice
        );
    }

    #[test]
    fn pole_projection() {
        let q = orientations(&[IDENTITY], None);
        let xy = pole(&q, [1.0, 0.0, 0.0], false).unwrap();
        assert_eq!(xy.shape(), &[1, 2]);
        assert_eq!(xy.as_float().unwrap(), &[1.0, 0.0]);
        let polar = pole(&q, [0.0, 1.0, 0.0], true).unwrap();
        let v = polar.as_float().unwrap();
        assert!((v[0] - 1.0).abs() < 1e-12);
        assert!((v[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn zero_direction_is_rejected() {
        let q = orientations(&[IDENTITY], Some(Lattice::CP));
        assert!(matches!(
            ipf_color(&q, [0.0; 3]),
            Err(MechError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn direction_labels() {
        assert_eq!(direction_label([2.0, 0.0, 2.0]), "1 0 1");
        assert_eq!(direction_label([0.0, 0.0, 1.0]), "0 0 1");
        assert_eq!(direction_label([-3.0, 6.0, 0.0]), "-1 2 0");
        assert_eq!(direction_label([0.5, 0.0, 1.0]), "0.5 0 1");
    }
}
