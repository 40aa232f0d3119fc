//! Second-order tensor invariants, decompositions and norms.

use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use strata_core::{Dataset, MechError, Values};

use crate::kinds::{EigenRank, MisesKind, NormOrder};

const EIGEN_EPS: f64 = f64::EPSILON;
const MAX_ITERATIONS: usize = 1000;

// ── Dataset <-> nalgebra ─────────────────────────────────────────

/// Samples of a `[N, 3, 3]` dataset as matrices.
pub(crate) fn tensors(d: &Dataset, kernel: &'static str) -> Result<Vec<Matrix3<f64>>, MechError> {
    expect_sample_shape(d, kernel, &[3, 3])?;
    Ok(d.to_float()
        .chunks_exact(9)
        .map(Matrix3::from_row_slice)
        .collect())
}

pub(crate) fn expect_sample_shape(
    d: &Dataset,
    kernel: &'static str,
    expected: &[usize],
) -> Result<(), MechError> {
    if d.ndim() == 0 || d.sample_shape() != expected {
        return Err(MechError::SampleShape {
            kernel,
            expected: expected.to_vec(),
            found: d.shape().get(1..).unwrap_or_default().to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn same_rows(a: &Dataset, b: &Dataset) -> Result<(), MechError> {
    if a.rows() != b.rows() {
        return Err(MechError::RowMismatch {
            left: a.rows(),
            right: b.rows(),
        });
    }
    Ok(())
}

pub(crate) fn from_tensors(ms: &[Matrix3<f64>]) -> Result<Dataset, MechError> {
    let mut v = Vec::with_capacity(ms.len() * 9);
    for m in ms {
        for r in 0..3 {
            for c in 0..3 {
                v.push(m[(r, c)]);
            }
        }
    }
    Ok(Dataset::from_float(&[ms.len(), 3, 3], v)?)
}

pub(crate) fn from_vectors(vs: &[Vector3<f64>]) -> Result<Dataset, MechError> {
    let v = vs.iter().flat_map(|x| [x[0], x[1], x[2]]).collect();
    Ok(Dataset::from_float(&[vs.len(), 3], v)?)
}

pub(crate) fn from_scalars(v: Vec<f64>) -> Dataset {
    Dataset::column(Values::Float(v))
}

// ── Single-tensor helpers ────────────────────────────────────────

pub(crate) fn sym(m: &Matrix3<f64>) -> Matrix3<f64> {
    (m + m.transpose()) * 0.5
}

pub(crate) fn dev(m: &Matrix3<f64>) -> Matrix3<f64> {
    m - Matrix3::identity() * (m.trace() / 3.0)
}

/// Eigenvalues in ascending order with matching eigenvector columns, of
/// the symmetric part of `m`. `None` if the iteration does not converge
/// (non-finite input).
pub(crate) fn eigh(m: &Matrix3<f64>) -> Option<(Vector3<f64>, Matrix3<f64>)> {
    if m.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let eig = SymmetricEigen::try_new(sym(m), EIGEN_EPS, MAX_ITERATIONS)?;
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
    let values = Vector3::from_fn(|i, _| eig.eigenvalues[order[i]]);
    let vectors = Matrix3::from_fn(|r, c| eig.eigenvectors[(r, order[c])]);
    Some((values, vectors))
}

/// `n f(w) nᵀ` for the eigenpairs `(w, n)` of a symmetric tensor.
pub(crate) fn spectral_map(m: &Matrix3<f64>, f: impl Fn(f64) -> f64) -> Matrix3<f64> {
    match eigh(m) {
        Some((w, n)) => n * Matrix3::from_diagonal(&w.map(f)) * n.transpose(),
        None => Matrix3::from_element(f64::NAN),
    }
}

// ── Kernels ──────────────────────────────────────────────────────

/// Determinant per sample: `[N, 3, 3] -> [N]`.
pub fn determinant(t: &Dataset) -> Result<Dataset, MechError> {
    let ts = tensors(t, "determinant")?;
    Ok(from_scalars(ts.iter().map(|m| m.determinant()).collect()))
}

/// Deviatoric part `T - tr(T)/3 I`: `[N, 3, 3] -> [N, 3, 3]`.
pub fn deviatoric(t: &Dataset) -> Result<Dataset, MechError> {
    let ts = tensors(t, "deviatoric")?;
    from_tensors(&ts.iter().map(dev).collect::<Vec<_>>())
}

/// Spherical part `tr(T)/3`: `[N, 3, 3] -> [N]`.
pub fn spherical(t: &Dataset) -> Result<Dataset, MechError> {
    let ts = tensors(t, "spherical")?;
    Ok(from_scalars(ts.iter().map(|m| m.trace() / 3.0).collect()))
}

/// Symmetric part `(T + Tᵀ)/2`: `[N, 3, 3] -> [N, 3, 3]`.
pub fn symmetric(t: &Dataset) -> Result<Dataset, MechError> {
    let ts = tensors(t, "symmetric")?;
    from_tensors(&ts.iter().map(sym).collect::<Vec<_>>())
}

/// Eigenvalue of the symmetric part at `rank`: `[N, 3, 3] -> [N]`.
pub fn eigenvalue(t: &Dataset, rank: EigenRank) -> Result<Dataset, MechError> {
    let ts = tensors(t, "eigenvalue")?;
    Ok(from_scalars(
        ts.iter()
            .map(|m| eigh(m).map_or(f64::NAN, |(w, _)| w[rank.position()]))
            .collect(),
    ))
}

/// Unit eigenvector of the symmetric part at `rank`: `[N, 3, 3] -> [N, 3]`.
///
/// The sign of each eigenvector is not specified.
pub fn eigenvector(t: &Dataset, rank: EigenRank) -> Result<Dataset, MechError> {
    let ts = tensors(t, "eigenvector")?;
    let vs: Vec<Vector3<f64>> = ts
        .iter()
        .map(|m| {
            eigh(m).map_or(Vector3::from_element(f64::NAN), |(_, n)| {
                n.column(rank.position()).into_owned()
            })
        })
        .collect();
    from_vectors(&vs)
}

/// Von Mises equivalent `sqrt(k s:s)` of the deviator `s`, with `k` set
/// by `kind`: `[N, 3, 3] -> [N]`.
pub fn equivalent_mises(t: &Dataset, kind: MisesKind) -> Result<Dataset, MechError> {
    let ts = tensors(t, "equivalent_mises")?;
    Ok(from_scalars(
        ts.iter()
            .map(|m| (kind.scale() * dev(m).norm_squared()).sqrt())
            .collect(),
    ))
}

/// Maximum shear `(λ_max - λ_min)/2` of the symmetric part: `[N, 3, 3] -> [N]`.
pub fn maximum_shear(t: &Dataset) -> Result<Dataset, MechError> {
    let ts = tensors(t, "maximum_shear")?;
    Ok(from_scalars(
        ts.iter()
            .map(|m| eigh(m).map_or(f64::NAN, |(w, _)| (w[2] - w[0]) * 0.5))
            .collect(),
    ))
}

/// Norm of every sample: `[N] | [N, k] | [N, m, n] -> [N]`.
///
/// Scalars and vectors take vector norms, matrices take the induced or
/// Frobenius matrix norm. [`NormOrder::Fro`] is undefined for vectors.
pub fn norm(x: &Dataset, ord: NormOrder) -> Result<Dataset, MechError> {
    if x.ndim() == 0 {
        return Err(MechError::SampleShape {
            kernel: "norm",
            expected: vec![],
            found: vec![],
        });
    }
    let k = x.sample_size();
    let data = x.to_float();
    let out: Vec<f64> = match *x.sample_shape() {
        [] | [_] => {
            if ord == NormOrder::Fro {
                return Err(MechError::InvalidArgument {
                    reason: "the Frobenius norm is defined for matrices only".into(),
                });
            }
            data.chunks_exact(k.max(1))
                .map(|v| vector_norm(v, ord))
                .collect()
        }
        [m, n] => {
            let mut out = Vec::with_capacity(x.rows());
            for sample in data.chunks_exact((m * n).max(1)) {
                out.push(matrix_norm(DMatrix::from_row_slice(m, n, sample), ord));
            }
            out
        }
        ref other => {
            return Err(MechError::SampleShape {
                kernel: "norm",
                expected: vec![3, 3],
                found: other.to_vec(),
            })
        }
    };
    Ok(from_scalars(out))
}

fn vector_norm(v: &[f64], ord: NormOrder) -> f64 {
    match ord {
        NormOrder::One => v.iter().map(|x| x.abs()).sum(),
        NormOrder::Two | NormOrder::Fro => v.iter().map(|x| x * x).sum::<f64>().sqrt(),
        NormOrder::Inf => v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs())),
    }
}

fn matrix_norm(m: DMatrix<f64>, ord: NormOrder) -> f64 {
    match ord {
        NormOrder::One => m
            .column_iter()
            .map(|c| c.iter().map(|x| x.abs()).sum::<f64>())
            .fold(0.0, f64::max),
        NormOrder::Inf => m
            .row_iter()
            .map(|r| r.iter().map(|x| x.abs()).sum::<f64>())
            .fold(0.0, f64::max),
        NormOrder::Fro => m.norm(),
        NormOrder::Two => {
            if m.iter().any(|x| !x.is_finite()) {
                return f64::NAN;
            }
            m.try_svd(false, false, EIGEN_EPS, MAX_ITERATIONS)
                .map_or(f64::NAN, |svd| svd.singular_values.max())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(rows: &[[f64; 9]]) -> Dataset {
        Dataset::from_float(&[rows.len(), 3, 3], rows.concat()).unwrap()
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-10)
    }

    const DIAG: [f64; 9] = [3.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 2.0];
    const SHEAR: [f64; 9] = [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

    #[test]
    fn determinant_and_spherical() {
        let d = t(&[DIAG, SHEAR]);
        assert!(close(determinant(&d).unwrap().as_float().unwrap(), &[-6.0, 0.0]));
        assert!(close(
            spherical(&d).unwrap().as_float().unwrap(),
            &[4.0 / 3.0, 0.0]
        ));
    }

    #[test]
    fn deviator_is_traceless() {
        let out = deviatoric(&t(&[DIAG])).unwrap();
        let v = out.as_float().unwrap();
        assert!((v[0] + v[4] + v[8]).abs() < 1e-12);
        assert_eq!(out.shape(), &[1, 3, 3]);
    }

    #[test]
    fn eigenvalues_are_ordered() {
        let d = t(&[DIAG]);
        let get = |r| eigenvalue(&d, r).unwrap().as_float().unwrap()[0];
        assert!((get(EigenRank::Max) - 3.0).abs() < 1e-12);
        assert!((get(EigenRank::Mid) - 2.0).abs() < 1e-12);
        assert!((get(EigenRank::Min) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn eigenvector_satisfies_eigen_equation() {
        let d = t(&[SHEAR]);
        let v = eigenvector(&d, EigenRank::Max).unwrap();
        let v = v.as_float().unwrap();
        // Largest eigenvalue of the shear is 1 with eigenvector (1, 1, 0)/sqrt(2).
        assert!((v[0].abs() - 0.5f64.sqrt()).abs() < 1e-10);
        assert!((v[0] - v[1]).abs() < 1e-10);
        assert!(v[2].abs() < 1e-10);
    }

    #[test]
    fn mises_kinds_differ() {
        let d = t(&[SHEAR]);
        let stress = equivalent_mises(&d, MisesKind::Stress).unwrap();
        let strain = equivalent_mises(&d, MisesKind::Strain).unwrap();
        // s:s = 2 for the pure shear.
        assert!(close(stress.as_float().unwrap(), &[3.0f64.sqrt()]));
        assert!(close(strain.as_float().unwrap(), &[(4.0f64 / 3.0).sqrt()]));
    }

    #[test]
    fn maximum_shear_of_diagonal() {
        assert!(close(
            maximum_shear(&t(&[DIAG])).unwrap().as_float().unwrap(),
            &[2.0]
        ));
    }

    #[test]
    fn vector_norms() {
        let v = Dataset::from_float(&[2, 3], vec![3.0, -4.0, 0.0, 1.0, 1.0, -1.0]).unwrap();
        assert!(close(norm(&v, NormOrder::One).unwrap().as_float().unwrap(), &[7.0, 3.0]));
        assert!(close(
            norm(&v, NormOrder::Two).unwrap().as_float().unwrap(),
            &[5.0, 3.0f64.sqrt()]
        ));
        assert!(close(norm(&v, NormOrder::Inf).unwrap().as_float().unwrap(), &[4.0, 1.0]));
        assert!(norm(&v, NormOrder::Fro).is_err());
    }

    #[test]
    fn matrix_norms() {
        let m = t(&[[1.0, -2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0]]);
        assert!(close(norm(&m, NormOrder::One).unwrap().as_float().unwrap(), &[6.0]));
        assert!(close(norm(&m, NormOrder::Inf).unwrap().as_float().unwrap(), &[7.0]));
        assert!(close(
            norm(&m, NormOrder::Fro).unwrap().as_float().unwrap(),
            &[30.0f64.sqrt()]
        ));
        // Spectral norm of diag(3, -1, 2) is 3.
        assert!(close(norm(&t(&[DIAG]), NormOrder::Two).unwrap().as_float().unwrap(), &[3.0]));
    }

    #[test]
    fn wrong_sample_shape() {
        let v = Dataset::from_float(&[2, 3], vec![0.0; 6]).unwrap();
        assert!(matches!(
            determinant(&v),
            Err(MechError::SampleShape { kernel: "determinant", .. })
        ));
    }

    #[test]
    fn non_finite_input_yields_nan_not_a_hang() {
        let mut row = DIAG;
        row[0] = f64::NAN;
        let out = eigenvalue(&t(&[row]), EigenRank::Max).unwrap();
        assert!(out.as_float().unwrap()[0].is_nan());
    }
}
