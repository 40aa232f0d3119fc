//! Finite-strain continuum mechanics.
//!
//! Inputs are deformation gradients `F` and first Piola-Kirchhoff
//! stresses `P`, both `[N, 3, 3]`.

use nalgebra::Matrix3;
use strata_core::{Dataset, MechError};

use crate::kinds::StretchKind;
use crate::tensor::{from_tensors, same_rows, spectral_map, sym, tensors};

const SVD_EPS: f64 = f64::EPSILON;
const MAX_ITERATIONS: usize = 1000;

/// Cauchy stress `sym(P Fᵀ / det F)`.
pub fn stress_cauchy(p: &Dataset, f: &Dataset) -> Result<Dataset, MechError> {
    same_rows(p, f)?;
    let ps = tensors(p, "stress_cauchy")?;
    let fs = tensors(f, "stress_cauchy")?;
    let mut out = Vec::with_capacity(ps.len());
    for (row, (p, f)) in ps.iter().zip(&fs).enumerate() {
        let det = f.determinant();
        if det == 0.0 {
            return Err(MechError::Singular { row });
        }
        out.push(sym(&(p * f.transpose() / det)));
    }
    from_tensors(&out)
}

/// Second Piola-Kirchhoff stress `sym(F⁻¹ P)`.
pub fn stress_second_piola_kirchhoff(p: &Dataset, f: &Dataset) -> Result<Dataset, MechError> {
    same_rows(p, f)?;
    let ps = tensors(p, "stress_second_piola_kirchhoff")?;
    let fs = tensors(f, "stress_second_piola_kirchhoff")?;
    let mut out = Vec::with_capacity(ps.len());
    for (row, (p, f)) in ps.iter().zip(&fs).enumerate() {
        let inv = f.try_inverse().ok_or(MechError::Singular { row })?;
        out.push(sym(&(inv * p)));
    }
    from_tensors(&out)
}

/// Rotational part `R` of the polar decomposition `F = R U = V R`, as a
/// rotation matrix.
pub fn rotation(f: &Dataset) -> Result<Dataset, MechError> {
    let fs = tensors(f, "rotation")?;
    let mut out = Vec::with_capacity(fs.len());
    for (row, f) in fs.iter().enumerate() {
        if f.iter().any(|x| !x.is_finite()) {
            out.push(Matrix3::from_element(f64::NAN));
            continue;
        }
        let svd = f
            .try_svd(true, true, SVD_EPS, MAX_ITERATIONS)
            .ok_or(MechError::Singular { row })?;
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            return Err(MechError::Singular { row });
        };
        out.push(u * v_t);
    }
    from_tensors(&out)
}

/// Left (`V`) or right (`U`) stretch tensor of the polar decomposition.
pub fn stretch(f: &Dataset, kind: StretchKind) -> Result<Dataset, MechError> {
    let fs = tensors(f, "stretch")?;
    let out: Vec<Matrix3<f64>> = fs
        .iter()
        .map(|f| spectral_map(&metric(f, kind), f64::sqrt))
        .collect();
    from_tensors(&out)
}

/// Seth-Hill strain of order `m` from the left (`V`) or right (`U`)
/// stretch.
///
/// With `(w, n)` the eigenpairs of `B = F Fᵀ` or `C = Fᵀ F`:
/// `(n w^m nᵀ - I) / 2m` for `m != 0` and `n ln(w)/2 nᵀ` for `m = 0`.
pub fn strain(f: &Dataset, kind: StretchKind, m: f64) -> Result<Dataset, MechError> {
    if !m.is_finite() {
        return Err(MechError::InvalidArgument {
            reason: format!("strain order must be finite, got {m}"),
        });
    }
    let fs = tensors(f, "strain")?;
    let out: Vec<Matrix3<f64>> = fs
        .iter()
        .map(|f| {
            let b = metric(f, kind);
            if m == 0.0 {
                spectral_map(&b, |w| 0.5 * w.ln())
            } else {
                (spectral_map(&b, |w| w.powf(m)) - Matrix3::identity()) / (2.0 * m)
            }
        })
        .collect();
    from_tensors(&out)
}

/// `F Fᵀ` for `V`, `Fᵀ F` for `U`.
fn metric(f: &Matrix3<f64>, kind: StretchKind) -> Matrix3<f64> {
    match kind {
        StretchKind::V => f * f.transpose(),
        StretchKind::U => f.transpose() * f,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(rows: &[[f64; 9]]) -> Dataset {
        Dataset::from_float(&[rows.len(), 3, 3], rows.concat()).unwrap()
    }

    fn close(a: &Dataset, b: &[f64]) -> bool {
        let a = a.as_float().unwrap();
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    const I: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    /// Uniaxial stretch by 2 along x.
    const UNIAXIAL: [f64; 9] = [2.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    /// Rotation by 90 degrees about z.
    const RZ90: [f64; 9] = [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

    #[test]
    fn cauchy_equals_p_for_identity_deformation() {
        let p = t(&[[1.0, 2.0, 0.0, 2.0, 3.0, 0.0, 0.0, 0.0, 4.0]]);
        let sigma = stress_cauchy(&p, &t(&[I])).unwrap();
        assert!(close(&sigma, p.as_float().unwrap()));
    }

    #[test]
    fn cauchy_scales_with_volume() {
        let p = t(&[[2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
        let sigma = stress_cauchy(&p, &t(&[UNIAXIAL])).unwrap();
        // P Fᵀ / det F = diag(4, 0, 0) / 2.
        assert!(close(&sigma, &[2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn second_piola_kirchhoff() {
        let p = t(&[[2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
        let s = stress_second_piola_kirchhoff(&p, &t(&[UNIAXIAL])).unwrap();
        assert!(close(&s, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn singular_deformation_is_reported() {
        let zero = [0.0; 9];
        assert_eq!(
            stress_second_piola_kirchhoff(&t(&[I, zero]), &t(&[I, zero])).unwrap_err(),
            MechError::Singular { row: 1 }
        );
    }

    #[test]
    fn row_counts_must_match() {
        assert!(matches!(
            stress_cauchy(&t(&[I, I]), &t(&[I])),
            Err(MechError::RowMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn rotation_of_pure_rotation_is_itself() {
        let r = rotation(&t(&[RZ90])).unwrap();
        assert!(close(&r, &RZ90));
    }

    #[test]
    fn rotation_of_stretch_is_identity() {
        assert!(close(&rotation(&t(&[UNIAXIAL])).unwrap(), &I));
    }

    #[test]
    fn stretch_tensors() {
        // F = R U with U = diag(2, 1, 1) and R = Rz(90).
        let f = [0.0, -1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let u = stretch(&t(&[f]), StretchKind::U).unwrap();
        assert!(close(&u, &UNIAXIAL));
        let v = stretch(&t(&[f]), StretchKind::V).unwrap();
        assert!(close(&v, &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn seth_hill_family() {
        let f = t(&[UNIAXIAL]);
        let diag = |x: f64| [x, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        // Green-Lagrange (m = 1): (C - I)/2.
        assert!(close(&strain(&f, StretchKind::U, 1.0).unwrap(), &diag(1.5)));
        // Logarithmic (m = 0): ln(2).
        assert!(close(
            &strain(&f, StretchKind::V, 0.0).unwrap(),
            &diag(2f64.ln())
        ));
        // Almansi (m = -1): (I - B⁻¹)/2.
        assert!(close(&strain(&f, StretchKind::V, -1.0).unwrap(), &diag(0.375)));
        // Biot (m = 0.5): U - I.
        assert!(close(&strain(&f, StretchKind::U, 0.5).unwrap(), &diag(1.0)));
    }

    #[test]
    fn strain_order_must_be_finite() {
        assert!(strain(&t(&[I]), StretchKind::U, f64::NAN).is_err());
    }
}
