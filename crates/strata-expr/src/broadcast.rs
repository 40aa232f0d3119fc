//! Elementwise array arithmetic with numpy-style broadcasting.
//!
//! Shapes are aligned at their trailing axes; an axis of length 1 (or a
//! missing leading axis) stretches to match the other operand. Results
//! are always floating point.

use smallvec::SmallVec;
use strata_core::{Dataset, ExprError};

type Dims = SmallVec<[usize; 4]>;

/// Shape two operands broadcast to.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>, ExprError> {
    let n = a.len().max(b.len());
    let mut out = vec![0; n];
    for (i, slot) in out.iter_mut().enumerate() {
        let da = axis(a, n, i);
        let db = axis(b, n, i);
        *slot = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(ExprError::Broadcast {
                    left: a.to_vec(),
                    right: b.to_vec(),
                })
            }
        };
    }
    Ok(out)
}

/// Length of axis `i` of `shape` when left-padded with ones to `n` axes.
fn axis(shape: &[usize], n: usize, i: usize) -> usize {
    let pad = n - shape.len();
    if i < pad {
        1
    } else {
        shape[i - pad]
    }
}

/// Row-major strides of `shape` viewed under `out`, zero on stretched axes.
fn strides(shape: &[usize], out: &[usize]) -> Dims {
    let n = out.len();
    let mut s: Dims = SmallVec::from_elem(0, n);
    let mut step = 1;
    for i in (0..n).rev() {
        let d = axis(shape, n, i);
        s[i] = if d == 1 { 0 } else { step };
        step *= d;
    }
    s
}

/// Apply `f` elementwise to one operand.
pub fn map(a: &Dataset, f: impl Fn(f64) -> f64) -> Result<Dataset, ExprError> {
    let values = a.to_float().iter().map(|&x| f(x)).collect();
    Ok(Dataset::from_float(a.shape(), values)?)
}

/// Apply `f` elementwise to two broadcast operands.
pub fn zip(a: &Dataset, b: &Dataset, f: impl Fn(f64, f64) -> f64) -> Result<Dataset, ExprError> {
    let out = broadcast_shape(a.shape(), b.shape())?;
    let av = a.to_float();
    let bv = b.to_float();
    if a.shape() == b.shape() {
        let values = av.iter().zip(bv.iter()).map(|(&x, &y)| f(x, y)).collect();
        return Ok(Dataset::from_float(&out, values)?);
    }
    let sa = strides(a.shape(), &out);
    let sb = strides(b.shape(), &out);
    let total: usize = out.iter().product();
    let mut index: Dims = SmallVec::from_elem(0, out.len());
    let mut values = Vec::with_capacity(total);
    let (mut ia, mut ib) = (0usize, 0usize);
    for _ in 0..total {
        values.push(f(av[ia], bv[ib]));
        // Odometer increment over the output index.
        for k in (0..out.len()).rev() {
            index[k] += 1;
            ia += sa[k];
            ib += sb[k];
            if index[k] < out[k] {
                break;
            }
            ia -= sa[k] * out[k];
            ib -= sb[k] * out[k];
            index[k] = 0;
        }
    }
    Ok(Dataset::from_float(&out, values)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(shape: &[usize], v: Vec<f64>) -> Dataset {
        Dataset::from_float(shape, v).unwrap()
    }

    #[test]
    fn shapes() {
        assert_eq!(broadcast_shape(&[4, 3, 3], &[]).unwrap(), vec![4, 3, 3]);
        assert_eq!(broadcast_shape(&[4, 1], &[1, 3]).unwrap(), vec![4, 3]);
        assert_eq!(broadcast_shape(&[4, 3, 3], &[3, 3]).unwrap(), vec![4, 3, 3]);
        assert!(broadcast_shape(&[4, 3], &[4]).is_err());
    }

    #[test]
    fn scalar_with_array() {
        let a = d(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let out = zip(&a, &Dataset::scalar(10.0), |x, y| x * y).unwrap();
        assert_eq!(out.as_float().unwrap(), &[10.0, 20.0, 30.0, 40.0]);
        let out = zip(&Dataset::scalar(1.0), &a, |x, y| x - y).unwrap();
        assert_eq!(out.as_float().unwrap(), &[0.0, -1.0, -2.0, -3.0]);
    }

    #[test]
    fn row_scalar_against_vectors() {
        // Per-sample scalars [N,1] against per-sample vectors [N,3].
        let s = d(&[2, 1], vec![2.0, 3.0]);
        let v = d(&[2, 3], vec![1.0, 1.0, 1.0, 1.0, 2.0, 3.0]);
        let out = zip(&v, &s, |x, y| x / y).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(
            out.as_float().unwrap(),
            &[0.5, 0.5, 0.5, 1.0 / 3.0, 2.0 / 3.0, 1.0]
        );
    }

    #[test]
    fn outer_broadcast() {
        let col = d(&[2, 1], vec![1.0, 2.0]);
        let row = d(&[1, 3], vec![10.0, 20.0, 30.0]);
        let out = zip(&col, &row, |x, y| x + y).unwrap();
        assert_eq!(out.as_float().unwrap(), &[11.0, 21.0, 31.0, 12.0, 22.0, 32.0]);
    }

    #[test]
    fn mismatch_is_an_error() {
        let a = d(&[2, 3], vec![0.0; 6]);
        let b = d(&[2], vec![0.0; 2]);
        assert!(matches!(
            zip(&a, &b, |x, y| x + y),
            Err(ExprError::Broadcast { .. })
        ));
    }

    #[test]
    fn int_operands_become_float() {
        let a = Dataset::from_int(&[2], vec![-1, 2]).unwrap();
        let out = map(&a, f64::abs).unwrap();
        assert_eq!(out.as_float().unwrap(), &[1.0, 2.0]);
    }
}
