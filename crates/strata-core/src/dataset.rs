//! Typed n-dimensional arrays and their provenance attributes.
//!
//! A [`Dataset`] is the unit of storage: a row-major buffer of `f64` or
//! `i64` values, a [`Shape`] whose leading axis counts samples, and the
//! [`Attributes`] stamped on it when it was written.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use smallvec::SmallVec;

use crate::error::ShapeError;
use crate::lattice::Lattice;

/// Shape of a dataset. The leading axis is the sample count; the
/// remaining axes form the per-sample shape (`[]`, `[3]`, `[3, 3]`, ...).
pub type Shape = SmallVec<[usize; 4]>;

/// `strftime` format of the [`Attributes::created`] timestamp.
pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Element type of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// 64-bit floating point.
    Float,
    /// 64-bit signed integer.
    Int,
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "f8"),
            Self::Int => write!(f, "i8"),
        }
    }
}

/// Flat, row-major element storage.
#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    /// Floating-point elements.
    Float(Vec<f64>),
    /// Integer elements.
    Int(Vec<i64>),
}

impl Values {
    /// `n` elements holding the fill sentinel of `dtype`
    /// (`NaN` for floats, `0` for integers).
    pub fn filled(dtype: Dtype, n: usize) -> Self {
        match dtype {
            Dtype::Float => Self::Float(vec![f64::NAN; n]),
            Dtype::Int => Self::Int(vec![0; n]),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type.
    pub fn dtype(&self) -> Dtype {
        match self {
            Self::Float(_) => Dtype::Float,
            Self::Int(_) => Dtype::Int,
        }
    }
}

/// Metadata attached to every dataset.
///
/// `creator`, `created` and `formula` form the provenance stamp written
/// by the derive engine; solver output usually carries only `unit` and
/// `description`. Orientation data additionally carries its `lattice`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes {
    /// Physical unit, e.g. `"Pa"` or `"1"`.
    pub unit: Option<String>,
    /// Free-text note.
    pub description: Option<String>,
    /// Identity of the program that wrote the dataset.
    pub creator: Option<String>,
    /// Creation time, formatted with [`CREATED_FORMAT`].
    pub created: Option<String>,
    /// Formula or operation the dataset was computed with.
    pub formula: Option<String>,
    /// Bravais lattice of orientation data.
    pub lattice: Option<Lattice>,
}

impl Attributes {
    /// Attributes carrying only a unit and a description.
    pub fn described(unit: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            unit: Some(unit.into()),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Parse the `created` stamp, if present and well-formed.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        let created = self.created.as_deref()?;
        DateTime::parse_from_str(created, CREATED_FORMAT).ok()
    }
}

/// A typed n-dimensional array with attributes.
///
/// # Examples
///
/// ```
/// use strata_core::{Dataset, Dtype};
///
/// let d = Dataset::from_float(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// assert_eq!(d.rows(), 2);
/// assert_eq!(d.sample_shape(), &[3]);
/// assert_eq!(d.dtype(), Dtype::Float);
///
/// let picked = d.take_rows(&[1]).unwrap();
/// assert_eq!(picked.as_float().unwrap(), &[4.0, 5.0, 6.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    shape: Shape,
    values: Values,
    attrs: Attributes,
}

impl Dataset {
    /// Create a dataset, checking that `values` fills `shape` exactly.
    pub fn new(shape: &[usize], values: Values) -> Result<Self, ShapeError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(ShapeError::ElementCount {
                shape: shape.to_vec(),
                found: values.len(),
            });
        }
        Ok(Self {
            shape: Shape::from_slice(shape),
            values,
            attrs: Attributes::default(),
        })
    }

    /// Create a floating-point dataset.
    pub fn from_float(shape: &[usize], data: Vec<f64>) -> Result<Self, ShapeError> {
        Self::new(shape, Values::Float(data))
    }

    /// Create an integer dataset.
    pub fn from_int(shape: &[usize], data: Vec<i64>) -> Result<Self, ShapeError> {
        Self::new(shape, Values::Int(data))
    }

    /// A zero-dimensional floating-point dataset.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Shape::new(),
            values: Values::Float(vec![value]),
            attrs: Attributes::default(),
        }
    }

    /// A zero-dimensional integer dataset.
    pub fn scalar_int(value: i64) -> Self {
        Self {
            shape: Shape::new(),
            values: Values::Int(vec![value]),
            attrs: Attributes::default(),
        }
    }

    /// A one-dimensional dataset holding `values` as its samples.
    pub fn column(values: Values) -> Self {
        let mut shape = Shape::new();
        shape.push(values.len());
        Self {
            shape,
            values,
            attrs: Attributes::default(),
        }
    }

    /// `rows` samples of `sample_shape`, every element the fill sentinel.
    pub fn filled(rows: usize, sample_shape: &[usize], dtype: Dtype) -> Self {
        let mut shape = Shape::with_capacity(sample_shape.len() + 1);
        shape.push(rows);
        shape.extend_from_slice(sample_shape);
        let n = rows * sample_shape.iter().product::<usize>();
        Self {
            shape,
            values: Values::filled(dtype, n),
            attrs: Attributes::default(),
        }
    }

    /// Replace the attributes.
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// Full shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of samples (size of the leading axis; 1 for 0-d data).
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Per-sample shape (all axes after the leading one).
    pub fn sample_shape(&self) -> &[usize] {
        if self.shape.is_empty() {
            &[]
        } else {
            &self.shape[1..]
        }
    }

    /// Number of elements per sample.
    pub fn sample_size(&self) -> usize {
        self.sample_shape().iter().product()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the dataset holds no elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element type.
    pub fn dtype(&self) -> Dtype {
        self.values.dtype()
    }

    /// Element storage.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Consume the dataset and return its element storage.
    pub fn into_values(self) -> Values {
        self.values
    }

    /// Attributes.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Mutable attributes.
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// Floating-point elements, if the dtype is [`Dtype::Float`].
    pub fn as_float(&self) -> Option<&[f64]> {
        match &self.values {
            Values::Float(v) => Some(v),
            Values::Int(_) => None,
        }
    }

    /// Integer elements, if the dtype is [`Dtype::Int`].
    pub fn as_int(&self) -> Option<&[i64]> {
        match &self.values {
            Values::Int(v) => Some(v),
            Values::Float(_) => None,
        }
    }

    /// Elements as `f64`, converting integers.
    pub fn to_float(&self) -> Cow<'_, [f64]> {
        match &self.values {
            Values::Float(v) => Cow::Borrowed(v),
            Values::Int(v) => Cow::Owned(v.iter().map(|&x| x as f64).collect()),
        }
    }

    /// Same elements under a new shape with the same element count.
    pub fn reshape(mut self, shape: &[usize]) -> Result<Self, ShapeError> {
        let expected: usize = shape.iter().product();
        if expected != self.values.len() {
            return Err(ShapeError::ElementCount {
                shape: shape.to_vec(),
                found: self.values.len(),
            });
        }
        self.shape = Shape::from_slice(shape);
        Ok(self)
    }

    /// Gather the given samples into a new dataset, in order.
    ///
    /// Attributes are carried over.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Self, ShapeError> {
        let n = self.rows();
        let k = self.sample_size();
        if let Some(&bad) = rows.iter().find(|&&r| r >= n) {
            return Err(ShapeError::RowOutOfBounds { row: bad, rows: n });
        }
        let values = match &self.values {
            Values::Float(v) => Values::Float(gather(v, rows, k)),
            Values::Int(v) => Values::Int(gather(v, rows, k)),
        };
        let mut shape = Shape::with_capacity(self.shape.len().max(1));
        shape.push(rows.len());
        shape.extend_from_slice(self.sample_shape());
        Ok(Self {
            shape,
            values,
            attrs: self.attrs.clone(),
        })
    }

    /// Copy sample `from[i]` of `src` into sample `at[i]` of `self`.
    ///
    /// Sample shapes must match. Integer sources may be scattered into a
    /// floating-point destination; the reverse is a dtype error.
    pub fn scatter_rows(
        &mut self,
        at: &[usize],
        src: &Dataset,
        from: &[usize],
    ) -> Result<(), ShapeError> {
        if self.sample_shape() != src.sample_shape() {
            return Err(ShapeError::SampleShape {
                expected: self.sample_shape().to_vec(),
                found: src.sample_shape().to_vec(),
            });
        }
        if at.len() != from.len() {
            return Err(ShapeError::ElementCount {
                shape: vec![at.len()],
                found: from.len(),
            });
        }
        let rows = self.rows();
        if let Some(&bad) = at.iter().find(|&&r| r >= rows) {
            return Err(ShapeError::RowOutOfBounds { row: bad, rows });
        }
        let src_rows = src.rows();
        if let Some(&bad) = from.iter().find(|&&r| r >= src_rows) {
            return Err(ShapeError::RowOutOfBounds {
                row: bad,
                rows: src_rows,
            });
        }
        let k = self.sample_size();
        match (&mut self.values, &src.values) {
            (Values::Float(dst), Values::Float(s)) => scatter(dst, at, s, from, k),
            (Values::Int(dst), Values::Int(s)) => scatter(dst, at, s, from, k),
            (Values::Float(dst), Values::Int(s)) => {
                let s: Vec<f64> = s.iter().map(|&x| x as f64).collect();
                scatter(dst, at, &s, from, k);
            }
            (Values::Int(_), Values::Float(_)) => {
                return Err(ShapeError::Dtype {
                    expected: Dtype::Int,
                    found: Dtype::Float,
                });
            }
        }
        Ok(())
    }

    /// Returns `true` if the dataset carries no defined value: it is
    /// empty, or it is floating point and every element is `NaN`.
    pub fn is_undefined(&self) -> bool {
        match &self.values {
            Values::Float(v) => v.iter().all(|x| x.is_nan()),
            Values::Int(v) => v.is_empty(),
        }
    }

    /// Elementwise closeness test with `|a - b| <= atol + rtol * |b|`.
    ///
    /// Shapes must match. `NaN` compares equal to `NaN`.
    pub fn allclose(&self, other: &Dataset, rtol: f64, atol: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        let a = self.to_float();
        let b = other.to_float();
        a.iter().zip(b.iter()).all(|(&x, &y)| {
            if x.is_nan() || y.is_nan() {
                x.is_nan() && y.is_nan()
            } else {
                (x - y).abs() <= atol + rtol * y.abs()
            }
        })
    }
}

fn gather<T: Copy>(src: &[T], rows: &[usize], k: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len() * k);
    for &r in rows {
        out.extend_from_slice(&src[r * k..(r + 1) * k]);
    }
    out
}

fn scatter<T: Copy>(dst: &mut [T], at: &[usize], src: &[T], from: &[usize], k: usize) {
    for (&a, &f) in at.iter().zip(from) {
        dst[a * k..(a + 1) * k].copy_from_slice(&src[f * k..(f + 1) * k]);
    }
}
