//! Error types for the Strata workspace.
//!
//! Organized by subsystem: array shapes, the hierarchical store, the
//! expression evaluator, the mechanics kernels, and the result view.

use std::error::Error;
use std::fmt;
use std::io;

use crate::dataset::Dtype;

/// Array shape and indexing errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// The element count does not fill the requested shape.
    ElementCount {
        /// Requested shape.
        shape: Vec<usize>,
        /// Number of elements supplied.
        found: usize,
    },
    /// Per-sample shapes of two datasets differ.
    SampleShape {
        /// Shape required by the destination.
        expected: Vec<usize>,
        /// Shape of the source.
        found: Vec<usize>,
    },
    /// A sample index is outside the leading axis.
    RowOutOfBounds {
        /// Offending index.
        row: usize,
        /// Length of the leading axis.
        rows: usize,
    },
    /// The element type cannot be converted.
    Dtype {
        /// Required dtype.
        expected: Dtype,
        /// Supplied dtype.
        found: Dtype,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementCount { shape, found } => {
                write!(f, "{found} elements cannot fill shape {shape:?}")
            }
            Self::SampleShape { expected, found } => {
                write!(f, "sample shape {found:?} does not match {expected:?}")
            }
            Self::RowOutOfBounds { row, rows } => {
                write!(f, "sample {row} out of bounds for {rows} samples")
            }
            Self::Dtype { expected, found } => {
                write!(f, "cannot store {found} data as {expected}")
            }
        }
    }
}

impl Error for ShapeError {}

/// Errors from a [`Store`](crate::Store) backend.
#[derive(Debug)]
pub enum StoreError {
    /// An I/O error occurred while loading or committing a container.
    Io(io::Error),
    /// The file does not start with the expected `b"STRA"` magic bytes.
    InvalidMagic,
    /// The container format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// A node record could not be decoded (truncated or corrupt data).
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// No node exists at the path.
    NotFound {
        /// The missing path.
        path: String,
    },
    /// The path names a dataset where a group is required, or vice versa.
    KindConflict {
        /// The conflicting path.
        path: String,
    },
    /// A dataset violates its own shape.
    Shape(ShapeError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"STRA\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported container version {found}")
            }
            Self::Malformed { detail } => write!(f, "malformed container: {detail}"),
            Self::NotFound { path } => write!(f, "no node at '{path}'"),
            Self::KindConflict { path } => {
                write!(f, "'{path}' is a group where a dataset is expected or vice versa")
            }
            Self::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ShapeError> for StoreError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

/// Errors from the mechanics and orientation kernels.
#[derive(Clone, Debug, PartialEq)]
pub enum MechError {
    /// The per-sample shape is not what the kernel operates on.
    SampleShape {
        /// Kernel name.
        kernel: &'static str,
        /// Required per-sample shape.
        expected: Vec<usize>,
        /// Supplied per-sample shape.
        found: Vec<usize>,
    },
    /// Two inputs disagree on their sample count.
    RowMismatch {
        /// Sample count of the first input.
        left: usize,
        /// Sample count of the second input.
        right: usize,
    },
    /// Orientation data carries no lattice metadata.
    MissingLattice,
    /// A tensor that must be inverted is singular.
    Singular {
        /// Index of the offending sample.
        row: usize,
    },
    /// A scalar argument is out of its domain.
    InvalidArgument {
        /// Description of the violated domain.
        reason: String,
    },
    /// Array construction failed.
    Shape(ShapeError),
}

impl fmt::Display for MechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleShape {
                kernel,
                expected,
                found,
            } => write!(
                f,
                "{kernel} expects samples of shape {expected:?}, got {found:?}"
            ),
            Self::RowMismatch { left, right } => {
                write!(f, "sample counts differ: {left} vs {right}")
            }
            Self::MissingLattice => write!(f, "orientation data carries no lattice"),
            Self::Singular { row } => write!(f, "singular tensor at sample {row}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl Error for MechError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MechError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

/// Errors from parsing, validating, or evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprError {
    /// The formula is not a valid expression. Raised before any
    /// evaluation takes place.
    Malformed {
        /// The offending formula.
        formula: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The formula calls a function not present in the function table.
    UnknownFunction {
        /// The unknown name.
        name: String,
    },
    /// A user function tried to take the name of a built-in.
    ReservedName {
        /// The reserved name.
        name: String,
    },
    /// A placeholder has no bound dataset at evaluation time.
    Unbound {
        /// The unbound label.
        label: String,
    },
    /// A function was called with the wrong number of arguments.
    Arity {
        /// Function name.
        function: String,
        /// Accepted argument count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },
    /// Two operand shapes cannot be broadcast together.
    Broadcast {
        /// Left operand shape.
        left: Vec<usize>,
        /// Right operand shape.
        right: Vec<usize>,
    },
    /// A user function reported a failure.
    Function {
        /// Function name.
        name: String,
        /// Reported reason.
        reason: String,
    },
    /// A mechanics kernel failed.
    Mech(MechError),
    /// Array construction failed.
    Shape(ShapeError),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { formula, reason } => {
                write!(f, "malformed formula '{formula}': {reason}")
            }
            Self::UnknownFunction { name } => write!(f, "unknown function '{name}'"),
            Self::ReservedName { name } => {
                write!(f, "'{name}' is a built-in function and cannot be replaced")
            }
            Self::Unbound { label } => write!(f, "placeholder '#{label}#' is not bound"),
            Self::Arity {
                function,
                expected,
                found,
            } => write!(
                f,
                "{function} takes {expected} argument(s), {found} given"
            ),
            Self::Broadcast { left, right } => {
                write!(f, "shapes {left:?} and {right:?} cannot be broadcast")
            }
            Self::Function { name, reason } => write!(f, "{name} failed: {reason}"),
            Self::Mech(e) => write!(f, "{e}"),
            Self::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl Error for ExprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mech(e) => Some(e),
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MechError> for ExprError {
    fn from(e: MechError) -> Self {
        Self::Mech(e)
    }
}

impl From<ShapeError> for ExprError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}

/// Errors from the result view: selection, write guard, geometry, export.
#[derive(Debug)]
pub enum ResultError {
    /// The view axis name is not one of `increments`, `times`, `phases`,
    /// `homogenizations`.
    InvalidAxis {
        /// The rejected name.
        name: String,
    },
    /// The operation requires modification to be allowed.
    PermissionDenied {
        /// Operation that was refused.
        operation: &'static str,
    },
    /// The container lacks required geometry or mapping data.
    MissingGeometry {
        /// What is missing or inconsistent.
        detail: String,
    },
    /// Export preconditions are not met.
    Export {
        /// Why the export was refused.
        reason: String,
    },
    /// The store lock was poisoned by a panicking writer.
    Poisoned,
    /// A store operation failed.
    Store(StoreError),
    /// A formula failed validation.
    Expr(ExprError),
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAxis { name } => write!(f, "invalid view axis '{name}'"),
            Self::PermissionDenied { operation } => {
                write!(f, "{operation} requires modification to be allowed")
            }
            Self::MissingGeometry { detail } => write!(f, "missing geometry: {detail}"),
            Self::Export { reason } => write!(f, "export refused: {reason}"),
            Self::Poisoned => write!(f, "store lock poisoned"),
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Expr(e) => write!(f, "expression error: {e}"),
        }
    }
}

impl Error for ResultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Expr(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ResultError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<ExprError> for ResultError {
    fn from(e: ExprError) -> Self {
        Self::Expr(e)
    }
}
