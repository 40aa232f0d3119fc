//! Built-in derived fields.
//!
//! Every `add_*` operation of [`Results`](crate::Results) is a fixed
//! formula over the mechanics function table returned by
//! [`mechanics_table`], so built-in and user-defined derivations share
//! one validation and evaluation path.

use strata_core::{Dataset, ExprError, MechError};
use strata_expr::FunctionTable;
use strata_mech::orientation::{self, direction_label};
use strata_mech::{mechanics, tensor};
use strata_mech::{EigenRank, MisesKind, NormOrder, StretchKind};

/// Unit of a derived field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unit {
    /// A fixed unit.
    Fixed(String),
    /// The unit of the named input field.
    SameAs(String),
}

impl Unit {
    fn fixed(unit: &str) -> Self {
        Self::Fixed(unit.to_string())
    }
}

/// What to compute and how to describe it.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivation {
    /// Label of the new field.
    pub name: String,
    /// Formula over `#label#` placeholders.
    pub formula: String,
    /// Unit of the new field.
    pub unit: Unit,
    /// Description of the new field.
    pub description: String,
}

impl Derivation {
    fn new(name: String, formula: String, unit: Unit, description: String) -> Self {
        Self {
            name,
            formula,
            unit,
            description,
        }
    }
}

// ── Templates ────────────────────────────────────────────────────

/// `|x|`: elementwise absolute value.
pub fn absolute(x: &str) -> Derivation {
    Derivation::new(
        format!("|{x}|"),
        format!("abs(#{x}#)"),
        Unit::SameAs(x.into()),
        format!("absolute value of {x}"),
    )
}

/// `sigma`: Cauchy stress from first Piola-Kirchhoff stress and
/// deformation gradient.
pub fn stress_cauchy(p: &str, f: &str) -> Derivation {
    Derivation::new(
        "sigma".into(),
        format!("stress_cauchy(#{p}#, #{f}#)"),
        Unit::SameAs(p.into()),
        format!("Cauchy stress calculated from {p} and {f}"),
    )
}

/// `S`: second Piola-Kirchhoff stress.
pub fn stress_second_piola_kirchhoff(p: &str, f: &str) -> Derivation {
    Derivation::new(
        "S".into(),
        format!("stress_second_piola_kirchhoff(#{p}#, #{f}#)"),
        Unit::SameAs(p.into()),
        format!("second Piola-Kirchhoff stress calculated from {p} and {f}"),
    )
}

/// `det(T)`.
pub fn determinant(t: &str) -> Derivation {
    Derivation::new(
        format!("det({t})"),
        format!("det(#{t}#)"),
        Unit::SameAs(t.into()),
        format!("determinant of tensor {t}"),
    )
}

/// `s_T`: deviatoric part.
pub fn deviator(t: &str) -> Derivation {
    Derivation::new(
        format!("s_{t}"),
        format!("deviatoric(#{t}#)"),
        Unit::SameAs(t.into()),
        format!("deviator of tensor {t}"),
    )
}

/// `p_T`: spherical part (mean of the diagonal).
pub fn spherical(t: &str) -> Derivation {
    Derivation::new(
        format!("p_{t}"),
        format!("spherical(#{t}#)"),
        Unit::SameAs(t.into()),
        format!("spherical component of tensor {t}"),
    )
}

/// `lambda_<rank>(T)`.
pub fn eigenvalue(t: &str, rank: EigenRank) -> Derivation {
    Derivation::new(
        format!("lambda_{rank}({t})"),
        format!("eigenvalue_{rank}(#{t}#)"),
        Unit::SameAs(t.into()),
        format!("{rank} eigenvalue of {t}"),
    )
}

/// `v_<rank>(T)`.
pub fn eigenvector(t: &str, rank: EigenRank) -> Derivation {
    Derivation::new(
        format!("v_{rank}({t})"),
        format!("eigenvector_{rank}(#{t}#)"),
        Unit::fixed("1"),
        format!("eigenvector corresponding to {rank} eigenvalue of {t}"),
    )
}

/// `T_vM`: von Mises equivalent of a stress or strain.
pub fn equivalent_mises(t: &str, kind: MisesKind) -> Derivation {
    Derivation::new(
        format!("{t}_vM"),
        format!("mises_{kind}(#{t}#)"),
        Unit::SameAs(t.into()),
        format!("equivalent von Mises {kind} of {t}"),
    )
}

/// `max_shear(T)`.
pub fn maximum_shear(t: &str) -> Derivation {
    Derivation::new(
        format!("max_shear({t})"),
        format!("maximum_shear(#{t}#)"),
        Unit::SameAs(t.into()),
        format!("maximum shear component of {t}"),
    )
}

/// `|x|_<ord>`.
pub fn norm(x: &str, ord: NormOrder) -> Derivation {
    Derivation::new(
        format!("|{x}|_{ord}"),
        format!("norm_{ord}(#{x}#)"),
        Unit::SameAs(x.into()),
        format!("{ord}-norm of {x}"),
    )
}

/// `R(F)`: rotational part of the polar decomposition.
pub fn rotation(f: &str) -> Derivation {
    Derivation::new(
        format!("R({f})"),
        format!("rotation(#{f}#)"),
        Unit::fixed("1"),
        format!("rotational part of {f}"),
    )
}

/// `epsilon_<t>^<m>(F)`: Seth-Hill strain.
pub fn strain(f: &str, kind: StretchKind, m: f64) -> Result<Derivation, ExprError> {
    let m = finite("Seth-Hill exponent", m)?;
    Ok(Derivation::new(
        format!("epsilon_{kind}^{m:?}({f})"),
        format!("strain_{kind}(#{f}#, {m:?})"),
        Unit::fixed("1"),
        format!("strain tensor of {f} based on {kind} with Seth-Hill exponent {m:?}"),
    ))
}

/// `<t>(F)`: left or right stretch tensor.
pub fn stretch_tensor(f: &str, kind: StretchKind) -> Derivation {
    let side = match kind {
        StretchKind::V => "left",
        StretchKind::U => "right",
    };
    Derivation::new(
        format!("{kind}({f})"),
        format!("stretch_{kind}(#{f}#)"),
        Unit::SameAs(f.into()),
        format!("{side} stretch tensor of {f}"),
    )
}

/// `IPFcolor_(h k l)`: inverse pole figure colors of sample direction `d`.
pub fn ipf_color(q: &str, d: [f64; 3]) -> Result<Derivation, ExprError> {
    let [x, y, z] = direction("sample direction", d)?;
    let label = direction_label(d);
    Ok(Derivation::new(
        format!("IPFcolor_({label})"),
        format!("ipf_color(#{q}#, {x:?}, {y:?}, {z:?})"),
        Unit::fixed("8-bit RGB"),
        format!("inverse pole figure colors of {q} along sample direction [{label}]"),
    ))
}

/// `p^xy_[u v w]` or `p^rφ_[u v w]`: stereographic projection of the
/// crystal direction `uvw`.
pub fn pole(q: &str, uvw: [f64; 3], polar: bool) -> Result<Derivation, ExprError> {
    let [u, v, w] = direction("crystal direction", uvw)?;
    let label = direction_label(uvw);
    let (tag, function, frame) = if polar {
        ("rφ", "pole_polar", "polar")
    } else {
        ("xy", "pole_xy", "Cartesian")
    };
    Ok(Derivation::new(
        format!("p^{tag}_[{label}]"),
        format!("{function}(#{q}#, {u:?}, {v:?}, {w:?})"),
        Unit::fixed("1"),
        format!("{frame} coordinates of stereographic projection of pole [{label}] of {q}"),
    ))
}

fn finite(what: &str, v: f64) -> Result<f64, MechError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MechError::InvalidArgument {
            reason: format!("{what} must be finite, got {v}"),
        })
    }
}

fn direction(what: &str, d: [f64; 3]) -> Result<[f64; 3], MechError> {
    for v in d {
        finite(what, v)?;
    }
    Ok(d)
}

// ── Function table ───────────────────────────────────────────────

/// The built-ins plus every kernel the templates above call.
pub fn mechanics_table() -> Result<FunctionTable, ExprError> {
    let mut t = FunctionTable::new();

    t.register("stress_cauchy", binary("stress_cauchy", mechanics::stress_cauchy))?;
    t.register(
        "stress_second_piola_kirchhoff",
        binary("stress_second_piola_kirchhoff", mechanics::stress_second_piola_kirchhoff),
    )?;
    t.register("det", unary("det", tensor::determinant))?;
    t.register("deviatoric", unary("deviatoric", tensor::deviatoric))?;
    t.register("spherical", unary("spherical", tensor::spherical))?;
    t.register("maximum_shear", unary("maximum_shear", tensor::maximum_shear))?;
    t.register("rotation", unary("rotation", mechanics::rotation))?;

    for rank in [EigenRank::Max, EigenRank::Mid, EigenRank::Min] {
        let name = format!("eigenvalue_{rank}");
        t.register(name.clone(), unary(name, move |x| tensor::eigenvalue(x, rank)))?;
        let name = format!("eigenvector_{rank}");
        t.register(name.clone(), unary(name, move |x| tensor::eigenvector(x, rank)))?;
    }
    for kind in [MisesKind::Stress, MisesKind::Strain] {
        let name = format!("mises_{kind}");
        t.register(name.clone(), unary(name, move |x| tensor::equivalent_mises(x, kind)))?;
    }
    for ord in [NormOrder::One, NormOrder::Two, NormOrder::Inf, NormOrder::Fro] {
        let name = format!("norm_{ord}");
        t.register(name.clone(), unary(name, move |x| tensor::norm(x, ord)))?;
    }
    for kind in [StretchKind::V, StretchKind::U] {
        let name = format!("stretch_{kind}");
        t.register(name.clone(), unary(name, move |x| mechanics::stretch(x, kind)))?;

        let name = format!("strain_{kind}");
        let function = name.clone();
        t.register(name, move |args: &[Dataset]| {
            let [f, m] = args else {
                return Err(arity(&function, 2, args.len()));
            };
            Ok(mechanics::strain(f, kind, scalar(&function, m)?)?)
        })?;
    }

    t.register("ipf_color", |args: &[Dataset]| {
        let (q, d) = orientation_args("ipf_color", args)?;
        Ok(orientation::ipf_color(q, d)?)
    })?;
    for (name, polar) in [("pole_xy", false), ("pole_polar", true)] {
        t.register(name, move |args: &[Dataset]| {
            let (q, uvw) = orientation_args(name, args)?;
            Ok(orientation::pole(q, uvw, polar)?)
        })?;
    }
    Ok(t)
}

fn unary<F>(
    name: impl Into<String>,
    kernel: F,
) -> impl Fn(&[Dataset]) -> Result<Dataset, ExprError> + Send + Sync + 'static
where
    F: Fn(&Dataset) -> Result<Dataset, MechError> + Send + Sync + 'static,
{
    let name = name.into();
    move |args: &[Dataset]| {
        let [x] = args else {
            return Err(arity(&name, 1, args.len()));
        };
        Ok(kernel(x)?)
    }
}

fn binary(
    name: &'static str,
    kernel: fn(&Dataset, &Dataset) -> Result<Dataset, MechError>,
) -> impl Fn(&[Dataset]) -> Result<Dataset, ExprError> + Send + Sync + 'static {
    move |args: &[Dataset]| {
        let [a, b] = args else {
            return Err(arity(name, 2, args.len()));
        };
        Ok(kernel(a, b)?)
    }
}

/// `(q, x, y, z)` with scalar direction components.
fn orientation_args<'a>(
    name: &str,
    args: &'a [Dataset],
) -> Result<(&'a Dataset, [f64; 3]), ExprError> {
    let [q, x, y, z] = args else {
        return Err(arity(name, 4, args.len()));
    };
    Ok((q, [scalar(name, x)?, scalar(name, y)?, scalar(name, z)?]))
}

fn scalar(name: &str, d: &Dataset) -> Result<f64, ExprError> {
    match d.to_float().as_ref() {
        [v] => Ok(*v),
        other => Err(ExprError::Function {
            name: name.to_string(),
            reason: format!("expected a scalar argument, got {} values", other.len()),
        }),
    }
}

fn arity(function: &str, expected: usize, found: usize) -> ExprError {
    ExprError::Arity {
        function: function.to_string(),
        expected,
        found,
    }
}
