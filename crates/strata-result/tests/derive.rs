//! Derived fields across visible groups: values, stamps, write policy.

use strata_core::{
    Dataset, Dtype, ExprError, GroupKey, IncrementId, Lattice, MechError, PartitionKind,
    ResultError, Store, StoreError,
};
use strata_mech::{MisesKind, NormOrder, StretchKind};
use strata_result::guard::CREATOR;
use strata_result::{Constituents, GroupOutcome, Layout, Results};
use strata_store::MemoryStore;
use strata_test_utils::fixtures::{self, PHASES};
use strata_test_utils::SteppingClock;

// ── Helpers ─────────────────────────────────────────────────────

fn results() -> Results<MemoryStore> {
    Results::new(fixtures::polycrystal()).unwrap()
}

fn phase(increment: u32, name: &str) -> GroupKey {
    GroupKey::new(IncrementId(increment), PartitionKind::Phase, name)
}

fn read(r: &Results<MemoryStore>, group: &GroupKey, label: &str) -> Option<Dataset> {
    r.with_store(|s| s.read_array(&group.field(label))).unwrap()
}

fn is_skipped(o: &GroupOutcome) -> bool {
    matches!(o, GroupOutcome::Skipped { .. })
}

// ── Formula templates ───────────────────────────────────────────

#[test]
fn norm_in_first_increment_only() {
    let r = results();
    let report = r
        .view("increments", 0)
        .unwrap()
        .add_norm("F", NormOrder::Two)
        .unwrap();

    assert_eq!(report.name, "|F|_2");
    assert_eq!(report.written().count(), 3);
    // The homogenization holds no F.
    assert_eq!(report.count(is_skipped), 1);

    for (i, name) in PHASES.iter().enumerate() {
        let d = read(&r, &phase(0, name), "|F|_2").unwrap();
        assert_eq!(d.shape(), &[2]);
        let values = d.as_float().unwrap();
        for (row, &v) in values.iter().enumerate() {
            let expected = fixtures::spectral_norm_of_shear(fixtures::shear(0, i, row));
            assert!((v - expected).abs() < 1e-10, "{name}[{row}]: {v} vs {expected}");
        }
        let attrs = d.attrs();
        assert_eq!(attrs.unit.as_deref(), Some("1"));
        assert_eq!(attrs.description.as_deref(), Some("2-norm of F"));
        assert_eq!(attrs.formula.as_deref(), Some("norm_2(#F#)"));
        assert_eq!(attrs.creator.as_deref(), Some(CREATOR));
        assert!(attrs.created_at().is_some());

        assert!(read(&r, &phase(10, name), "|F|_2").is_none());
    }
}

#[test]
fn stress_units_follow_the_input() {
    let r = results();
    r.add_stress_cauchy("P", "F").unwrap();
    r.add_equivalent_mises("P", MisesKind::Stress).unwrap();

    let sigma = read(&r, &phase(10, "beta"), "sigma").unwrap();
    assert_eq!(sigma.shape(), &[2, 3, 3]);
    assert_eq!(sigma.attrs().unit.as_deref(), Some("Pa"));

    // Uniaxial P: the von Mises equivalent is the axial value.
    let mises = read(&r, &phase(0, "gamma"), "P_vM").unwrap();
    let p = fixtures::pressure(2);
    for &v in mises.as_float().unwrap() {
        assert!((v - p).abs() < 1e-6 * p);
    }
}

#[test]
fn strain_of_pure_shear_is_traceless_at_m_zero() {
    let r = results();
    let report = r.add_strain("F", StretchKind::V, 0.0).unwrap();
    assert_eq!(report.name, "epsilon_V^0.0(F)");

    let eps = read(&r, &phase(0, "alpha"), "epsilon_V^0.0(F)").unwrap();
    assert_eq!(eps.attrs().unit.as_deref(), Some("1"));
    let v = eps.as_float().unwrap();
    // det F = 1, so the logarithmic strain has zero trace.
    for sample in v.chunks(9) {
        assert!((sample[0] + sample[4] + sample[8]).abs() < 1e-10);
    }
}

#[test]
fn determinant_of_shear_is_one() {
    let r = results();
    r.add_determinant("F").unwrap();
    for name in PHASES {
        let det = read(&r, &phase(10, name), "det(F)").unwrap();
        for &v in det.as_float().unwrap() {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }
}

#[test]
fn orientation_without_lattice_is_reported() {
    let r = results();
    let report = r.add_ipf_color([0.0, 0.0, 1.0], "O").unwrap();
    assert_eq!(report.name, "IPFcolor_(0 0 1)");

    // alpha and beta carry cI; gamma has no lattice.
    assert_eq!(report.written().count(), 4);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 2);
    for (group, e) in failures {
        assert_eq!(group.name, "gamma");
        assert_eq!(e, &ExprError::Mech(MechError::MissingLattice));
    }
    assert!(read(&r, &phase(0, "gamma"), "IPFcolor_(0 0 1)").is_none());

    let rgb = read(&r, &phase(0, "alpha"), "IPFcolor_(0 0 1)").unwrap();
    assert_eq!(rgb.dtype(), Dtype::Int);
    assert_eq!(rgb.shape(), &[2, 3]);
    assert_eq!(&rgb.as_int().unwrap()[..3], &[255, 0, 0]);
    assert_eq!(rgb.attrs().unit.as_deref(), Some("8-bit RGB"));
}

#[test]
fn copied_orientations_keep_their_lattice() {
    let r = results();
    r.add_calculation("O2", "#O#", "1", "copy of O").unwrap();
    let copy = read(&r, &phase(0, "alpha"), "O2").unwrap();
    assert_eq!(copy.attrs().lattice, Some(Lattice::CI));
    assert_eq!(read(&r, &phase(0, "gamma"), "O2").unwrap().attrs().lattice, None);

    let report = r.add_ipf_color([0.0, 0.0, 1.0], "O2").unwrap();
    assert_eq!(report.written().count(), 4);
    assert_eq!(report.failures().count(), 2);
    // Only a shape-preserving copy inherits the lattice.
    let rgb = read(&r, &phase(0, "alpha"), "IPFcolor_(0 0 1)").unwrap();
    assert_eq!(rgb.attrs().lattice, None);
}

#[test]
fn non_finite_parameters_are_rejected() {
    let r = results();
    for err in [
        r.add_strain("F", StretchKind::U, f64::NAN).unwrap_err(),
        r.add_ipf_color([0.0, f64::INFINITY, 1.0], "O").unwrap_err(),
        r.add_pole("O", [f64::NAN, 0.0, 1.0], false).unwrap_err(),
    ] {
        assert!(matches!(
            err,
            ResultError::Expr(ExprError::Mech(MechError::InvalidArgument { .. }))
        ));
    }
}

#[test]
fn absolute_value_agrees_with_placed_input() {
    let r = results().view("increments", 10).unwrap();
    r.add_calculation("w", "-#v# + 5", "m/s", "shifted velocity").unwrap();
    r.add_absolute("w").unwrap();

    let w = r.place("w", Layout::default(), Constituents::All).unwrap();
    let abs = r.place("|w|", Layout::default(), Constituents::All).unwrap();
    let w = w.leaf().unwrap().to_float().into_owned();
    let abs = abs.leaf().unwrap().to_float().into_owned();
    assert_eq!(w.len(), abs.len());
    assert!(w.iter().any(|x| *x < 0.0));
    for (i, (x, a)) in w.iter().zip(&abs).enumerate() {
        if x.is_nan() {
            assert!(a.is_nan(), "point value {i}");
        } else {
            assert_eq!(*a, x.abs(), "point value {i}");
        }
    }
    // gamma holds no v, so its rows stay unfilled in both.
    assert!(abs[12..].iter().all(|a| a.is_nan()));
}

#[test]
fn missing_inputs_skip_their_group() {
    let r = results();
    let report = r.add_norm("v", NormOrder::Two).unwrap();
    // v lives in alpha and beta only.
    assert_eq!(report.written().count(), 4);
    assert_eq!(report.count(is_skipped), 4);
    let norm = read(&r, &phase(10, "alpha"), "|v|_2").unwrap();
    assert_eq!(norm.as_float().unwrap(), &[13.0, 3.0]);
    assert_eq!(norm.attrs().unit.as_deref(), Some("m/s"));
}

// ── Free-form formulas ──────────────────────────────────────────

#[test]
fn calculation_over_homogenization() {
    let r = results().view("increments", 10).unwrap();
    let report = r
        .add_calculation("T_C", "#T# - 273.15", "°C", "temperature in Celsius")
        .unwrap();
    assert_eq!(report.written().count(), 1);

    let sx = GroupKey::new(IncrementId(10), PartitionKind::Homogenization, "SX");
    let t = read(&r, &sx, "T_C").unwrap();
    let expected: Vec<f64> = (0..6)
        .map(|p| fixtures::temperature(10, p) - 273.15)
        .collect();
    for (a, b) in t.as_float().unwrap().iter().zip(&expected) {
        assert!((a - b).abs() < 1e-9);
    }
    assert_eq!(t.attrs().unit.as_deref(), Some("°C"));
    assert_eq!(t.attrs().formula.as_deref(), Some("#T# - 273.15"));
}

#[test]
fn malformed_formula_writes_nothing() {
    let r = results().allow_modification();
    let err = r.add_calculation("bad", "#F# +", "1", "").unwrap_err();
    assert!(matches!(err, ResultError::Expr(ExprError::Malformed { .. })));

    let err = r.add_calculation("bad", "2 * 3", "1", "").unwrap_err();
    assert!(matches!(err, ResultError::Expr(ExprError::Malformed { .. })));

    let err = r.add_calculation("bad", "undefined(#F#)", "1", "").unwrap_err();
    assert!(matches!(
        err,
        ResultError::Expr(ExprError::UnknownFunction { ref name }) if name == "undefined"
    ));

    for group in r.visible_groups().unwrap() {
        assert!(read(&r, &group, "bad").is_none());
    }
}

#[test]
fn user_functions_are_scoped_to_their_view() {
    let base = results();
    let r = base
        .enable_user_function("double", |args: &[Dataset]| {
            let [x] = args else {
                return Err(ExprError::Arity {
                    function: "double".into(),
                    expected: 1,
                    found: args.len(),
                });
            };
            let doubled = x.to_float().iter().map(|v| 2.0 * v).collect();
            Ok(Dataset::from_float(x.shape(), doubled)?)
        })
        .unwrap();
    assert_eq!(r.user_functions(), vec!["double"]);
    assert!(base.user_functions().is_empty());

    let report = r
        .add_calculation("T2", "double(#T#)", "K", "twice T")
        .unwrap();
    assert_eq!(report.written().count(), 2);
    let sx = GroupKey::new(IncrementId(0), PartitionKind::Homogenization, "SX");
    assert_eq!(read(&r, &sx, "T2").unwrap().as_float().unwrap()[0], 600.0);

    let err = base
        .add_calculation("T3", "double(#T#)", "K", "")
        .unwrap_err();
    assert!(matches!(
        err,
        ResultError::Expr(ExprError::UnknownFunction { .. })
    ));
}

#[test]
fn builtin_names_are_reserved() {
    let err = results()
        .enable_user_function("abs", |args: &[Dataset]| Ok(args[0].clone()))
        .unwrap_err();
    assert!(matches!(
        err,
        ResultError::Expr(ExprError::ReservedName { ref name }) if name == "abs"
    ));
}

// ── Write policy ────────────────────────────────────────────────

#[test]
fn locked_view_keeps_existing_fields() {
    let r = results().with_clock(SteppingClock::epoch());
    let first = r.add_determinant("F").unwrap();
    assert_eq!(first.count(|o| matches!(o, GroupOutcome::Created)), 6);
    let group = phase(0, "alpha");
    let before = read(&r, &group, "det(F)").unwrap().attrs().clone();

    let again = r.add_determinant("F").unwrap();
    assert_eq!(again.written().count(), 0);
    assert_eq!(again.count(|o| matches!(o, GroupOutcome::Kept)), 6);
    assert_eq!(read(&r, &group, "det(F)").unwrap().attrs(), &before);

    let unlocked = r.allow_modification();
    let third = unlocked.add_determinant("F").unwrap();
    assert_eq!(third.count(|o| matches!(o, GroupOutcome::Replaced)), 6);
    let restamped = read(&r, &group, "det(F)").unwrap();
    assert!(restamped.attrs().created_at() > before.created_at());
}

#[test]
fn locked_view_ignores_a_different_formula() {
    let r = results().with_clock(SteppingClock::epoch());
    r.add_stress_cauchy("P", "F").unwrap();
    let group = phase(10, "beta");
    let original = read(&r, &group, "sigma").unwrap();

    let locked = r
        .add_calculation("sigma", "#sigma#*0.0+311.", "Pa", "constant stress")
        .unwrap();
    assert_eq!(locked.count(|o| matches!(o, GroupOutcome::Kept)), 6);
    assert_eq!(locked.written().count(), 0);
    assert_eq!(read(&r, &group, "sigma").unwrap(), original);

    let unlocked = r
        .allow_modification()
        .add_calculation("sigma", "#sigma#*0.0+311.", "Pa", "constant stress")
        .unwrap();
    assert_eq!(unlocked.count(|o| matches!(o, GroupOutcome::Replaced)), 6);
    let replaced = read(&r, &group, "sigma").unwrap();
    assert!(replaced.as_float().unwrap().iter().all(|&v| v == 311.0));
    assert!(replaced.attrs().created_at() > original.attrs().created_at());
    assert_eq!(replaced.attrs().formula.as_deref(), Some("#sigma#*0.0+311."));
}

#[test]
fn failed_write_leaves_earlier_groups_untouched() {
    let mut store = fixtures::polycrystal();
    // increment 10 holds groups where `x` and `y` would go.
    for label in ["x", "y"] {
        let nested = phase(10, "alpha").field(label).join("nested");
        store.write_array(&nested, Dataset::scalar(0.0), false).unwrap();
    }
    let earlier_y = Dataset::from_float(&[1], vec![-1.0]).unwrap();
    store
        .write_array(&phase(0, "alpha").field("y"), earlier_y.clone(), false)
        .unwrap();
    let r = Results::new(store).unwrap().view("phases", "alpha").unwrap();

    let err = r.add_calculation("x", "2 * #F#", "1", "").unwrap_err();
    assert!(matches!(err, ResultError::Store(StoreError::KindConflict { .. })));
    assert!(read(&r, &phase(0, "alpha"), "x").is_none());

    let err = r
        .allow_modification()
        .add_calculation("y", "#F#", "1", "")
        .unwrap_err();
    assert!(matches!(err, ResultError::Store(StoreError::KindConflict { .. })));
    assert_eq!(read(&r, &phase(0, "alpha"), "y"), Some(earlier_y));
}

#[test]
fn creator_is_configurable() {
    let r = results().with_creator("post 2.0");
    r.add_absolute("v").unwrap();
    let d = read(&r, &phase(0, "beta"), "|v|").unwrap();
    assert_eq!(d.attrs().creator.as_deref(), Some("post 2.0"));
    assert_eq!(d.as_float().unwrap(), &[3.0, 4.0, 12.0, 1.0, 2.0, 2.0]);
}

#[test]
fn rename_requires_permission() {
    let r = results();
    let err = r.rename("v", "velocity").unwrap_err();
    assert!(matches!(
        err,
        ResultError::PermissionDenied { operation: "rename" }
    ));
    assert!(read(&r, &phase(0, "alpha"), "v").is_some());

    let renamed = r
        .allow_modification()
        .view("increments", 10)
        .unwrap()
        .rename("v", "velocity")
        .unwrap();
    assert_eq!(renamed, 2);
    assert!(read(&r, &phase(10, "alpha"), "v").is_none());
    assert!(read(&r, &phase(10, "alpha"), "velocity").is_some());
    assert!(read(&r, &phase(0, "alpha"), "v").is_some());
}

#[test]
fn remove_requires_permission() {
    let r = results();
    assert!(matches!(
        r.remove("grain"),
        Err(ResultError::PermissionDenied { operation: "remove" })
    ));

    let removed = r.allow_modification().remove("grain").unwrap();
    assert_eq!(removed, 2);
    assert!(read(&r, &phase(0, "alpha"), "grain").is_none());
    assert_eq!(r.allow_modification().remove("grain").unwrap(), 0);
}
