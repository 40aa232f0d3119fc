//! The [`Results`] view value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use strata_core::{Dataset, ExprError, GroupKey, IncrementId, PartitionKind, ResultError, Store};
use strata_expr::{Formula, FunctionTable};
use strata_mech::{EigenRank, MisesKind, NormOrder, StretchKind};
use strata_store::FileStore;

use crate::calc::{Calculation, CalculationReport, Provenance};
use crate::catalog::Catalog;
use crate::derived::{self, Derivation, Unit};
use crate::export::{file_name, index_width, ExportMode, GridEncoder};
use crate::grid::Grid;
use crate::guard::{Clock, Guard, SystemClock, CREATOR};
use crate::mapping::Mapping;
use crate::place::{self, Constituents, Labels, Layout, Tree};
use crate::view::{Action, Axis, Selection, Selector};

/// A view of a result container.
///
/// `Results` values are cheap to clone and never change: every `view*`
/// and policy method returns a new value. All values derived from one
/// [`Results::new`] share the store behind an `Arc<RwLock<_>>`, so
/// writes through any of them are serialized and visible to all.
///
/// A new value sees everything and is locked: `add_*` keeps existing
/// fields, and [`rename`](Self::rename) and [`remove`](Self::remove) are
/// refused until [`allow_modification`](Self::allow_modification).
///
/// # Examples
///
/// ```
/// use strata_core::{Dataset, PartitionKind};
/// use strata_mech::NormOrder;
/// use strata_result::{Constituents, Layout, Results};
/// use strata_store::ContainerBuilder;
///
/// let mut b = ContainerBuilder::new("demo", [2, 1, 1], [1.0; 3], [0.0; 3], 1);
/// b.phase_mapping("A", vec![[0, 0, 0], [1, 0, 1]]).unwrap()
///     .increment(0, 0.0).unwrap()
///     .field(0, PartitionKind::Phase, "A", "v",
///            Dataset::from_float(&[2, 3], vec![3.0, 4.0, 0.0, 0.0, 0.0, 1.0]).unwrap())
///     .unwrap();
///
/// let r = Results::new(b.build()).unwrap();
/// let report = r.add_norm("v", NormOrder::Two).unwrap();
/// assert_eq!(report.written().count(), 1);
///
/// let placed = r.place("|v|_2", Layout::default(), Constituents::All).unwrap();
/// assert_eq!(placed.leaf().unwrap().as_float().unwrap(), &[5.0, 1.0]);
/// ```
pub struct Results<S> {
    store: Arc<RwLock<S>>,
    catalog: Arc<Catalog>,
    selection: Selection,
    guard: Guard,
    functions: FunctionTable,
    clock: Arc<dyn Clock>,
    creator: String,
}

impl<S> Clone for Results<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            selection: self.selection.clone(),
            guard: self.guard,
            functions: self.functions.clone(),
            clock: Arc::clone(&self.clock),
            creator: self.creator.clone(),
        }
    }
}

impl<S> fmt::Debug for Results<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("selection", &self.selection)
            .field("allow_modification", &self.guard.allows_modification())
            .field("functions", &self.functions)
            .field("creator", &self.creator)
            .finish_non_exhaustive()
    }
}

impl Results<FileStore> {
    /// Open a container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResultError> {
        Self::new(FileStore::open(path)?)
    }
}

impl<S: Store> Results<S> {
    /// View everything in `store`.
    ///
    /// Fails with [`ResultError::MissingGeometry`] if the container has
    /// no grid, no constituent count, an inconsistent mapping, or an
    /// increment without a time.
    pub fn new(store: S) -> Result<Self, ResultError> {
        Self::shared(Arc::new(RwLock::new(store)))
    }

    /// View everything in an already shared store.
    pub fn shared(store: Arc<RwLock<S>>) -> Result<Self, ResultError> {
        let catalog = {
            let guard = store.read().map_err(|_| ResultError::Poisoned)?;
            Catalog::load(&*guard)?
        };
        log::debug!(
            "catalog: {} increments, {} phases, {} homogenizations, {} points",
            catalog.increments.len(),
            catalog.phases.len(),
            catalog.homogenizations.len(),
            catalog.grid.points()
        );
        Ok(Self {
            selection: Selection::everything(&catalog),
            store,
            catalog: Arc::new(catalog),
            guard: Guard::default(),
            functions: FunctionTable::new(),
            clock: Arc::new(SystemClock),
            creator: CREATOR.to_string(),
        })
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, S>, ResultError> {
        self.store.read().map_err(|_| ResultError::Poisoned)
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, S>, ResultError> {
        self.store.write().map_err(|_| ResultError::Poisoned)
    }

    // ── Accessors ────────────────────────────────────────────────

    /// The current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Visible increments, ascending.
    pub fn increments(&self) -> Vec<IncrementId> {
        self.selection.increments.iter().copied().collect()
    }

    /// Times of the visible increments, ascending by increment.
    pub fn times(&self) -> Vec<f64> {
        self.selection
            .increments
            .iter()
            .filter_map(|&id| self.catalog.time(id))
            .collect()
    }

    /// Visible phases.
    pub fn phases(&self) -> Vec<&str> {
        self.selection.phases.iter().map(String::as_str).collect()
    }

    /// Visible homogenizations.
    pub fn homogenizations(&self) -> Vec<&str> {
        self.selection
            .homogenizations
            .iter()
            .map(String::as_str)
            .collect()
    }

    /// Grid geometry.
    pub fn grid(&self) -> &Grid {
        &self.catalog.grid
    }

    /// Constituent mapping.
    pub fn mapping(&self) -> &Mapping {
        &self.catalog.mapping
    }

    /// Returns `true` if this view may replace, rename or remove data.
    pub fn allows_modification(&self) -> bool {
        self.guard.allows_modification()
    }

    /// Value of the `creator` stamp.
    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// Names of the user functions available to
    /// [`add_calculation`](Self::add_calculation).
    pub fn user_functions(&self) -> Vec<&str> {
        self.functions.registered().collect()
    }

    /// Run `f` on the store under the read lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R, ResultError> {
        Ok(f(&*self.read_store()?))
    }

    /// Increments of the whole container with `lo <= index <= hi`.
    pub fn increments_in_range(&self, lo: f64, hi: f64) -> Vec<IncrementId> {
        self.catalog.increments_in_range(lo, hi)
    }

    /// Times of the whole container with `lo <= time <= hi`.
    pub fn times_in_range(&self, lo: f64, hi: f64) -> Vec<f64> {
        self.catalog.times_in_range(lo, hi)
    }

    /// Visible partition groups present in the store.
    pub fn visible_groups(&self) -> Result<Vec<GroupKey>, ResultError> {
        let store = self.read_store()?;
        Ok(self.groups_in(&*store))
    }

    fn groups_in(&self, store: &S) -> Vec<GroupKey> {
        let mut groups = Vec::new();
        for &increment in &self.selection.increments {
            for kind in PartitionKind::ALL {
                groups.extend(place::present_groups(store, &self.selection, increment, kind));
            }
        }
        groups
    }

    // ── Views ────────────────────────────────────────────────────

    fn with_selection(
        &self,
        axis: &str,
        selector: Selector,
        action: Action,
    ) -> Result<Self, ResultError> {
        let axis: Axis = axis.parse()?;
        let mut next = self.clone();
        next.selection = self.selection.apply(&self.catalog, axis, &selector, action);
        Ok(next)
    }

    /// Replace the selection on `axis` (`"increments"`, `"times"`,
    /// `"phases"` or `"homogenizations"`).
    ///
    /// Keys that name nothing are dropped; any other axis name fails
    /// with [`ResultError::InvalidAxis`].
    pub fn view(&self, axis: &str, selector: impl Into<Selector>) -> Result<Self, ResultError> {
        self.with_selection(axis, selector.into(), Action::Set)
    }

    /// Add to the selection on `axis`.
    pub fn view_more(&self, axis: &str, selector: impl Into<Selector>) -> Result<Self, ResultError> {
        self.with_selection(axis, selector.into(), Action::Add)
    }

    /// Remove from the selection on `axis`.
    pub fn view_less(&self, axis: &str, selector: impl Into<Selector>) -> Result<Self, ResultError> {
        self.with_selection(axis, selector.into(), Action::Remove)
    }

    /// The same view, allowed to replace, rename and remove data.
    pub fn allow_modification(&self) -> Self {
        let mut next = self.clone();
        next.guard = Guard::new(true);
        next
    }

    /// The same view, locked.
    pub fn disallow_modification(&self) -> Self {
        let mut next = self.clone();
        next.guard = Guard::new(false);
        next
    }

    /// The same view with an extra function for
    /// [`add_calculation`](Self::add_calculation) formulas.
    ///
    /// Built-in function names are reserved.
    pub fn enable_user_function<F>(&self, name: &str, function: F) -> Result<Self, ResultError>
    where
        F: Fn(&[Dataset]) -> Result<Dataset, ExprError> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.functions.register(name, function)?;
        log::debug!("enabled user function '{name}'");
        Ok(next)
    }

    /// The same view, stamping `created` from `clock`.
    pub fn with_clock(&self, clock: impl Clock + 'static) -> Self {
        let mut next = self.clone();
        next.clock = Arc::new(clock);
        next
    }

    /// The same view, stamping `creator` as `creator`.
    pub fn with_creator(&self, creator: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.creator = creator.into();
        next
    }

    // ── Derive ───────────────────────────────────────────────────

    fn calculate(
        &self,
        name: &str,
        formula: &Formula,
        table: &FunctionTable,
        unit: &Unit,
        description: &str,
    ) -> Result<CalculationReport, ResultError> {
        let calculation = Calculation {
            name,
            formula,
            table,
            unit,
            description,
        };
        let provenance = Provenance {
            guard: self.guard,
            creator: &self.creator,
            clock: self.clock.as_ref(),
        };
        let mut store = self.write_store()?;
        let groups = self.groups_in(&*store);
        let report = calculation.run(&mut *store, &groups, &provenance)?;
        store.commit()?;
        log::info!("{report}");
        Ok(report)
    }

    fn derive(&self, derivation: Derivation) -> Result<CalculationReport, ResultError> {
        let table = derived::mechanics_table()?;
        let formula = Formula::validate(&derivation.formula, &table)?;
        self.calculate(
            &derivation.name,
            &formula,
            &table,
            &derivation.unit,
            &derivation.description,
        )
    }

    /// Evaluate `formula` in every visible group and store the result as
    /// `name`.
    ///
    /// The formula may use the built-in functions and the functions
    /// enabled on this view. It is validated once before any group is
    /// touched; a malformed formula writes nothing.
    pub fn add_calculation(
        &self,
        name: &str,
        formula: &str,
        unit: &str,
        description: &str,
    ) -> Result<CalculationReport, ResultError> {
        let validated = Formula::validate(formula, &self.functions)?;
        self.calculate(
            name,
            &validated,
            &self.functions,
            &Unit::Fixed(unit.to_string()),
            description,
        )
    }

    /// Add `|x|`.
    pub fn add_absolute(&self, x: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::absolute(x))
    }

    /// Add the Cauchy stress `sigma` from `P` and `F`.
    pub fn add_stress_cauchy(&self, p: &str, f: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::stress_cauchy(p, f))
    }

    /// Add the second Piola-Kirchhoff stress `S` from `P` and `F`.
    pub fn add_stress_second_piola_kirchhoff(
        &self,
        p: &str,
        f: &str,
    ) -> Result<CalculationReport, ResultError> {
        self.derive(derived::stress_second_piola_kirchhoff(p, f))
    }

    /// Add `det(T)`.
    pub fn add_determinant(&self, t: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::determinant(t))
    }

    /// Add the deviator `s_T`.
    pub fn add_deviator(&self, t: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::deviator(t))
    }

    /// Add the spherical part `p_T`.
    pub fn add_spherical(&self, t: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::spherical(t))
    }

    /// Add `lambda_<rank>(T)`.
    pub fn add_eigenvalue(&self, t: &str, rank: EigenRank) -> Result<CalculationReport, ResultError> {
        self.derive(derived::eigenvalue(t, rank))
    }

    /// Add `v_<rank>(T)`.
    pub fn add_eigenvector(
        &self,
        t: &str,
        rank: EigenRank,
    ) -> Result<CalculationReport, ResultError> {
        self.derive(derived::eigenvector(t, rank))
    }

    /// Add the von Mises equivalent `T_vM`.
    pub fn add_equivalent_mises(
        &self,
        t: &str,
        kind: MisesKind,
    ) -> Result<CalculationReport, ResultError> {
        self.derive(derived::equivalent_mises(t, kind))
    }

    /// Add `max_shear(T)`.
    pub fn add_maximum_shear(&self, t: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::maximum_shear(t))
    }

    /// Add `|x|_<ord>`.
    pub fn add_norm(&self, x: &str, ord: NormOrder) -> Result<CalculationReport, ResultError> {
        self.derive(derived::norm(x, ord))
    }

    /// Add the rotation `R(F)`.
    pub fn add_rotation(&self, f: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::rotation(f))
    }

    /// Add the Seth-Hill strain `epsilon_<t>^<m>(F)`.
    pub fn add_strain(
        &self,
        f: &str,
        kind: StretchKind,
        m: f64,
    ) -> Result<CalculationReport, ResultError> {
        self.derive(derived::strain(f, kind, m)?)
    }

    /// Add the stretch tensor `<t>(F)`.
    pub fn add_stretch_tensor(
        &self,
        f: &str,
        kind: StretchKind,
    ) -> Result<CalculationReport, ResultError> {
        self.derive(derived::stretch_tensor(f, kind))
    }

    /// Add inverse pole figure colors `IPFcolor_(h k l)` of the sample
    /// direction `d` for the orientations `q`.
    pub fn add_ipf_color(&self, d: [f64; 3], q: &str) -> Result<CalculationReport, ResultError> {
        self.derive(derived::ipf_color(q, d)?)
    }

    /// Add the stereographic projection of the crystal direction `uvw`
    /// for the orientations `q`.
    pub fn add_pole(
        &self,
        q: &str,
        uvw: [f64; 3],
        polar: bool,
    ) -> Result<CalculationReport, ResultError> {
        self.derive(derived::pole(q, uvw, polar)?)
    }

    // ── Modify ───────────────────────────────────────────────────

    /// Rename `old` to `new` in every visible group that holds `old`.
    ///
    /// Returns the number of groups changed. Refused with
    /// [`ResultError::PermissionDenied`] unless modification is allowed.
    pub fn rename(&self, old: &str, new: &str) -> Result<usize, ResultError> {
        if !self.guard.allows_modification() {
            return Err(ResultError::PermissionDenied { operation: "rename" });
        }
        let mut store = self.write_store()?;
        let mut changed = 0;
        for group in self.groups_in(&*store) {
            let from = group.field(old);
            if store.contains_array(&from) {
                store.move_array(&from, &group.field(new))?;
                log::debug!("{group}: renamed '{old}' to '{new}'");
                changed += 1;
            }
        }
        store.commit()?;
        Ok(changed)
    }

    /// Remove `label` from every visible group that holds it.
    ///
    /// Returns the number of groups changed. Refused with
    /// [`ResultError::PermissionDenied`] unless modification is allowed.
    pub fn remove(&self, label: &str) -> Result<usize, ResultError> {
        if !self.guard.allows_modification() {
            return Err(ResultError::PermissionDenied { operation: "remove" });
        }
        let mut store = self.write_store()?;
        let mut changed = 0;
        for group in self.groups_in(&*store) {
            let path = group.field(label);
            if store.contains_array(&path) {
                store.remove_array(&path)?;
                log::debug!("{group}: removed '{label}'");
                changed += 1;
            }
        }
        store.commit()?;
        Ok(changed)
    }

    // ── Read and place ───────────────────────────────────────────

    /// Visible fields as stored, keyed
    /// `increment_<i>` → `phase|homogenization` → name → label.
    pub fn read(&self, labels: impl Into<Labels>, layout: Layout) -> Result<Tree, ResultError> {
        let store = self.read_store()?;
        Ok(place::read(&*store, &self.selection, &labels.into(), layout))
    }

    /// Visible fields on the global point order, keyed
    /// `increment_<i>` → `phase|homogenization` → label.
    ///
    /// With more than one constituent per point and anything but a
    /// single selected constituent, phase labels carry a `#c` suffix.
    pub fn place(
        &self,
        labels: impl Into<Labels>,
        layout: Layout,
        constituents: impl Into<Constituents>,
    ) -> Result<Tree, ResultError> {
        let store = self.read_store()?;
        Ok(place::place(
            &*store,
            &self.catalog,
            &self.selection,
            &labels.into(),
            &constituents.into(),
            layout,
        ))
    }

    /// Place `labels` for every visible increment and hand each increment
    /// to `encoder`, writing `<container>_inc<NN>.<ext>` files into
    /// `dir`. Returns the written paths.
    pub fn export<E: GridEncoder + ?Sized>(
        &self,
        labels: impl Into<Labels>,
        mode: ExportMode,
        encoder: &mut E,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, ResultError> {
        let visible = self.selection.increments.len();
        if encoder.single_increment() && visible != 1 {
            return Err(ResultError::Export {
                reason: format!(
                    "'{}' files hold one increment, {visible} are visible",
                    encoder.extension()
                ),
            });
        }
        let labels = labels.into();
        let store = self.read_store()?;
        let width = index_width(self.catalog.increments.last().map(|&(id, _)| id));
        let mut written = Vec::with_capacity(visible);
        for &increment in &self.selection.increments {
            let placed = place::place_increment(
                &*store,
                &self.catalog,
                &self.selection,
                increment,
                &labels,
                &Constituents::All,
            );
            let mut arrays = IndexMap::new();
            for (kind, fields) in placed {
                for (label, data) in fields {
                    arrays.insert(format!("{kind}/{label}"), data);
                }
            }
            let name = file_name(store.name(), increment, width, encoder.extension());
            let path = dir.as_ref().join(name);
            encoder
                .encode(&path, &self.catalog.grid, mode, &arrays)
                .map_err(|e| ResultError::Store(e.into()))?;
            log::info!("exported {increment} to {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    // ── Report ───────────────────────────────────────────────────

    /// Listing of increments `ids` with their fields, units and
    /// descriptions.
    fn list_data(&self, store: &S, ids: &[IncrementId]) -> String {
        let mut out = String::new();
        for &id in ids {
            let time = self.catalog.time(id).unwrap_or(f64::NAN);
            out.push_str(&format!("\n{id} ({time} s)\n"));
            for kind in PartitionKind::ALL {
                out.push_str(&format!("  {kind}\n"));
                for group in place::present_groups(store, &self.selection, id, kind) {
                    out.push_str(&format!("    {}\n", group.name));
                    for label in store.list_arrays(&group.path()) {
                        let Some(d) = store.read_array(&group.field(&label)) else {
                            continue;
                        };
                        let attrs = d.attrs();
                        let unit = attrs
                            .unit
                            .as_deref()
                            .map(|u| format!(" / {u}"))
                            .unwrap_or_default();
                        let description = attrs.description.as_deref().unwrap_or("");
                        out.push_str(&format!("      {label}{unit}: {description}\n"));
                    }
                }
            }
        }
        out
    }
}

impl<S: Store> fmt::Display for Results<S> {
    /// First and last visible increment in full, the ones between by
    /// name only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(store) = self.read_store() else {
            return write!(f, "<store unavailable>");
        };
        let ids = self.increments();
        let Some((&first, rest)) = ids.split_first() else {
            return write!(f, "no increments visible");
        };
        let mut text = self.list_data(&store, &[first]);
        if let Some((&last, between)) = rest.split_last() {
            for id in between {
                text.push_str(&format!("\n{id}\n  ...\n"));
            }
            text.push_str(&self.list_data(&store, &[last]));
        }
        f.write_str(text.trim_start_matches('\n').trim_end())
    }
}
