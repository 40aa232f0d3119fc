//! Per-group evaluation of a validated formula.

use std::fmt;

use strata_core::{
    Dataset, ExprError, GroupKey, Lattice, Store, StoreError, StorePath, WriteOutcome,
};
use strata_expr::{Bindings, Formula, FunctionTable};

use crate::derived::Unit;
use crate::guard::{Clock, Guard, Stamp};

/// What happened in one group.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupOutcome {
    /// The field was written where none existed.
    Created,
    /// An existing field was replaced.
    Replaced,
    /// The field exists and modification is not allowed; nothing was
    /// evaluated or written.
    Kept,
    /// An input field is absent from the group.
    Skipped {
        /// The first missing input.
        missing: String,
    },
    /// Evaluation failed; nothing was written.
    Failed(ExprError),
}

impl From<WriteOutcome> for GroupOutcome {
    fn from(o: WriteOutcome) -> Self {
        match o {
            WriteOutcome::Created => Self::Created,
            WriteOutcome::Replaced => Self::Replaced,
            WriteOutcome::Kept => Self::Kept,
        }
    }
}

/// Result of one derive call over every visible group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalculationReport {
    /// Label of the derived field.
    pub name: String,
    /// Outcome per visited group, in visiting order.
    pub outcomes: Vec<(GroupKey, GroupOutcome)>,
}

impl CalculationReport {
    /// Groups the field was written to.
    pub fn written(&self) -> impl Iterator<Item = &GroupKey> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, GroupOutcome::Created | GroupOutcome::Replaced))
            .map(|(g, _)| g)
    }

    /// Number of groups with the given outcome kind.
    pub fn count(&self, pred: impl Fn(&GroupOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Per-group evaluation failures.
    pub fn failures(&self) -> impl Iterator<Item = (&GroupKey, &ExprError)> {
        self.outcomes.iter().filter_map(|(g, o)| match o {
            GroupOutcome::Failed(e) => Some((g, e)),
            _ => None,
        })
    }
}

impl fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let created = self.count(|o| matches!(o, GroupOutcome::Created));
        let replaced = self.count(|o| matches!(o, GroupOutcome::Replaced));
        let kept = self.count(|o| matches!(o, GroupOutcome::Kept));
        let skipped = self.count(|o| matches!(o, GroupOutcome::Skipped { .. }));
        let failed = self.count(|o| matches!(o, GroupOutcome::Failed(_)));
        write!(
            f,
            "'{}': {created} created, {replaced} replaced, {kept} kept, \
             {skipped} skipped, {failed} failed",
            self.name
        )
    }
}

/// A validated formula with everything needed to stamp its output.
pub(crate) struct Calculation<'a> {
    pub(crate) name: &'a str,
    pub(crate) formula: &'a Formula,
    pub(crate) table: &'a FunctionTable,
    pub(crate) unit: &'a Unit,
    pub(crate) description: &'a str,
}

/// Stamping context shared by every group of one call.
pub(crate) struct Provenance<'a> {
    pub(crate) guard: Guard,
    pub(crate) creator: &'a str,
    pub(crate) clock: &'a dyn Clock,
}

impl Calculation<'_> {
    /// Evaluate in every group and write through the guard.
    ///
    /// Evaluation failures and missing inputs abandon only their group.
    /// A failing store write aborts the call and undoes the writes made
    /// to earlier groups.
    pub(crate) fn run<S: Store + ?Sized>(
        &self,
        store: &mut S,
        groups: &[GroupKey],
        provenance: &Provenance<'_>,
    ) -> Result<CalculationReport, StoreError> {
        let mut report = CalculationReport {
            name: self.name.to_string(),
            outcomes: Vec::with_capacity(groups.len()),
        };
        let mut undo = Vec::new();
        for group in groups {
            match self.run_group(store, group, provenance, &mut undo) {
                Ok(outcome) => report.outcomes.push((group.clone(), outcome)),
                Err(e) => {
                    log::warn!("{group}: writing '{}' failed: {e}", self.name);
                    rollback(store, undo);
                    return Err(e);
                }
            }
        }
        Ok(report)
    }

    fn run_group<S: Store + ?Sized>(
        &self,
        store: &mut S,
        group: &GroupKey,
        provenance: &Provenance<'_>,
        undo: &mut Vec<(StorePath, Option<Dataset>)>,
    ) -> Result<GroupOutcome, StoreError> {
        if provenance.guard.keeps(store, group, self.name) {
            log::info!(
                "{group}: '{}' exists and modification is not allowed",
                self.name
            );
            return Ok(GroupOutcome::Kept);
        }

        let mut bindings = Bindings::new();
        for label in self.formula.placeholders() {
            match store.read_array(&group.field(label)) {
                Some(d) => {
                    bindings.insert(label.to_string(), d);
                }
                None => {
                    log::warn!("{group}: skipping '{}', '{label}' not found", self.name);
                    return Ok(GroupOutcome::Skipped {
                        missing: label.to_string(),
                    });
                }
            }
        }

        log::debug!("{group}: evaluating '{}'", self.formula.source());
        let mut data = match self.formula.evaluate(self.table, &bindings) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("{group}: '{}' failed: {e}", self.name);
                return Ok(GroupOutcome::Failed(e));
            }
        };

        let unit = match self.unit {
            Unit::Fixed(u) => u.clone(),
            Unit::SameAs(label) => bindings
                .get(label)
                .and_then(|d| d.attrs().unit.clone())
                .unwrap_or_else(|| "n/a".to_string()),
        };
        let stamp = Stamp {
            unit,
            description: self.description.to_string(),
            formula: self.formula.source().to_string(),
        };
        *data.attrs_mut() = stamp.attributes(provenance.creator, provenance.clock);
        data.attrs_mut().lattice = self.inherited_lattice(&bindings, &data);

        let path = group.field(self.name);
        let previous = store.read_array(&path);
        let outcome = provenance.guard.write(store, group, self.name, data)?;
        if outcome != WriteOutcome::Kept {
            undo.push((path, previous));
        }
        Ok(outcome.into())
    }

    /// Lattice of the only input, if the result keeps its shape.
    fn inherited_lattice(&self, bindings: &Bindings, result: &Dataset) -> Option<Lattice> {
        match self.formula.placeholders().as_slice() {
            [label] => bindings
                .get(*label)
                .filter(|d| d.shape() == result.shape())
                .and_then(|d| d.attrs().lattice),
            _ => None,
        }
    }
}

/// Restore every path in `undo` to its state before the call, newest first.
fn rollback<S: Store + ?Sized>(store: &mut S, undo: Vec<(StorePath, Option<Dataset>)>) {
    for (path, previous) in undo.into_iter().rev() {
        let restored = match previous {
            Some(d) => store.write_array(&path, d, true).map(drop),
            None => store.remove_array(&path).map(drop),
        };
        if let Err(e) = restored {
            log::warn!("{path}: rollback failed: {e}");
        }
    }
}
