//! Provenance stamping and the modification guard.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local};
use strata_core::dataset::CREATED_FORMAT;
use strata_core::{Attributes, Dataset, GroupKey, Store, StoreError, WriteOutcome};

/// Default `creator` stamp.
pub const CREATOR: &str = concat!("strata ", env!("CARGO_PKG_VERSION"));

/// Source of `created` timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current time.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Everything written alongside derived data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stamp {
    /// Physical unit of the result.
    pub unit: String,
    /// Human-readable description.
    pub description: String,
    /// Formula or operation the data was computed with.
    pub formula: String,
}

impl Stamp {
    /// Attributes of a dataset written now by `creator`.
    pub fn attributes(&self, creator: &str, clock: &dyn Clock) -> Attributes {
        Attributes {
            unit: Some(self.unit.clone()),
            description: Some(self.description.clone()),
            creator: Some(creator.to_string()),
            created: Some(clock.now().format(CREATED_FORMAT).to_string()),
            formula: Some(self.formula.clone()),
            lattice: None,
        }
    }
}

/// Modification policy of a view.
///
/// A locked guard keeps every existing dataset; an unlocked one replaces
/// it and re-stamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Guard {
    allow_modification: bool,
}

impl Guard {
    /// A guard with the given policy.
    pub fn new(allow_modification: bool) -> Self {
        Self { allow_modification }
    }

    /// Returns `true` if existing data may be replaced, renamed or
    /// removed.
    pub fn allows_modification(self) -> bool {
        self.allow_modification
    }

    /// Returns `true` if writing `label` into `group` would leave the
    /// store unchanged.
    pub fn keeps<S: Store + ?Sized>(self, store: &S, group: &GroupKey, label: &str) -> bool {
        !self.allow_modification && store.contains_array(&group.field(label))
    }

    /// Write `dataset` as `label` into `group` under this policy.
    pub fn write<S: Store + ?Sized>(
        self,
        store: &mut S,
        group: &GroupKey,
        label: &str,
        dataset: Dataset,
    ) -> Result<WriteOutcome, StoreError> {
        let outcome = store.write_array(&group.field(label), dataset, self.allow_modification)?;
        match outcome {
            WriteOutcome::Kept => {
                log::info!("{group}: '{label}' exists and modification is not allowed")
            }
            WriteOutcome::Replaced => log::debug!("{group}: replaced '{label}'"),
            WriteOutcome::Created => log::debug!("{group}: created '{label}'"),
        }
        Ok(outcome)
    }
}
