//! Selection of increments and partitions.
//!
//! A [`Selection`] holds the visible increments (which double as the
//! visible times), phases and homogenizations of a
//! [`Results`](crate::Results) value. Selectors are resolved against the
//! whole container: keys that name nothing are dropped silently, so an
//! over-specified selection narrows to what exists instead of failing.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use strata_core::{IncrementId, PartitionKind, ResultError};
use wildmatch::WildMatch;

use crate::catalog::Catalog;

/// Relative tolerance when matching time keys.
pub const TIME_RTOL: f64 = 1e-5;
/// Absolute tolerance when matching time keys.
pub const TIME_ATOL: f64 = 1e-8;

/// A selectable axis of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Increments, addressed by index or `increment_<i>` pattern.
    Increments,
    /// Increments, addressed by simulation time.
    Times,
    /// Phase names.
    Phases,
    /// Homogenization names.
    Homogenizations,
}

impl Axis {
    /// Partition kind selected by this axis, if it selects partitions.
    pub fn partition_kind(self) -> Option<PartitionKind> {
        match self {
            Self::Phases => Some(PartitionKind::Phase),
            Self::Homogenizations => Some(PartitionKind::Homogenization),
            Self::Increments | Self::Times => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increments => "increments",
            Self::Times => "times",
            Self::Phases => "phases",
            Self::Homogenizations => "homogenizations",
        })
    }
}

impl FromStr for Axis {
    type Err = ResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increments" => Ok(Self::Increments),
            "times" => Ok(Self::Times),
            "phases" => Ok(Self::Phases),
            "homogenizations" => Ok(Self::Homogenizations),
            other => Err(ResultError::InvalidAxis {
                name: other.to_string(),
            }),
        }
    }
}

// ── Selectors ───────────────────────────────────────────────────

/// One key of a selection.
#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    /// Increment index; negative values count from the last increment.
    /// On the times axis, a time.
    Index(i64),
    /// Simulation time. On the increments axis, an integral value is
    /// taken as an index.
    Time(f64),
    /// Name or wildcard pattern (`*`, `?`).
    Name(String),
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Self::Index(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Self::Index(v.into())
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Self::Index(v.into())
    }
}

impl From<IncrementId> for Key {
    fn from(v: IncrementId) -> Self {
        Self::Index(v.0.into())
    }
}

impl From<f64> for Key {
    fn from(v: f64) -> Self {
        Self::Time(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Name(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Self::Name(v)
    }
}

/// What to select on one axis.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    /// `true` selects everything, `false` nothing.
    Bool(bool),
    /// Everything; the spelling `"*"`.
    Wildcard,
    /// The listed keys.
    Keys(Vec<Key>),
}

impl From<bool> for Selector {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Selector {
    fn from(v: &str) -> Self {
        if v == "*" {
            Self::Wildcard
        } else {
            Self::Keys(vec![v.into()])
        }
    }
}

impl From<String> for Selector {
    fn from(v: String) -> Self {
        Self::from(v.as_str())
    }
}

macro_rules! selector_from_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Selector {
                fn from(v: $t) -> Self {
                    Self::Keys(vec![Key::from(v)])
                }
            }

            impl From<Vec<$t>> for Selector {
                fn from(v: Vec<$t>) -> Self {
                    Self::Keys(v.into_iter().map(Key::from).collect())
                }
            }

            impl<const N: usize> From<[$t; N]> for Selector {
                fn from(v: [$t; N]) -> Self {
                    Self::Keys(v.into_iter().map(Key::from).collect())
                }
            }
        )*
    };
}

selector_from_key!(i64, i32, u32, f64, IncrementId, Key);

impl From<Vec<&str>> for Selector {
    fn from(v: Vec<&str>) -> Self {
        Self::Keys(v.into_iter().map(Key::from).collect())
    }
}

impl From<Vec<String>> for Selector {
    fn from(v: Vec<String>) -> Self {
        Self::Keys(v.into_iter().map(Key::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(v: [&str; N]) -> Self {
        Self::Keys(v.into_iter().map(Key::from).collect())
    }
}

// ── Selection ───────────────────────────────────────────────────

/// How a resolved selector combines with the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Set,
    Add,
    Remove,
}

/// The visible subset of a container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Visible increments, which are also the visible times.
    pub increments: BTreeSet<IncrementId>,
    /// Visible phases.
    pub phases: BTreeSet<String>,
    /// Visible homogenizations.
    pub homogenizations: BTreeSet<String>,
}

impl Selection {
    /// Everything the catalog holds.
    pub(crate) fn everything(catalog: &Catalog) -> Self {
        Self {
            increments: catalog.increments.iter().map(|&(id, _)| id).collect(),
            phases: catalog.phases.clone(),
            homogenizations: catalog.homogenizations.clone(),
        }
    }

    /// Visible partition names of `kind`.
    pub fn names(&self, kind: PartitionKind) -> &BTreeSet<String> {
        match kind {
            PartitionKind::Phase => &self.phases,
            PartitionKind::Homogenization => &self.homogenizations,
        }
    }

    /// Resolve `selector` on `axis` and combine it with this selection.
    pub(crate) fn apply(
        &self,
        catalog: &Catalog,
        axis: Axis,
        selector: &Selector,
        action: Action,
    ) -> Self {
        let mut next = self.clone();
        match axis.partition_kind() {
            None => {
                let chosen = match axis {
                    Axis::Times => resolve_times(catalog, selector),
                    _ => resolve_increments(catalog, selector),
                };
                combine(&mut next.increments, chosen, action);
            }
            Some(kind) => {
                let chosen = resolve_names(catalog.names(kind), selector);
                let target = match kind {
                    PartitionKind::Phase => &mut next.phases,
                    PartitionKind::Homogenization => &mut next.homogenizations,
                };
                combine(target, chosen, action);
            }
        }
        next
    }
}

fn combine<T: Ord>(current: &mut BTreeSet<T>, chosen: BTreeSet<T>, action: Action) {
    match action {
        Action::Set => *current = chosen,
        Action::Add => current.extend(chosen),
        Action::Remove => current.retain(|v| !chosen.contains(v)),
    }
}

/// Keys of an all-selection, spelled through the range queries.
fn everything_keys(catalog: &Catalog, axis: Axis) -> Vec<Key> {
    match axis {
        Axis::Times => catalog
            .times_in_range(f64::NEG_INFINITY, f64::INFINITY)
            .into_iter()
            .map(Key::Time)
            .collect(),
        _ => catalog
            .increments_in_range(f64::NEG_INFINITY, f64::INFINITY)
            .into_iter()
            .map(Key::from)
            .collect(),
    }
}

fn keys_of(catalog: &Catalog, axis: Axis, selector: &Selector) -> Vec<Key> {
    match selector {
        Selector::Bool(false) => Vec::new(),
        Selector::Bool(true) | Selector::Wildcard => everything_keys(catalog, axis),
        Selector::Keys(keys) => keys.clone(),
    }
}

fn resolve_increments(catalog: &Catalog, selector: &Selector) -> BTreeSet<IncrementId> {
    let n = catalog.increments.len() as i64;
    let mut out = BTreeSet::new();
    for key in keys_of(catalog, Axis::Increments, selector) {
        match key {
            Key::Index(i) if i < 0 => {
                if let Some(&(id, _)) = usize::try_from(n + i)
                    .ok()
                    .and_then(|p| catalog.increments.get(p))
                {
                    out.insert(id);
                }
            }
            Key::Index(i) => {
                if let Some(id) = u32::try_from(i).ok().map(IncrementId) {
                    if catalog.contains(id) {
                        out.insert(id);
                    }
                }
            }
            Key::Time(t) => {
                if t >= 0.0 && t.fract() == 0.0 && t <= f64::from(u32::MAX) {
                    let id = IncrementId(t as u32);
                    if catalog.contains(id) {
                        out.insert(id);
                    }
                }
            }
            Key::Name(pattern) => {
                let pattern = WildMatch::new(&pattern);
                out.extend(
                    catalog
                        .increments
                        .iter()
                        .filter(|(id, _)| pattern.matches(&id.to_string()))
                        .map(|&(id, _)| id),
                );
            }
        }
    }
    out
}

fn resolve_times(catalog: &Catalog, selector: &Selector) -> BTreeSet<IncrementId> {
    let mut out = BTreeSet::new();
    for key in keys_of(catalog, Axis::Times, selector) {
        let t = match key {
            Key::Index(i) => i as f64,
            Key::Time(t) => t,
            Key::Name(s) => match s.trim().parse::<f64>() {
                Ok(t) => t,
                Err(_) => continue,
            },
        };
        out.extend(
            catalog
                .increments
                .iter()
                .filter(|&&(_, time)| isclose(t, time))
                .map(|&(id, _)| id),
        );
    }
    out
}

fn resolve_names(all: &BTreeSet<String>, selector: &Selector) -> BTreeSet<String> {
    match selector {
        Selector::Bool(false) => BTreeSet::new(),
        Selector::Bool(true) | Selector::Wildcard => all.clone(),
        Selector::Keys(keys) => {
            let patterns: Vec<WildMatch> = keys
                .iter()
                .filter_map(|k| match k {
                    Key::Name(p) => Some(WildMatch::new(p)),
                    Key::Index(_) | Key::Time(_) => None,
                })
                .collect();
            all.iter()
                .filter(|name| patterns.iter().any(|p| p.matches(name)))
                .cloned()
                .collect()
        }
    }
}

/// `|a - b| <= atol + rtol * |b|`.
pub(crate) fn isclose(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIME_ATOL + TIME_RTOL * b.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::ContainerBuilder;

    fn catalog() -> Catalog {
        let mut b = ContainerBuilder::new("v", [2, 1, 1], [1.0; 3], [0.0; 3], 1);
        b.phase_mapping("Aluminum", vec![[0, 0, 0]])
            .unwrap()
            .phase_mapping("Steel", vec![[1, 0, 0]])
            .unwrap()
            .homogenization_mapping("SX", vec![[0, 0], [1, 1]])
            .unwrap();
        for (i, t) in [(0, 0.0), (5, 2.5), (10, 5.0)] {
            b.increment(i, t).unwrap();
        }
        Catalog::load(&b.build()).unwrap()
    }

    fn increments(s: &Selection) -> Vec<u32> {
        s.increments.iter().map(|i| i.0).collect()
    }

    #[test]
    fn axis_names() {
        assert_eq!("times".parse::<Axis>().unwrap(), Axis::Times);
        assert!(matches!(
            "fields".parse::<Axis>(),
            Err(ResultError::InvalidAxis { name }) if name == "fields"
        ));
    }

    #[test]
    fn index_keys() {
        let c = catalog();
        let all = Selection::everything(&c);
        let s = all.apply(&c, Axis::Increments, &Selector::from(vec![5, -1, 7]), Action::Set);
        assert_eq!(increments(&s), vec![5, 10]);
        let s = all.apply(&c, Axis::Increments, &Selector::from(-3), Action::Set);
        assert_eq!(increments(&s), vec![0]);
        let s = all.apply(&c, Axis::Increments, &Selector::from(-4), Action::Set);
        assert!(s.increments.is_empty());
    }

    #[test]
    fn name_patterns() {
        let c = catalog();
        let all = Selection::everything(&c);
        let s = all.apply(&c, Axis::Increments, &Selector::from("increment_1*"), Action::Set);
        assert_eq!(increments(&s), vec![10]);
        let s = all.apply(&c, Axis::Phases, &Selector::from("Al*"), Action::Set);
        assert_eq!(s.phases.iter().collect::<Vec<_>>(), vec!["Aluminum"]);
        assert_eq!(s.increments, all.increments);
    }

    #[test]
    fn times_match_with_tolerance() {
        let c = catalog();
        let all = Selection::everything(&c);
        let s = all.apply(&c, Axis::Times, &Selector::from(2.500001), Action::Set);
        assert_eq!(increments(&s), vec![5]);
        let s = all.apply(&c, Axis::Times, &Selector::from(2.51), Action::Set);
        assert!(s.increments.is_empty());
        let s = all.apply(&c, Axis::Times, &Selector::from("5.0"), Action::Set);
        assert_eq!(increments(&s), vec![10]);
    }

    #[test]
    fn all_selection_spellings_agree() {
        let c = catalog();
        let none = Selection::everything(&c).apply(
            &c,
            Axis::Increments,
            &Selector::Bool(false),
            Action::Set,
        );
        assert!(none.increments.is_empty());
        let by_bool = none.apply(&c, Axis::Times, &Selector::Bool(true), Action::Set);
        let by_star = none.apply(&c, Axis::Increments, &Selector::Wildcard, Action::Set);
        let by_range = none.apply(
            &c,
            Axis::Times,
            &Selector::from(c.times_in_range(f64::NEG_INFINITY, f64::INFINITY)),
            Action::Set,
        );
        assert_eq!(by_bool, by_star);
        assert_eq!(by_bool, by_range);
        assert_eq!(by_bool, Selection::everything(&c));
    }

    #[test]
    fn add_and_remove() {
        let c = catalog();
        let one = Selection::everything(&c).apply(&c, Axis::Increments, &0.into(), Action::Set);
        let two = one.apply(&c, Axis::Increments, &10.into(), Action::Add);
        assert_eq!(increments(&two), vec![0, 10]);
        let back = two.apply(&c, Axis::Increments, &10.into(), Action::Remove);
        assert_eq!(back, one);
    }

    #[test]
    fn ranges_are_inclusive() {
        let c = catalog();
        assert_eq!(c.increments_in_range(0.0, 5.0), vec![IncrementId(0), IncrementId(5)]);
        assert_eq!(c.times_in_range(2.5, 10.0), vec![2.5, 5.0]);
    }
}
