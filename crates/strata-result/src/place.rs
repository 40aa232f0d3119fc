//! Reading fields per partition and placing them on the global point
//! order.
//!
//! [`Results::read`](crate::Results::read) returns fields as stored,
//! keyed by increment, partition kind, partition name and label.
//! [`Results::place`](crate::Results::place) scatters every partition's samples
//! to the material points the constituent mapping assigns them, so each
//! label becomes one dataset whose leading axis is the grid's point
//! count. Points no visible partition covers hold the fill sentinel
//! (`NaN` for floats, `0` for integers).

use indexmap::IndexMap;
use strata_core::{Dataset, Dtype, GroupKey, IncrementId, PartitionKind, ShapeError, Store, Values};
use wildmatch::WildMatch;

use crate::catalog::Catalog;
use crate::view::Selection;

// ── Tree ────────────────────────────────────────────────────────

/// Nested output of [`Results::read`](crate::Results::read) and
/// [`Results::place`](crate::Results::place).
#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
    /// Named children, in visiting order.
    Node(IndexMap<String, Tree>),
    /// A dataset.
    Leaf(Dataset),
}

impl Default for Tree {
    fn default() -> Self {
        Self::Node(IndexMap::new())
    }
}

impl Tree {
    /// A node without children.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` for a node without children.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Node(children) if children.is_empty())
    }

    /// Child `key` of a node.
    pub fn get(&self, key: &str) -> Option<&Tree> {
        match self {
            Self::Node(children) => children.get(key),
            Self::Leaf(_) => None,
        }
    }

    /// Descendant at `path`.
    pub fn at(&self, path: &[&str]) -> Option<&Tree> {
        path.iter().try_fold(self, |t, key| t.get(key))
    }

    /// The dataset of a leaf.
    pub fn leaf(&self) -> Option<&Dataset> {
        match self {
            Self::Leaf(d) => Some(d),
            Self::Node(_) => None,
        }
    }

    /// Children of a node.
    pub fn children(&self) -> Option<&IndexMap<String, Tree>> {
        match self {
            Self::Node(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }

    /// Every leaf with its key path, depth first.
    pub fn leaves(&self) -> Vec<(Vec<&str>, &Dataset)> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        self.collect_leaves(&mut prefix, &mut out);
        out
    }

    fn collect_leaves<'a>(
        &'a self,
        prefix: &mut Vec<&'a str>,
        out: &mut Vec<(Vec<&'a str>, &'a Dataset)>,
    ) {
        match self {
            Self::Leaf(d) => out.push((prefix.clone(), d)),
            Self::Node(children) => {
                for (key, child) in children {
                    prefix.push(key);
                    child.collect_leaves(prefix, out);
                    prefix.pop();
                }
            }
        }
    }

    /// Drop undefined leaves and, bottom-up, nodes left without
    /// children. `None` if nothing remains.
    pub fn strip(self) -> Option<Self> {
        match self {
            Self::Leaf(d) if d.is_undefined() => None,
            Self::Leaf(d) => Some(Self::Leaf(d)),
            Self::Node(children) => {
                let kept: IndexMap<String, Tree> = children
                    .into_iter()
                    .filter_map(|(k, v)| v.strip().map(|v| (k, v)))
                    .collect();
                (!kept.is_empty()).then_some(Self::Node(kept))
            }
        }
    }

    /// Replace every node holding exactly one child by that child.
    pub fn compress(self) -> Self {
        match self {
            Self::Leaf(d) => Self::Leaf(d),
            Self::Node(children) if children.len() == 1 => match children.into_iter().next() {
                Some((_, only)) => only.compress(),
                None => Self::empty(),
            },
            Self::Node(children) => Self::Node(
                children
                    .into_iter()
                    .map(|(k, v)| (k, v.compress()))
                    .collect(),
            ),
        }
    }

    fn finish(self, options: Layout) -> Self {
        let tree = if options.strip {
            self.strip().unwrap_or_default()
        } else {
            self
        };
        if options.compress {
            tree.compress()
        } else {
            tree
        }
    }
}

// ── Options ─────────────────────────────────────────────────────

/// Field labels to include: names or wildcard patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels(Vec<String>);

impl Labels {
    /// Every label.
    pub fn all() -> Self {
        Self(vec!["*".to_string()])
    }

    /// Returns `true` if `label` matches any of the patterns.
    pub fn matches(&self, label: &str) -> bool {
        self.0.iter().any(|p| WildMatch::new(p).matches(label))
    }

    fn select(&self, labels: Vec<String>) -> Vec<String> {
        let patterns: Vec<WildMatch> = self.0.iter().map(|p| WildMatch::new(p)).collect();
        labels
            .into_iter()
            .filter(|l| patterns.iter().any(|p| p.matches(l)))
            .collect()
    }
}

impl From<&str> for Labels {
    fn from(v: &str) -> Self {
        Self(vec![v.to_string()])
    }
}

impl From<String> for Labels {
    fn from(v: String) -> Self {
        Self(vec![v])
    }
}

impl From<Vec<&str>> for Labels {
    fn from(v: Vec<&str>) -> Self {
        Self(v.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<String>> for Labels {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl<const N: usize> From<[&str; N]> for Labels {
    fn from(v: [&str; N]) -> Self {
        Self(v.into_iter().map(str::to_owned).collect())
    }
}

/// Which constituents [`Results::place`](crate::Results::place) includes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Constituents {
    /// Every constituent, each under a `label#c` key when a point holds
    /// more than one.
    #[default]
    All,
    /// One constituent, under the plain label.
    Single(usize),
    /// The listed constituents, each under a `label#c` key when a point
    /// holds more than one.
    Subset(Vec<usize>),
}

impl Constituents {
    fn indices(&self, n: usize) -> Vec<usize> {
        match self {
            Self::All => (0..n).collect(),
            Self::Single(c) => (*c < n).then_some(*c).into_iter().collect(),
            Self::Subset(cs) => cs.iter().copied().filter(|&c| c < n).collect(),
        }
    }

    fn suffixed(&self, n: usize) -> bool {
        n > 1 && !matches!(self, Self::Single(_))
    }
}

impl From<usize> for Constituents {
    fn from(c: usize) -> Self {
        Self::Single(c)
    }
}

impl From<Vec<usize>> for Constituents {
    fn from(cs: Vec<usize>) -> Self {
        Self::Subset(cs)
    }
}

/// Post-processing of a [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Collapse single-child levels.
    pub compress: bool,
    /// Drop undefined leaves and empty nodes.
    pub strip: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            compress: true,
            strip: true,
        }
    }
}

impl Layout {
    /// Keep every level and every entry.
    pub fn full() -> Self {
        Self {
            compress: false,
            strip: false,
        }
    }
}

// ── Read ────────────────────────────────────────────────────────

/// Visible partition groups of `increment` present in the store, by kind.
pub(crate) fn present_groups<S: Store + ?Sized>(
    store: &S,
    selection: &Selection,
    increment: IncrementId,
    kind: PartitionKind,
) -> Vec<GroupKey> {
    store
        .list_groups(&increment.path().join(kind.as_str()))
        .into_iter()
        .filter(|name| selection.names(kind).contains(name))
        .map(|name| GroupKey::new(increment, kind, name))
        .collect()
}

/// Fields as stored:
/// `increment_<i>` → `phase|homogenization` → name → label → dataset.
pub(crate) fn read<S: Store + ?Sized>(
    store: &S,
    selection: &Selection,
    labels: &Labels,
    layout: Layout,
) -> Tree {
    let mut root = IndexMap::new();
    for &increment in &selection.increments {
        let mut by_kind = IndexMap::new();
        for kind in PartitionKind::ALL {
            let mut by_name = IndexMap::new();
            for group in present_groups(store, selection, increment, kind) {
                let mut fields = IndexMap::new();
                for label in labels.select(store.list_arrays(&group.path())) {
                    if let Some(d) = store.read_array(&group.field(&label)) {
                        fields.insert(label, Tree::Leaf(d));
                    }
                }
                by_name.insert(group.name, Tree::Node(fields));
            }
            by_kind.insert(kind.as_str().to_string(), Tree::Node(by_name));
        }
        root.insert(increment.to_string(), Tree::Node(by_kind));
    }
    Tree::Node(root).finish(layout)
}

// ── Place ───────────────────────────────────────────────────────

/// A placed field under construction.
struct Slot {
    data: Dataset,
    covered: Vec<bool>,
}

impl Slot {
    fn new(points: usize, like: &Dataset) -> Self {
        Self {
            data: Dataset::filled(points, like.sample_shape(), like.dtype())
                .with_attrs(like.attrs().clone()),
            covered: vec![false; points],
        }
    }

    /// Turn an integer slot into a float one, keeping `NaN` on uncovered
    /// points.
    fn promote(&mut self) -> Result<(), ShapeError> {
        let k = self.data.sample_size();
        let Values::Int(v) = self.data.values() else {
            return Ok(());
        };
        let values: Vec<f64> = v
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                if self.covered[i / k.max(1)] {
                    x as f64
                } else {
                    f64::NAN
                }
            })
            .collect();
        let attrs = self.data.attrs().clone();
        self.data = Dataset::from_float(self.data.shape(), values)?.with_attrs(attrs);
        Ok(())
    }

    fn scatter(&mut self, at: &[usize], src: &Dataset, from: &[usize]) -> Result<(), ShapeError> {
        if self.data.dtype() == Dtype::Int && src.dtype() == Dtype::Float {
            self.promote()?;
        }
        self.data.scatter_rows(at, src, from)?;
        for &p in at {
            self.covered[p] = true;
        }
        Ok(())
    }
}

/// Fields on the global point order:
/// `increment_<i>` → `phase|homogenization` → label (`label#c` per
/// constituent) → dataset with one row per point.
pub(crate) fn place<S: Store + ?Sized>(
    store: &S,
    catalog: &Catalog,
    selection: &Selection,
    labels: &Labels,
    constituents: &Constituents,
    layout: Layout,
) -> Tree {
    let mut root = IndexMap::new();
    for &increment in &selection.increments {
        let by_kind = place_increment(store, catalog, selection, increment, labels, constituents);
        let by_kind = by_kind
            .into_iter()
            .map(|(kind, fields)| {
                let leaves = fields
                    .into_iter()
                    .map(|(label, d)| (label, Tree::Leaf(d)))
                    .collect();
                (kind.as_str().to_string(), Tree::Node(leaves))
            })
            .collect();
        root.insert(increment.to_string(), Tree::Node(by_kind));
    }
    Tree::Node(root).finish(layout)
}

/// One increment's placed fields, by partition kind.
pub(crate) fn place_increment<S: Store + ?Sized>(
    store: &S,
    catalog: &Catalog,
    selection: &Selection,
    increment: IncrementId,
    labels: &Labels,
    constituents: &Constituents,
) -> Vec<(PartitionKind, IndexMap<String, Dataset>)> {
    let points = catalog.grid.points();
    let n = catalog.mapping.constituents();
    let mut out = Vec::with_capacity(PartitionKind::ALL.len());
    for kind in PartitionKind::ALL {
        let mut slots: IndexMap<String, Slot> = IndexMap::new();
        for group in present_groups(store, selection, increment, kind) {
            let targets: Vec<(Option<usize>, _)> = match kind {
                PartitionKind::Phase => constituents
                    .indices(n)
                    .into_iter()
                    .map(|c| (Some(c), catalog.mapping.gather(kind, &group.name, c)))
                    .collect(),
                PartitionKind::Homogenization => {
                    vec![(None, catalog.mapping.gather(kind, &group.name, 0))]
                }
            };
            if targets.iter().any(|(_, plan)| plan.is_none()) {
                log::warn!("{group}: partition is not mapped, skipping");
                continue;
            }
            for label in labels.select(store.list_arrays(&group.path())) {
                let Some(data) = store.read_array(&group.field(&label)) else {
                    continue;
                };
                for (c, plan) in targets.iter().filter_map(|(c, p)| p.as_ref().map(|p| (c, p))) {
                    let key = match c {
                        Some(c) if constituents.suffixed(n) => format!("{label}#{c}"),
                        _ => label.clone(),
                    };
                    let slot = slots
                        .entry(key)
                        .or_insert_with(|| Slot::new(points, &data));
                    if let Err(e) = slot.scatter(&plan.at, &data, &plan.from) {
                        log::warn!("{group}: cannot place '{label}': {e}");
                    }
                }
            }
        }
        let fields = slots.into_iter().map(|(k, s)| (k, s.data)).collect();
        out.push((kind, fields));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(v: &[f64]) -> Tree {
        Tree::Leaf(Dataset::from_float(&[v.len()], v.to_vec()).unwrap())
    }

    fn node(children: Vec<(&str, Tree)>) -> Tree {
        Tree::Node(
            children
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn strip_drops_undefined_and_empty() {
        let t = node(vec![
            ("a", node(vec![("x", leaf(&[f64::NAN])), ("y", leaf(&[1.0]))])),
            ("b", node(vec![])),
            ("c", node(vec![("z", leaf(&[f64::NAN, f64::NAN]))])),
        ]);
        let stripped = t.strip().unwrap();
        assert_eq!(stripped, node(vec![("a", node(vec![("y", leaf(&[1.0]))]))]));
        assert!(node(vec![("b", node(vec![]))]).strip().is_none());
    }

    #[test]
    fn compress_collapses_single_children() {
        let t = node(vec![(
            "increment_0",
            node(vec![("phase", node(vec![("x", leaf(&[1.0])), ("y", leaf(&[2.0]))]))]),
        )]);
        assert_eq!(
            t.compress(),
            node(vec![("x", leaf(&[1.0])), ("y", leaf(&[2.0]))])
        );
        let single = node(vec![("a", node(vec![("b", leaf(&[3.0]))]))]);
        assert_eq!(single.compress(), leaf(&[3.0]));
        assert_eq!(Tree::empty().compress(), Tree::empty());
    }

    #[test]
    fn leaves_report_paths() {
        let t = node(vec![
            ("a", node(vec![("x", leaf(&[1.0]))])),
            ("b", leaf(&[2.0])),
        ]);
        let paths: Vec<Vec<&str>> = t.leaves().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec![vec!["a", "x"], vec!["b"]]);
        assert_eq!(t.at(&["a", "x"]), Some(&leaf(&[1.0])));
        assert!(t.at(&["a", "y"]).is_none());
    }

    #[test]
    fn labels_match_patterns() {
        let l = Labels::from(["F", "sigma*"]);
        assert!(l.matches("F"));
        assert!(l.matches("sigma_vM"));
        assert!(!l.matches("P"));
        assert!(Labels::all().matches("anything"));
        assert_eq!(
            l.select(vec!["F".into(), "P".into(), "sigma".into()]),
            vec!["F".to_string(), "sigma".to_string()]
        );
    }

    #[test]
    fn constituent_selection() {
        assert_eq!(Constituents::All.indices(3), vec![0, 1, 2]);
        assert_eq!(Constituents::from(vec![2, 5]).indices(3), vec![2]);
        assert!(Constituents::All.suffixed(2));
        assert!(!Constituents::All.suffixed(1));
        assert!(!Constituents::Single(1).suffixed(2));
    }

    #[test]
    fn integer_slot_promotes_with_nan_fill() {
        let int = Dataset::from_int(&[1], vec![7]).unwrap();
        let float = Dataset::from_float(&[1], vec![0.5]).unwrap();
        let mut slot = Slot::new(3, &int);
        slot.scatter(&[0], &int, &[0]).unwrap();
        slot.scatter(&[2], &float, &[0]).unwrap();
        let v = slot.data.as_float().unwrap();
        assert_eq!(v[0], 7.0);
        assert!(v[1].is_nan());
        assert_eq!(v[2], 0.5);
    }
}
