//! In-memory group tree.

use indexmap::IndexMap;

use strata_core::{Dataset, Store, StoreError, StorePath, WriteOutcome};

/// A group node: child groups and child datasets, keyed by name.
///
/// A name is either a group or a dataset within one parent, never both.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    groups: IndexMap<String, Group>,
    arrays: IndexMap<String, Dataset>,
}

impl Group {
    /// An empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Child groups in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = (&String, &Group)> {
        self.groups.iter()
    }

    /// Child datasets in insertion order.
    pub fn arrays(&self) -> impl Iterator<Item = (&String, &Dataset)> {
        self.arrays.iter()
    }

    /// Insert a child group, replacing any group of the same name.
    pub fn insert_group(&mut self, name: impl Into<String>, group: Group) {
        self.groups.insert(name.into(), group);
    }

    /// Insert a child dataset, replacing any dataset of the same name.
    pub fn insert_array(&mut self, name: impl Into<String>, dataset: Dataset) {
        self.arrays.insert(name.into(), dataset);
    }

    fn descend(&self, segments: &[String]) -> Option<&Group> {
        let mut node = self;
        for segment in segments {
            node = node.groups.get(segment)?;
        }
        Some(node)
    }

    fn descend_mut(&mut self, segments: &[String]) -> Option<&mut Group> {
        let mut node = self;
        for segment in segments {
            node = node.groups.get_mut(segment)?;
        }
        Some(node)
    }

    fn descend_or_create(
        &mut self,
        segments: &[String],
        path: &StorePath,
    ) -> Result<&mut Group, StoreError> {
        let mut node = self;
        for segment in segments {
            if node.arrays.contains_key(segment) {
                return Err(StoreError::KindConflict {
                    path: path.to_string(),
                });
            }
            node = node.groups.entry(segment.clone()).or_default();
        }
        Ok(node)
    }
}

/// Store backed by an in-memory [`Group`] tree.
///
/// # Examples
///
/// ```
/// use strata_core::{Dataset, Store, StorePath, WriteOutcome};
/// use strata_store::MemoryStore;
///
/// let mut store = MemoryStore::new("demo");
/// let path = StorePath::parse("increment_0/phase/A/F");
/// let d = Dataset::from_float(&[1], vec![1.0]).unwrap();
///
/// assert_eq!(store.write_array(&path, d.clone(), false).unwrap(), WriteOutcome::Created);
/// assert_eq!(store.write_array(&path, d, false).unwrap(), WriteOutcome::Kept);
/// assert_eq!(store.list_groups(&StorePath::parse("increment_0/phase")), vec!["A"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryStore {
    name: String,
    root: Group,
}

impl MemoryStore {
    /// An empty store with the given container name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Group::new(),
        }
    }

    /// Wrap an existing tree.
    pub fn from_root(name: impl Into<String>, root: Group) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// Root group.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Rename the container.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    fn split(path: &StorePath) -> Result<(&[String], &str), StoreError> {
        match path.segments().split_last() {
            Some((name, parent)) => Ok((parent, name.as_str())),
            None => Err(StoreError::KindConflict {
                path: path.to_string(),
            }),
        }
    }
}

fn sorted<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut names: Vec<String> = names.cloned().collect();
    names.sort();
    names
}

impl Store for MemoryStore {
    fn list_groups(&self, path: &StorePath) -> Vec<String> {
        self.root
            .descend(path.segments())
            .map(|g| sorted(g.groups.keys()))
            .unwrap_or_default()
    }

    fn list_arrays(&self, path: &StorePath) -> Vec<String> {
        self.root
            .descend(path.segments())
            .map(|g| sorted(g.arrays.keys()))
            .unwrap_or_default()
    }

    fn read_array(&self, path: &StorePath) -> Option<Dataset> {
        let (parent, name) = Self::split(path).ok()?;
        self.root.descend(parent)?.arrays.get(name).cloned()
    }

    fn contains_array(&self, path: &StorePath) -> bool {
        match Self::split(path) {
            Ok((parent, name)) => self
                .root
                .descend(parent)
                .is_some_and(|g| g.arrays.contains_key(name)),
            Err(_) => false,
        }
    }

    fn write_array(
        &mut self,
        path: &StorePath,
        dataset: Dataset,
        overwrite: bool,
    ) -> Result<WriteOutcome, StoreError> {
        let (parent, name) = Self::split(path)?;
        let group = self.root.descend_or_create(parent, path)?;
        if group.groups.contains_key(name) {
            return Err(StoreError::KindConflict {
                path: path.to_string(),
            });
        }
        if let Some(existing) = group.arrays.get_mut(name) {
            if !overwrite {
                return Ok(WriteOutcome::Kept);
            }
            *existing = dataset;
            return Ok(WriteOutcome::Replaced);
        }
        group.arrays.insert(name.to_string(), dataset);
        Ok(WriteOutcome::Created)
    }

    fn move_array(&mut self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        let dataset = self.read_array(from).ok_or_else(|| StoreError::NotFound {
            path: from.to_string(),
        })?;
        self.write_array(to, dataset, true)?;
        if from != to {
            self.remove_array(from)?;
        }
        Ok(())
    }

    fn remove_array(&mut self, path: &StorePath) -> Result<Dataset, StoreError> {
        let (parent, name) = Self::split(path)?;
        self.root
            .descend_mut(parent)
            .and_then(|g| g.arrays.shift_remove(name))
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: f64) -> Dataset {
        Dataset::from_float(&[1], vec![v]).unwrap()
    }

    #[test]
    fn write_creates_intermediate_groups() {
        let mut s = MemoryStore::new("t");
        s.write_array(&"a/b/c/x".into(), d(1.0), false).unwrap();
        assert_eq!(s.list_groups(&"a".into()), vec!["b"]);
        assert_eq!(s.list_arrays(&"a/b/c".into()), vec!["x"]);
        assert!(s.list_arrays(&"a/b".into()).is_empty());
    }

    #[test]
    fn overwrite_flag_controls_replacement() {
        let mut s = MemoryStore::new("t");
        let p: StorePath = "g/x".into();
        s.write_array(&p, d(1.0), false).unwrap();
        assert_eq!(s.write_array(&p, d(2.0), false).unwrap(), WriteOutcome::Kept);
        assert_eq!(s.read_array(&p).unwrap(), d(1.0));
        assert_eq!(s.write_array(&p, d(3.0), true).unwrap(), WriteOutcome::Replaced);
        assert_eq!(s.read_array(&p).unwrap(), d(3.0));
    }

    #[test]
    fn group_and_array_names_conflict() {
        let mut s = MemoryStore::new("t");
        s.write_array(&"g/x".into(), d(1.0), false).unwrap();
        assert!(matches!(
            s.write_array(&"g".into(), d(1.0), false),
            Err(StoreError::KindConflict { .. })
        ));
        assert!(matches!(
            s.write_array(&"g/x/y".into(), d(1.0), false),
            Err(StoreError::KindConflict { .. })
        ));
    }

    #[test]
    fn root_is_not_a_dataset() {
        let mut s = MemoryStore::new("t");
        assert!(s.write_array(&StorePath::root(), d(1.0), true).is_err());
        assert!(s.read_array(&StorePath::root()).is_none());
    }

    #[test]
    fn move_replaces_target_and_removes_source() {
        let mut s = MemoryStore::new("t");
        s.write_array(&"g/x".into(), d(1.0), false).unwrap();
        s.write_array(&"g/y".into(), d(2.0), false).unwrap();
        s.move_array(&"g/x".into(), &"g/y".into()).unwrap();
        assert!(!s.contains_array(&"g/x".into()));
        assert_eq!(s.read_array(&"g/y".into()).unwrap(), d(1.0));
    }

    #[test]
    fn move_missing_source_fails_without_mutation() {
        let mut s = MemoryStore::new("t");
        s.write_array(&"g/y".into(), d(2.0), false).unwrap();
        assert!(matches!(
            s.move_array(&"g/x".into(), &"g/y".into()),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(s.read_array(&"g/y".into()).unwrap(), d(2.0));
    }

    #[test]
    fn listings_are_sorted() {
        let mut s = MemoryStore::new("t");
        for name in ["c", "a", "b"] {
            s.write_array(&StorePath::root().join("g").join(name), d(0.0), false)
                .unwrap();
        }
        assert_eq!(s.list_arrays(&"g".into()), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_returns_dataset() {
        let mut s = MemoryStore::new("t");
        s.write_array(&"g/x".into(), d(4.0), false).unwrap();
        assert_eq!(s.remove_array(&"g/x".into()).unwrap(), d(4.0));
        assert!(s.remove_array(&"g/x".into()).is_err());
    }
}
