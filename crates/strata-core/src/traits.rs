//! The narrow interface the derive engine needs from a hierarchical store.

use crate::dataset::Dataset;
use crate::error::StoreError;
use crate::id::StorePath;

/// What a [`Store::write_array`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No dataset existed under the name; it was created.
    Created,
    /// An existing dataset was replaced (`overwrite == true`).
    Replaced,
    /// A dataset existed and `overwrite == false`; nothing changed.
    Kept,
}

/// Key/array persistence with group nesting.
///
/// Groups are created implicitly by [`write_array`](Store::write_array).
/// Listings are sorted so that every backend enumerates in the same order.
pub trait Store {
    /// Names of the child groups of `path` (empty if `path` is not a group).
    fn list_groups(&self, path: &StorePath) -> Vec<String>;

    /// Names of the child datasets of `path` (empty if `path` is not a group).
    fn list_arrays(&self, path: &StorePath) -> Vec<String>;

    /// Read a dataset together with its attributes.
    fn read_array(&self, path: &StorePath) -> Option<Dataset>;

    /// Returns `true` if a dataset exists at `path`.
    fn contains_array(&self, path: &StorePath) -> bool {
        self.read_array(path).is_some()
    }

    /// Write a dataset and its attributes in one step.
    ///
    /// If a dataset already exists at `path` it is replaced only when
    /// `overwrite` is set; otherwise the call returns
    /// [`WriteOutcome::Kept`] and leaves data and attributes untouched.
    fn write_array(
        &mut self,
        path: &StorePath,
        dataset: Dataset,
        overwrite: bool,
    ) -> Result<WriteOutcome, StoreError>;

    /// Move a dataset, replacing any dataset at `to`.
    fn move_array(&mut self, from: &StorePath, to: &StorePath) -> Result<(), StoreError>;

    /// Remove a dataset and return it.
    fn remove_array(&mut self, path: &StorePath) -> Result<Dataset, StoreError>;

    /// Persist pending writes. In-memory backends have nothing to do.
    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Container name used to derive export file names.
    fn name(&self) -> &str {
        "result"
    }
}
