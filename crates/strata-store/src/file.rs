//! File-backed store.
//!
//! [`FileStore`] decodes a container file into memory on
//! [`open`](FileStore::open) and writes it back on
//! [`commit`](Store::commit). File handles live only inside those two
//! calls, so they are released on every exit path, including errors.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use strata_core::{Dataset, Store, StoreError, StorePath, WriteOutcome};

use crate::codec::{decode_store, encode_store};
use crate::memory::MemoryStore;

/// A container file loaded into memory.
///
/// Writes go to memory and mark the store dirty; `commit` rewrites the
/// file through a sibling temporary file and an atomic rename, so a
/// reader never observes a half-written container.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    dirty: bool,
}

impl FileStore {
    /// Open and decode an existing container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let mut memory = decode_store(&mut reader)?;
        memory.set_name(stem(&path));
        log::debug!("opened container {}", path.display());
        Ok(Self {
            path,
            memory,
            dirty: false,
        })
    }

    /// Write `memory` to a new container file at `path` and return the
    /// store backed by it.
    pub fn create(path: impl AsRef<Path>, mut memory: MemoryStore) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        memory.set_name(stem(&path));
        let mut store = Self {
            path,
            memory,
            dirty: true,
        };
        store.commit()?;
        Ok(store)
    }

    /// Location of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if there are writes not yet committed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// In-memory view of the container.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string())
}

impl Store for FileStore {
    fn list_groups(&self, path: &StorePath) -> Vec<String> {
        self.memory.list_groups(path)
    }

    fn list_arrays(&self, path: &StorePath) -> Vec<String> {
        self.memory.list_arrays(path)
    }

    fn read_array(&self, path: &StorePath) -> Option<Dataset> {
        self.memory.read_array(path)
    }

    fn contains_array(&self, path: &StorePath) -> bool {
        self.memory.contains_array(path)
    }

    fn write_array(
        &mut self,
        path: &StorePath,
        dataset: Dataset,
        overwrite: bool,
    ) -> Result<WriteOutcome, StoreError> {
        let outcome = self.memory.write_array(path, dataset, overwrite)?;
        if outcome != WriteOutcome::Kept {
            self.dirty = true;
        }
        Ok(outcome)
    }

    fn move_array(&mut self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        self.memory.move_array(from, to)?;
        self.dirty = true;
        Ok(())
    }

    fn remove_array(&mut self, path: &StorePath) -> Result<Dataset, StoreError> {
        let removed = self.memory.remove_array(path)?;
        self.dirty = true;
        Ok(removed)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            encode_store(&mut writer, &self.memory)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        log::info!("committed container {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        self.memory.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_open_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tension.strata");
        let mut memory = MemoryStore::new("ignored");
        memory
            .write_array(
                &"increment_0/phase/A/F".into(),
                Dataset::from_float(&[1], vec![2.0]).unwrap(),
                false,
            )
            .unwrap();
        let created = FileStore::create(&path, memory).unwrap();
        assert!(!created.is_dirty());
        assert_eq!(created.name(), "tension");

        let opened = FileStore::open(&path).unwrap();
        assert_eq!(opened.name(), "tension");
        assert_eq!(
            opened
                .read_array(&"increment_0/phase/A/F".into())
                .unwrap()
                .as_float()
                .unwrap(),
            &[2.0]
        );
    }

    #[test]
    fn kept_writes_do_not_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.strata");
        let mut memory = MemoryStore::new("c");
        memory
            .write_array(&"g/x".into(), Dataset::scalar(1.0), false)
            .unwrap();
        let mut store = FileStore::create(&path, memory).unwrap();
        let outcome = store
            .write_array(&"g/x".into(), Dataset::scalar(2.0), false)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Kept);
        assert!(!store.is_dirty());
        store
            .write_array(&"g/y".into(), Dataset::scalar(2.0), false)
            .unwrap();
        assert!(store.is_dirty());
    }

    #[test]
    fn commit_is_visible_to_new_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.strata");
        let mut store = FileStore::create(&path, MemoryStore::new("c")).unwrap();
        store
            .write_array(&"g/x".into(), Dataset::scalar(3.0), false)
            .unwrap();
        assert!(!FileStore::open(&path)
            .unwrap()
            .contains_array(&"g/x".into()));
        store.commit().unwrap();
        assert!(FileStore::open(&path)
            .unwrap()
            .contains_array(&"g/x".into()));
        assert!(!dir.path().join("c.strata.tmp").exists());
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileStore::open(dir.path().join("absent.strata")),
            Err(StoreError::Io(_))
        ));
    }
}
