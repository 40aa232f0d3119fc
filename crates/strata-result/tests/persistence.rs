//! Views over file-backed containers.

use std::sync::{Arc, RwLock};
use std::thread;

use strata_core::{GroupKey, IncrementId, PartitionKind, Store};
use strata_mech::NormOrder;
use strata_result::{Constituents, Layout, Results};
use strata_store::FileStore;
use strata_test_utils::fixtures;

fn alpha(increment: u32) -> GroupKey {
    GroupKey::new(IncrementId(increment), PartitionKind::Phase, "alpha")
}

#[test]
fn derived_fields_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.strata");
    FileStore::create(&path, fixtures::polycrystal()).unwrap();

    let r = Results::open(&path).unwrap();
    let report = r.add_norm("v", NormOrder::Two).unwrap();
    assert_eq!(report.written().count(), 4);
    assert!(!r.with_store(FileStore::is_dirty).unwrap());

    let reopened = FileStore::open(&path).unwrap();
    let norm = reopened.read_array(&alpha(10).field("|v|_2")).unwrap();
    assert_eq!(norm.as_float().unwrap(), &[13.0, 3.0]);
    assert_eq!(norm.attrs().formula.as_deref(), Some("norm_2(#v#)"));
    assert_eq!(reopened.name(), "run");
}

#[test]
fn renames_are_committed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rename.strata");
    FileStore::create(&path, fixtures::polycrystal()).unwrap();

    let moved = Results::open(&path)
        .unwrap()
        .allow_modification()
        .rename("F", "F_total")
        .unwrap();
    assert_eq!(moved, 6);

    let r = Results::open(&path).unwrap();
    let placed = r
        .view("increments", 0)
        .unwrap()
        .place("F_total", Layout::default(), Constituents::All)
        .unwrap();
    assert_eq!(placed.leaf().unwrap().shape(), &[6, 3, 3]);
    assert!(r
        .with_store(|s| s.read_array(&alpha(0).field("F")))
        .unwrap()
        .is_none());
}

#[test]
fn shared_store_serializes_writers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.strata");
    let store = FileStore::create(&path, fixtures::polycrystal()).unwrap();
    let shared = Arc::new(RwLock::new(store));

    let r = Results::shared(Arc::clone(&shared)).unwrap();
    let handles: Vec<_> = ["alpha", "beta", "gamma"]
        .into_iter()
        .map(|phase| {
            let view = r.view("phases", phase).unwrap();
            thread::spawn(move || view.add_determinant("F").unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap().written().count(), 2);
    }

    let reopened = FileStore::open(&path).unwrap();
    for phase in fixtures::PHASES {
        let key = GroupKey::new(IncrementId(10), PartitionKind::Phase, phase);
        assert!(reopened.contains_array(&key.field("det(F)")));
    }
}
