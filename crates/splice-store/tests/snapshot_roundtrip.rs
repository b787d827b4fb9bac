use splice_core::{
    Cable, CableId, CableRole, Circuit, CircuitId, CircuitStore, Medium, WriteBatch, WriteOp,
};
use splice_store::{read_snapshot, write_snapshot, MemoryStore, PlantSnapshot, SqliteStore};
use tempfile::tempdir;

fn plant() -> MemoryStore {
    let mut store = MemoryStore::new();
    let mut batch = WriteBatch::new();
    batch.push(WriteOp::PutCable(Cable {
        id: CableId::from_raw("cu"),
        name: "Copper trunk".into(),
        capacity: 100,
        medium: Medium::Copper,
        role: CableRole::Feed,
    }));
    for (index, identifier) in ["cu,1-25", "cu,26-50"].iter().enumerate() {
        let start = index as u32 * 25 + 1;
        batch.push(WriteOp::InsertCircuit(Circuit {
            id: CircuitId::from_raw(format!("c{index}")),
            cable_id: CableId::from_raw("cu"),
            identifier: identifier.to_string(),
            order_index: index,
            strand_start: start,
            strand_end: start + 24,
            splice: None,
        }));
    }
    store.apply_batch(&batch).expect("seed");
    store
}

#[test]
fn snapshot_moves_between_stores_unchanged() {
    let memory = plant();
    let snapshot = PlantSnapshot::capture(&memory).expect("capture");

    let mut sqlite = SqliteStore::open_in_memory().expect("sqlite");
    snapshot.restore_into(&mut sqlite).expect("restore");
    let copied = PlantSnapshot::capture(&sqlite).expect("capture sqlite");

    assert_eq!(copied, snapshot);
    assert_eq!(copied.fingerprint().unwrap(), snapshot.fingerprint().unwrap());
}

#[test]
fn snapshot_file_round_trip() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("plant.json");
    let snapshot = PlantSnapshot::capture(&plant()).expect("capture");
    write_snapshot(&path, &snapshot).expect("write");
    let loaded = read_snapshot(&path).expect("read");
    assert_eq!(loaded, snapshot);
}

#[test]
fn incompatible_schema_is_rejected() {
    let mut snapshot = PlantSnapshot::capture(&plant()).expect("capture");
    snapshot.schema_version.major = 9;
    let err = snapshot.restore_batch().unwrap_err();
    assert_eq!(err.info().code, "snapshot-schema");
}
