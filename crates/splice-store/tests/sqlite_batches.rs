use splice_core::{
    Cable, CableId, CableRole, Circuit, CircuitFields, CircuitId, CircuitStore, Medium,
    SpliceLink, SpliceUpdate, StrandSpan, WriteBatch, WriteOp,
};
use splice_store::SqliteStore;
use tempfile::NamedTempFile;

fn cable(id: &str, role: CableRole) -> Cable {
    Cable {
        id: CableId::from_raw(id),
        name: id.to_string(),
        capacity: 24,
        medium: Medium::Fiber,
        role,
    }
}

fn circuit(id: &str, cable: &str, identifier: &str, order_index: usize, span: (u32, u32)) -> Circuit {
    Circuit {
        id: CircuitId::from_raw(id),
        cable_id: CableId::from_raw(cable),
        identifier: identifier.into(),
        order_index,
        strand_start: span.0,
        strand_end: span.1,
        splice: None,
    }
}

fn seeded() -> (NamedTempFile, SqliteStore) {
    let db = NamedTempFile::new().expect("db");
    let mut store = SqliteStore::open(db.path()).expect("open");
    let mut batch = WriteBatch::new();
    batch.push(WriteOp::PutCable(cable("feed", CableRole::Feed)));
    batch.push(WriteOp::PutCable(cable("dist", CableRole::Distribution)));
    batch.push(WriteOp::InsertCircuit(circuit("f1", "feed", "pon,1-12", 0, (1, 12))));
    batch.push(WriteOp::InsertCircuit(circuit("d1", "dist", "pon,3-4", 0, (1, 2))));
    store.apply_batch(&batch).expect("seed");
    (db, store)
}

#[test]
fn records_survive_reopen() {
    let (db, mut store) = seeded();
    let mut batch = WriteBatch::new();
    batch.update(
        CircuitId::from_raw("d1"),
        CircuitFields {
            splice: Some(SpliceUpdate::Set(SpliceLink {
                feed_cable_id: CableId::from_raw("feed"),
                feed_strand_start: 3,
                feed_strand_end: 4,
            })),
            ..CircuitFields::default()
        },
    );
    store.apply_batch(&batch).expect("splice");
    drop(store);

    let reopened = SqliteStore::open(db.path()).expect("reopen");
    let dist = reopened.circuit(&CircuitId::from_raw("d1")).expect("circuit");
    assert_eq!(dist.splice.as_ref().map(|l| l.feed_span()), Some(StrandSpan::new(3, 4)));
    let dependents = reopened.spliced_to(&CableId::from_raw("feed")).expect("dependents");
    assert_eq!(dependents.len(), 1);
    assert_eq!(reopened.cable(&CableId::from_raw("feed")).unwrap().role, CableRole::Feed);
}

#[test]
fn failing_op_rolls_back_the_transaction() {
    let (_db, mut store) = seeded();
    let mut batch = WriteBatch::new();
    batch.update(
        CircuitId::from_raw("f1"),
        CircuitFields {
            identifier: Some("pon,1-24".into()),
            span: Some(StrandSpan::new(1, 24)),
            ..CircuitFields::default()
        },
    );
    batch.push(WriteOp::DeleteCircuit(CircuitId::from_raw("nope")));
    let err = store.apply_batch(&batch).unwrap_err();
    assert_eq!(err.info().code, "batch-rejected");
    let feed = store.circuit(&CircuitId::from_raw("f1")).unwrap();
    assert_eq!(feed.identifier, "pon,1-12");
    assert_eq!(feed.span(), StrandSpan::new(1, 12));
}

#[test]
fn circuits_are_ordered_and_ids_are_fresh() {
    let (_db, mut store) = seeded();
    let mut batch = WriteBatch::new();
    batch.push(WriteOp::InsertCircuit(circuit("d0", "dist", "olt,1-2", 1, (3, 4))));
    store.apply_batch(&batch).expect("insert");
    let ids: Vec<String> = store
        .circuits(&CableId::from_raw("dist"))
        .unwrap()
        .into_iter()
        .map(|c| c.id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["d1", "d0"]);

    let first = store.next_circuit_id().unwrap();
    let second = store.next_circuit_id().unwrap();
    assert_ne!(first, second);
}

#[test]
fn unknown_cable_is_not_found() {
    let store = SqliteStore::open_in_memory().expect("open");
    let err = store.circuits(&CableId::from_raw("ghost")).unwrap_err();
    assert_eq!(err.info().code, "cable-not-found");
}
