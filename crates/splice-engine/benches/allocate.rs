use criterion::{black_box, criterion_group, criterion_main, Criterion};
use splice_core::{CableRole, EngineConfig, Medium};
use splice_engine::{allocate, format, Coordinator};
use splice_store::MemoryStore;

fn allocate_bench(c: &mut Criterion) {
    let identifiers: Vec<String> = (0..2_000u32)
        .map(|i| format(&format!("pon{}", i % 17), 1 + i % 24, 1 + i % 24 + i % 8))
        .collect();
    c.bench_function("allocate_2k", |b| {
        b.iter(|| black_box(allocate(&identifiers)));
    });
}

fn feed_cascade_bench(c: &mut Criterion) {
    let mut coord = Coordinator::new(MemoryStore::new(), EngineConfig::default());
    let feed = coord
        .create_cable("Feed", 10_000, Medium::Fiber, CableRole::Feed)
        .unwrap();
    let dist = coord
        .create_cable("Dist", 10_000, Medium::Fiber, CableRole::Distribution)
        .unwrap();
    let head = coord.add_circuit(&feed, "olt,1-4", None).unwrap();
    for i in 0..200u32 {
        let prefix = format!("pon{i}");
        coord.add_circuit(&feed, &format(&prefix, 1, 12), None).unwrap();
        let d = coord.add_circuit(&dist, &format(&prefix, 3, 6), None).unwrap();
        coord.splice_on(&d).unwrap();
    }
    c.bench_function("plan_feed_edit_200_dependents", |b| {
        b.iter(|| black_box(coord.plan_edit_identifier(&head, "olt,1-8").unwrap()));
    });
}

criterion_group!(benches, allocate_bench, feed_cascade_bench);
criterion_main!(benches);
