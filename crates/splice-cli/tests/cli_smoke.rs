use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn splice(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_splice"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run splice")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "splice failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

fn db(path: &Path, args: &[&str]) -> serde_json::Value {
    let database = path.to_str().expect("utf-8 path");
    let mut full = vec!["db", "--database", database];
    full.extend_from_slice(args);
    json(&splice(&full))
}

#[test]
fn allocate_reports_spans_and_skips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("ids.txt");
    fs::write(&input, "a,1-2\nbad line\nb,1-4\n").expect("write input");
    let report = json(&splice(&[
        "allocate",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--capacity",
        "6",
    ]));
    assert_eq!(report["assigned"], 6);
    assert_eq!(report["status"]["fully_assigned"], true);
    assert_eq!(report["circuits"][1]["strand_start"], 3);
    assert_eq!(report["circuits"][1]["strand_end"], 6);
    assert_eq!(report["skipped"][0]["line"], 2);
}

#[test]
fn segment_prints_rows() {
    let report = json(&splice(&["segment", "--dist", "5-16", "--feed", "1-12"]));
    assert_eq!(report["group_size"], 12);
    assert_eq!(report["rows"].as_array().map(Vec::len), Some(2));

    let unspliced = json(&splice(&["segment", "--dist", "1-4", "--medium", "copper"]));
    assert_eq!(unspliced["group_size"], 25);
    assert_eq!(unspliced["rows"].as_array().map(Vec::len), Some(0));
}

#[test]
fn db_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plant.db");
    db(&path, &["init"]);
    let feed = db(&path, &["cable-add", "--name", "F1", "--capacity", "48", "--role", "feed"]);
    let dist = db(&path, &["cable-add", "--name", "D1", "--capacity", "24", "--role", "distribution"]);
    let feed = feed["cable"].as_str().expect("feed id").to_string();
    let dist = dist["cable"].as_str().expect("dist id").to_string();

    db(&path, &["circuit-add", "--cable", &feed, "--identifier", "pon,1-12"]);
    let added = db(&path, &["circuit-add", "--cable", &dist, "--identifier", "pon,3-4"]);
    let circuit = added["circuit"].as_str().expect("circuit id").to_string();

    let found = db(&path, &["splice", "--circuit", &circuit]);
    assert_eq!(found["feed_span"]["start"], 3);
    assert_eq!(found["feed_span"]["end"], 4);

    let shown = db(&path, &["show", "--cable", &dist]);
    assert_eq!(shown[0]["splice"]["feed_strand_start"], 3);

    db(&path, &["unsplice", "--circuit", &circuit]);
    let exported = db(&path, &["export"]);
    assert_eq!(exported["circuits"].as_array().map(Vec::len), Some(2));
    assert!(exported["circuits"][1]["splice"].is_null());
}

#[test]
fn failures_exit_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plant.db");
    let database = path.to_str().expect("utf-8 path");
    let output = splice(&["db", "--database", database, "splice", "--circuit", "cir-000042"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn plan_writes_snapshot_and_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plant = dir.path().join("plant.yaml");
    fs::write(
        &plant,
        "cables:\n  - { name: F, capacity: 24, role: Feed, circuits: [\"pon,1-12\"] }\n  - { name: D, capacity: 24, role: Distribution, circuits: [\"pon,5-8\"] }\nsplices:\n  - { cable: D, identifier: \"pon,5-8\" }\n",
    )
    .expect("write plant");
    let out = dir.path().join("snapshot.json");
    let summary = json(&splice(&[
        "plan",
        "--plant",
        plant.to_str().expect("utf-8 path"),
        "--out",
        out.to_str().expect("utf-8 path"),
    ]));
    assert_eq!(summary["spliced"], 1);
    assert_eq!(summary["failed_splices"].as_array().map(Vec::len), Some(0));

    let snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read snapshot")).expect("snapshot json");
    assert_eq!(snapshot["circuits"][1]["splice"]["feed_strand_start"], 5);
}
