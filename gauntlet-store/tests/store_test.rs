//! Evidence store integration tests: persistence round-trips, atomic
//! snapshots, corruption recovery, and history semantics.

use tempfile::TempDir;

use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::Lifecycle;
use gauntlet_store::store::HISTORY_CAP;
use gauntlet_store::{EvidenceStore, HistoryEntry, TestEntry};

fn temp_store() -> (TempDir, EvidenceStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.json");
    let store = EvidenceStore::load(&path, 0.99, 0.95);
    (dir, store)
}

fn id(s: &str) -> TestId {
    TestId::new(s)
}

// ─── History semantics ─────────────────────────────────────────────────────

#[test]
fn record_run_prepends_newest_first() {
    let (_dir, mut store) = temp_store();
    let t = id("alpha");

    store.record_run(&t, true, Some("c1"), None);
    store.record_run(&t, false, Some("c2"), None);

    let history = store.get_history(&t);
    assert_eq!(history.len(), 2);
    assert!(!history[0].passed);
    assert_eq!(history[0].commit.as_deref(), Some("c2"));
    assert!(history[1].passed);
}

#[test]
fn history_is_capped_dropping_oldest() {
    let (_dir, mut store) = temp_store();
    let t = id("alpha");

    for i in 0..(HISTORY_CAP + 25) {
        store.record_run(&t, true, Some(&format!("c{i}")), None);
    }

    let history = store.get_history(&t);
    assert_eq!(history.len(), HISTORY_CAP);
    // Newest entry is the last recorded; the first 25 commits fell off.
    assert_eq!(
        history[0].commit.as_deref(),
        Some(format!("c{}", HISTORY_CAP + 24).as_str())
    );
    assert_eq!(
        history[HISTORY_CAP - 1].commit.as_deref(),
        Some("c25")
    );
}

#[test]
fn record_run_auto_creates_entry_as_new() {
    let (_dir, mut store) = temp_store();
    let t = id("fresh");
    assert_eq!(store.get_state(&t), None);

    store.record_run(&t, true, None, None);
    assert_eq!(store.get_state(&t), Some(Lifecycle::New));
}

#[test]
fn same_hash_history_excludes_other_and_missing_hashes() {
    let (_dir, mut store) = temp_store();
    let t = id("alpha");

    store.record_run(&t, true, None, None); // no hash — excluded
    store.record_run(&t, true, None, Some("H1"));
    store.record_run(&t, false, None, Some("H2"));
    store.record_run(&t, true, None, Some("H1"));

    let same = store.get_same_hash_history(&t, "H1");
    assert_eq!(same.len(), 2);
    assert!(same.iter().all(|h| h.target_hash.as_deref() == Some("H1")));

    assert_eq!(store.get_same_hash_history(&t, "H2").len(), 1);
    assert!(store.get_same_hash_history(&t, "H3").is_empty());
}

#[test]
fn invalidate_evidence_clears_history_and_returns_to_burn_in() {
    let (_dir, mut store) = temp_store();
    let t = id("alpha");

    store.set_target_hash(&t, "H1");
    store.set_state(&t, Lifecycle::Stable, false);
    for _ in 0..20 {
        store.record_run(&t, true, None, Some("H1"));
    }

    store.invalidate_evidence(&t);
    assert!(store.get_history(&t).is_empty());
    assert_eq!(store.get_state(&t), Some(Lifecycle::BurningIn));
    // The stored hash field survives; callers overwrite it next.
    assert_eq!(store.target_hash(&t), Some("H1"));
}

#[test]
fn set_state_preserves_target_hash_and_optionally_clears_history() {
    let (_dir, mut store) = temp_store();
    let t = id("alpha");

    store.set_target_hash(&t, "H1");
    store.record_run(&t, true, None, Some("H1"));

    store.set_state(&t, Lifecycle::Flaky, false);
    assert_eq!(store.get_state(&t), Some(Lifecycle::Flaky));
    assert_eq!(store.get_history(&t).len(), 1);
    assert_eq!(store.target_hash(&t), Some("H1"));

    store.set_state(&t, Lifecycle::BurningIn, true);
    assert!(store.get_history(&t).is_empty());
    assert_eq!(store.target_hash(&t), Some("H1"));
}

// ─── Persistence ───────────────────────────────────────────────────────────

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("status.json");

    let mut store = EvidenceStore::load(&path, 0.99, 0.95);
    store.set_state(&id("a"), Lifecycle::Stable, false);
    store.set_target_hash(&id("a"), "H1");
    store.record_run(&id("a"), true, Some("c1"), Some("H1"));
    store.set_state(&id("b"), Lifecycle::Flaky, false);
    store.save().unwrap();

    let reloaded = EvidenceStore::load(&path, 0.99, 0.95);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get_state(&id("a")), Some(Lifecycle::Stable));
    assert_eq!(reloaded.target_hash(&id("a")), Some("H1"));
    assert_eq!(reloaded.get_history(&id("a")).len(), 1);
    assert_eq!(reloaded.get_state(&id("b")), Some(Lifecycle::Flaky));
}

#[test]
fn crash_between_mutations_observes_last_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.json");

    let mut store = EvidenceStore::load(&path, 0.99, 0.95);
    store.record_run(&id("a"), true, None, None);
    store.save().unwrap();

    // Mutations after the last save are lost on crash — simulate the
    // crash by dropping the store without saving.
    store.record_run(&id("a"), false, None, None);
    store.record_run(&id("b"), true, None, None);
    drop(store);

    let reloaded = EvidenceStore::load(&path, 0.99, 0.95);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get_history(&id("a")).len(), 1);
    assert!(reloaded.get_history(&id("a"))[0].passed);
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.json");

    let mut store = EvidenceStore::load(&path, 0.99, 0.95);
    store.record_run(&id("a"), true, None, None);
    store.save().unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    assert!(path.exists());
}

#[test]
fn corrupt_file_recovers_to_empty_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.json");
    std::fs::write(&path, b"{ this is not json").unwrap();

    let store = EvidenceStore::load(&path, 0.99, 0.95);
    assert!(store.is_empty());
}

#[test]
fn legacy_document_loads_and_sheds_legacy_scalars_on_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.json");
    std::fs::write(
        &path,
        r#"{ "tests": { "old": { "state": "stable", "runs": 12, "passes": 12 } } }"#,
    )
    .unwrap();

    let store = EvidenceStore::load(&path, 0.99, 0.95);
    assert_eq!(store.get_state(&id("old")), Some(Lifecycle::Stable));
    assert!(store.get_history(&id("old")).is_empty());

    store.save().unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("\"runs\""));
    assert!(!raw.contains("\"passes\""));
}

// ─── Seeded entries ────────────────────────────────────────────────────────

#[test]
fn seeded_entry_counts_feed_state_summaries() {
    let (_dir, mut store) = temp_store();

    let mut entry = TestEntry::with_state(Lifecycle::BurningIn);
    entry.history = vec![
        HistoryEntry {
            passed: true,
            commit: None,
            target_hash: Some("H".into()),
        };
        10
    ];
    store.insert_entry(id("seeded"), entry);
    store.set_state(&id("other"), Lifecycle::BurningIn, false);

    let counts = store.state_counts();
    assert_eq!(counts.get(&Lifecycle::BurningIn), Some(&2));
}
