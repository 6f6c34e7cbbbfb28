//! Lifecycle engine: SPRT-driven transitions, manifest sync, deadlines.

use std::time::Duration;

use tempfile::TempDir;

use gauntlet_core::manifest::{Manifest, ManifestTest, TestSet};
use gauntlet_core::types::events::EventKind;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{Lifecycle, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_engine::{LifecycleEngine, TestDag};
use gauntlet_store::{EvidenceStore, HistoryEntry, TestEntry};

fn id(s: &str) -> TestId {
    TestId::new(s)
}

fn temp_store() -> (TempDir, EvidenceStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status.json");
    (dir, EvidenceStore::load(&path, 0.99, 0.95))
}

fn result(name: &str, status: Status) -> TestResult {
    TestResult {
        id: id(name),
        status,
        duration: Duration::from_millis(5),
        stdout: Vec::new(),
        stderr: Vec::new(),
        exit_code: Some(if status == Status::Passed { 0 } else { 1 }),
        started_at: "2026-08-01T00:00:00+00:00".to_string(),
        finished_at: "2026-08-01T00:00:01+00:00".to_string(),
    }
}

fn entry_with_history(state: Lifecycle, outcomes: &[bool]) -> TestEntry {
    let mut entry = TestEntry::with_state(state);
    entry.history = outcomes
        .iter()
        .map(|&passed| HistoryEntry {
            passed,
            commit: None,
            target_hash: None,
        })
        .collect();
    entry
}

fn manifest_of(tests: &[(&str, bool)]) -> Manifest {
    let mut m = Manifest {
        test_set: TestSet {
            name: "suite".to_string(),
            assertion: "suite".to_string(),
            tests: tests.iter().map(|(n, _)| id(n)).collect(),
            subsets: Vec::new(),
        },
        ..Manifest::default()
    };
    for (name, disabled) in tests {
        m.test_set_tests.insert(
            id(name),
            ManifestTest {
                assertion: format!("{name} works"),
                executable: format!("/bin/{name}"),
                depends_on: Vec::new(),
                disabled: *disabled,
                requirement_id: None,
                parameters: Default::default(),
            },
        );
    }
    m
}

// ─── process_results ───────────────────────────────────────────────────────

#[test]
fn burning_in_promotes_once_evidence_accepts() {
    let (_dir, mut store) = temp_store();
    // 27 prior passes: one more pass crosses the acceptance threshold.
    store.insert_entry(id("t"), entry_with_history(Lifecycle::BurningIn, &[true; 27]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Passed)], None, None);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::BurnInAccepted);
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Stable));
}

#[test]
fn burning_in_rejects_on_repeated_failures() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("t"), entry_with_history(Lifecycle::BurningIn, &[false]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Failed)], None, None);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::BurnInRejected);
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Flaky));
}

#[test]
fn burning_in_continues_without_enough_evidence() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("t"), entry_with_history(Lifecycle::BurningIn, &[true; 5]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Passed)], None, None);

    assert!(events.is_empty());
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::BurningIn));
}

#[test]
fn stable_failure_with_bad_history_demotes() {
    let (_dir, mut store) = temp_store();
    // Recent history is rotten: demotion evaluation rejects quickly.
    store.insert_entry(
        id("t"),
        entry_with_history(Lifecycle::Stable, &[false, false, false]),
    );

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Failed)], None, None);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Demoted);
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Flaky));
}

#[test]
fn stable_failure_with_thin_history_returns_to_burn_in() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("t"), entry_with_history(Lifecycle::Stable, &[true, true]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Failed)], None, None);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::DemotionInconclusive);
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::BurningIn));
    // History is preserved through the suspicious transition.
    assert_eq!(store.get_history(&id("t")).len(), 3);
}

#[test]
fn stable_failure_with_long_clean_history_is_retained() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("t"), entry_with_history(Lifecycle::Stable, &[true; 60]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Failed)], None, None);

    assert!(events.is_empty());
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Stable));
}

#[test]
fn gated_results_carry_no_evidence() {
    let (_dir, mut store) = temp_store();
    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(
        &[result("t", Status::DependenciesFailed)],
        None,
        None,
    );

    assert!(events.is_empty());
    assert!(store.get_history(&id("t")).is_empty());
    assert_eq!(store.get_state(&id("t")), None);
}

#[test]
fn flaky_tests_record_runs_without_sprt() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("t"), entry_with_history(Lifecycle::Flaky, &[false; 10]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Passed)], Some("c1"), None);

    assert!(events.is_empty());
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Flaky));
    assert_eq!(store.get_history(&id("t")).len(), 11);
}

#[test]
fn same_hash_history_drives_burn_in_when_hashes_present() {
    let (_dir, mut store) = temp_store();
    // 27 passes at H1, plus stale failures at H0 that must not count.
    let mut entry = entry_with_history(Lifecycle::BurningIn, &[]);
    for _ in 0..27 {
        entry.history.push(HistoryEntry {
            passed: true,
            commit: None,
            target_hash: Some("H1".to_string()),
        });
    }
    for _ in 0..5 {
        entry.history.push(HistoryEntry {
            passed: false,
            commit: None,
            target_hash: Some("H0".to_string()),
        });
    }
    store.insert_entry(id("t"), entry);

    let mut hashes = gauntlet_core::types::collections::FxHashMap::default();
    hashes.insert(id("t"), "H1".to_string());

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.process_results(&[result("t", Status::Passed)], None, Some(&hashes));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::BurnInAccepted);
    assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Stable));
}

// ─── sync_disabled ─────────────────────────────────────────────────────────

#[test]
fn sync_disables_and_reenables_with_the_manifest() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("off"), entry_with_history(Lifecycle::Stable, &[true; 10]));
    store.insert_entry(id("back"), entry_with_history(Lifecycle::Disabled, &[]));

    let manifest = manifest_of(&[("off", true), ("back", false)]);
    let dag = TestDag::build(&manifest).unwrap();

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.sync_disabled(&dag);

    assert_eq!(events.len(), 2);
    assert_eq!(engine.store().get_state(&id("off")), Some(Lifecycle::Disabled));
    assert!(engine.store().get_history(&id("off")).is_empty());
    assert_eq!(engine.store().get_state(&id("back")), Some(Lifecycle::New));

    // Idempotent for an unchanging manifest.
    let again = engine.sync_disabled(&dag);
    assert!(again.is_empty());
}

// ─── check_deadlines ───────────────────────────────────────────────────────

#[test]
fn overdue_flaky_tests_are_disabled() {
    let (_dir, mut store) = temp_store();
    let mut entry = entry_with_history(Lifecycle::Flaky, &[false; 5]);
    entry.last_updated = "2026-01-01T00:00:00+00:00".to_string();
    store.insert_entry(id("old"), entry);

    let mut fresh = entry_with_history(Lifecycle::Flaky, &[false; 5]);
    fresh.last_updated = gauntlet_core::types::timestamp::now_rfc3339();
    store.insert_entry(id("fresh"), fresh);

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    let events = engine.check_deadlines(14.0);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::DeadlineDisabled);
    assert_eq!(store.get_state(&id("old")), Some(Lifecycle::Disabled));
    assert_eq!(store.get_state(&id("fresh")), Some(Lifecycle::Flaky));
}

#[test]
fn negative_deadline_disables_the_check() {
    let (_dir, mut store) = temp_store();
    let mut entry = entry_with_history(Lifecycle::Flaky, &[false; 5]);
    entry.last_updated = "2020-01-01T00:00:00+00:00".to_string();
    store.insert_entry(id("ancient"), entry);

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    assert!(engine.check_deadlines(-1.0).is_empty());
    assert_eq!(store.get_state(&id("ancient")), Some(Lifecycle::Flaky));
}

#[test]
fn deadline_check_without_flaky_tests_is_a_no_op() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("ok"), entry_with_history(Lifecycle::Stable, &[true; 5]));

    let mut engine = LifecycleEngine::new(&mut store, 0.10);
    assert!(engine.check_deadlines(0.5).is_empty());
}

// ─── handle_stable_failure ─────────────────────────────────────────────────

#[cfg(unix)]
mod stable_failure_reruns {
    use super::*;

    use gauntlet_core::types::status::ExecutionMode;
    use gauntlet_engine::exec::{ExecConfig, Executor};
    use gauntlet_engine::stats::sprt::DemotionDecision;

    #[test]
    fn reruns_accumulate_until_the_demotion_verdict() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("fail.sh");
        std::fs::write(&exe, "#!/bin/sh\nexit 1\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path = dir.path().join("status.json");
        let mut store = EvidenceStore::load(&path, 0.99, 0.95);
        // One session failure on the books; not yet conclusive.
        store.insert_entry(id("t"), entry_with_history(Lifecycle::Stable, &[false]));

        let mut m = manifest_of(&[("t", false)]);
        m.test_set_tests.get_mut(&id("t")).unwrap().executable = exe.display().to_string();
        let dag = TestDag::build(&m).unwrap();
        let node = dag.node(&id("t")).unwrap();

        let executor = Executor::new(ExecConfig::new(ExecutionMode::Diagnostic));
        let mut engine = LifecycleEngine::new(&mut store, 0.10);
        let (decision, events) =
            engine.handle_stable_failure(node, &executor, 5, Some("c1"), None);

        // The rerun fails too: two failures reject, demoting the test.
        assert_eq!(decision, DemotionDecision::Demote);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Demoted);
        assert_eq!(store.get_state(&id("t")), Some(Lifecycle::Flaky));
        assert_eq!(store.get_history(&id("t")).len(), 2);
    }
}

// ─── filter_by_state ───────────────────────────────────────────────────────

#[test]
fn filter_treats_absent_tests_as_stable() {
    let (_dir, mut store) = temp_store();
    store.insert_entry(id("a"), entry_with_history(Lifecycle::Flaky, &[]));

    let manifest = manifest_of(&[("a", false), ("b", false)]);
    let dag = TestDag::build(&manifest).unwrap();

    let engine = LifecycleEngine::new(&mut store, 0.10);
    let stable = engine.filter_by_state(&dag, &[Lifecycle::Stable]);
    assert_eq!(stable, vec![id("b")]);

    let flaky = engine.filter_by_state(&dag, &[Lifecycle::Flaky]);
    assert_eq!(flaky, vec![id("a")]);
}
