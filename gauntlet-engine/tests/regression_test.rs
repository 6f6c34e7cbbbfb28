//! Co-occurrence regression selection: scoring, mapping, closure,
//! fallback.

use time::Duration;
use time::OffsetDateTime;

use gauntlet_core::config::RegressionConfig;
use gauntlet_core::manifest::{Manifest, ManifestTest, TestSet};
use gauntlet_core::traits::{CoOccurrenceProvider, CommitInfo};
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::timestamp;
use gauntlet_engine::regression::RegressionSelector;
use gauntlet_engine::TestDag;

fn id(s: &str) -> TestId {
    TestId::new(s)
}

fn days_ago(days: i64) -> String {
    timestamp::format_rfc3339(OffsetDateTime::now_utc() - Duration::days(days))
}

struct FakeHistory {
    commits: Vec<CommitInfo>,
}

impl CoOccurrenceProvider for FakeHistory {
    fn commits_touching(&self, file: &str) -> Vec<CommitInfo> {
        self.commits
            .iter()
            .filter(|c| c.files.iter().any(|f| f == file))
            .cloned()
            .collect()
    }
}

fn manifest(tests: &[(&str, &str, &[&str])]) -> Manifest {
    let mut m = Manifest {
        test_set: TestSet {
            name: "suite".to_string(),
            assertion: "suite".to_string(),
            tests: tests.iter().map(|(n, _, _)| id(n)).collect(),
            subsets: Vec::new(),
        },
        ..Manifest::default()
    };
    for (name, exe, deps) in tests {
        m.test_set_tests.insert(
            id(name),
            ManifestTest {
                assertion: format!("{name} works"),
                executable: exe.to_string(),
                depends_on: deps.iter().map(|d| id(d)).collect(),
                disabled: false,
                requirement_id: None,
                parameters: Default::default(),
            },
        );
    }
    m
}

fn permissive_config() -> RegressionConfig {
    RegressionConfig {
        max_test_percentage: Some(1.0),
        min_tests: Some(1),
        ..RegressionConfig::default()
    }
}

// ─── Scoring and mapping ───────────────────────────────────────────────────

#[test]
fn co_changed_test_is_selected_via_executable_basename() {
    let m = manifest(&[
        ("widget_test", "/build/bin/widget_test", &[]),
        ("other_test", "/build/bin/other_test", &[]),
    ]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![CommitInfo {
            sha: "abc".to_string(),
            date: days_ago(3),
            files: vec!["src/widget.c".to_string(), "tests/widget_test".to_string()],
        }],
    };
    let config = permissive_config();
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("widget_test"), id("other_test")];
    let outcome = selector.select(&["src/widget.c".to_string()], &stable);

    assert!(!outcome.fallback_used);
    assert_eq!(outcome.selected, vec![id("widget_test")]);
}

#[test]
fn basename_convention_maps_source_test_files() {
    let m = manifest(&[("widget_test", "/build/bin/wt-binary", &[])]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![CommitInfo {
            sha: "abc".to_string(),
            date: days_ago(1),
            files: vec![
                "src/widget.c".to_string(),
                "tests/widget_test.py".to_string(),
            ],
        }],
    };
    let config = permissive_config();
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("widget_test")];
    let outcome = selector.select(&["src/widget.c".to_string()], &stable);

    assert_eq!(outcome.selected, vec![id("widget_test")]);
}

#[test]
fn recent_co_changes_outrank_ancient_ones() {
    let m = manifest(&[
        ("recent_test", "/bin/recent_test", &[]),
        ("ancient_test", "/bin/ancient_test", &[]),
    ]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![
            CommitInfo {
                sha: "new".to_string(),
                date: days_ago(2),
                files: vec!["src/core.c".to_string(), "recent_test".to_string()],
            },
            CommitInfo {
                sha: "old".to_string(),
                // Two half-lives back: a quarter of the weight.
                date: days_ago(360),
                files: vec!["src/core.c".to_string(), "ancient_test".to_string()],
            },
        ],
    };
    let config = permissive_config();
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("recent_test"), id("ancient_test")];
    let outcome = selector.select(&["src/core.c".to_string()], &stable);

    assert_eq!(outcome.selected[0], id("recent_test"));
}

#[test]
fn frontier_expands_across_hops_with_decay() {
    // a.c co-changes with b.c; b.c co-changes with the test file. The
    // test is only reachable at hop 1.
    let m = manifest(&[("far_test", "/bin/far_test", &[])]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![
            CommitInfo {
                sha: "c1".to_string(),
                date: days_ago(1),
                files: vec!["src/a.c".to_string(), "src/b.c".to_string()],
            },
            CommitInfo {
                sha: "c2".to_string(),
                date: days_ago(1),
                files: vec!["src/b.c".to_string(), "far_test".to_string()],
            },
        ],
    };
    let config = permissive_config();
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("far_test")];
    let outcome = selector.select(&["src/a.c".to_string()], &stable);
    assert_eq!(outcome.selected, vec![id("far_test")]);

    // With expansion disabled the test is unreachable and the selector
    // falls back.
    let mut no_hops = permissive_config();
    no_hops.max_hops = Some(0);
    let selector = RegressionSelector::new(&dag, &history, &no_hops);
    let outcome = selector.select(&["src/a.c".to_string()], &stable);
    assert!(outcome.fallback_used);
}

#[test]
fn non_source_changed_files_are_ignored() {
    let m = manifest(&[("t", "/bin/t", &[])]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![CommitInfo {
            sha: "c1".to_string(),
            date: days_ago(1),
            files: vec!["README.md".to_string(), "t".to_string()],
        }],
    };
    let config = permissive_config();
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("t")];
    let outcome = selector.select(&["README.md".to_string()], &stable);
    // The markdown change seeds no frontier; fallback kicks in.
    assert!(outcome.fallback_used);
    assert_eq!(outcome.selected, vec![id("t")]);
}

// ─── Closure and fallback ──────────────────────────────────────────────────

#[test]
fn selection_pulls_in_dependency_closure() {
    let m = manifest(&[
        ("base", "/bin/base", &[]),
        ("mid", "/bin/mid", &["base"]),
        ("top_test", "/bin/top_test", &["mid"]),
    ]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![CommitInfo {
            sha: "c1".to_string(),
            date: days_ago(1),
            files: vec!["src/top.c".to_string(), "top_test".to_string()],
        }],
    };
    let config = permissive_config();
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("base"), id("mid"), id("top_test")];
    let outcome = selector.select(&["src/top.c".to_string()], &stable);

    assert_eq!(outcome.selected.len(), 3);
    assert_eq!(outcome.selected[0], id("top_test"));
    assert!(outcome.selected.contains(&id("base")));
    assert!(outcome.selected.contains(&id("mid")));
}

#[test]
fn small_selection_falls_back_to_the_stable_suite() {
    let m = manifest(&[
        ("a", "/bin/a", &[]),
        ("b", "/bin/b", &[]),
        ("c", "/bin/c", &[]),
        ("d", "/bin/d", &[]),
    ]);
    let dag = TestDag::build(&m).unwrap();
    let history = FakeHistory {
        commits: vec![CommitInfo {
            sha: "c1".to_string(),
            date: days_ago(1),
            files: vec!["src/x.c".to_string(), "a".to_string()],
        }],
    };
    // Default min_tests = 3: one scored test is not enough.
    let config = RegressionConfig {
        max_test_percentage: Some(1.0),
        ..RegressionConfig::default()
    };
    let selector = RegressionSelector::new(&dag, &history, &config);

    let stable = vec![id("a"), id("b"), id("c"), id("d")];
    let outcome = selector.select(&["src/x.c".to_string()], &stable);

    assert!(outcome.fallback_used);
    assert_eq!(outcome.selected.len(), 4);
}
