//! Sliding-window parallel runner.
//!
//! A bounded window of worker threads executes tests as slots free up;
//! completions come back over a channel in completion order.
//!
//! Dependency semantics (diagnostic mode) are race-aware. A test becomes
//! dispatchable once every direct dependency is complete or already
//! running; an ancestor that failed before dispatch gates the test as
//! `DependenciesFailed` without executing it. When an ancestor fails
//! *after* a dependent started, the dependent still reports its observed
//! outcome, combined into `PassedWithDepsFailed` / `FailedWithDepsFailed`
//! by comparing the ancestor's failure instant with the dependent's start
//! instant. Detection mode ignores dependencies entirely and dispatches
//! in traversal order.

use std::time::Instant;

use crossbeam_channel::unbounded;
use tracing::{debug, info};

use gauntlet_core::errors::ExecError;
use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{ExecutionMode, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_core::types::timestamp;

use crate::dag::TestDag;

use super::{subprocess, ExecConfig};

struct Completion {
    id: TestId,
    result: TestResult,
}

/// Execute the graph under a bounded window of worker threads.
pub fn run(dag: &TestDag, config: &ExecConfig) -> Result<Vec<TestResult>, ExecError> {
    let order = match config.mode {
        ExecutionMode::Diagnostic => dag.topo_leaves_first(),
        ExecutionMode::Detection => dag.bfs_roots_first(),
    };
    info!(
        mode = config.mode.as_str(),
        tests = order.len(),
        window = config.max_parallel,
        "parallel execution"
    );

    let (tx, rx) = unbounded::<Completion>();

    let mut pending: Vec<TestId> = order;
    let mut statuses: FxHashMap<TestId, Status> = FxHashMap::default();
    let mut failure_times: FxHashMap<TestId, Instant> = FxHashMap::default();
    let mut start_instants: FxHashMap<TestId, Instant> = FxHashMap::default();
    let mut results: Vec<TestResult> = Vec::new();
    let mut in_flight = 0usize;
    let mut failures = 0u32;

    loop {
        let stopped =
            config.cancellation.is_cancelled() || config.failure_budget_reached(failures);

        if stopped {
            // Unstarted tests are omitted from the results entirely.
            if !pending.is_empty() {
                debug!(omitted = pending.len(), "cancellation: dropping unstarted tests");
                pending.clear();
            }
        } else {
            dispatch_ready(
                dag,
                config,
                &tx,
                &mut pending,
                &mut statuses,
                &mut start_instants,
                &mut results,
                &mut in_flight,
            );
        }

        if in_flight == 0 {
            break;
        }

        let completion = rx.recv().map_err(|_| ExecError::ChannelDisconnected {
            context: "worker completion queue".to_string(),
        })?;
        in_flight -= 1;

        let result = completion.result;
        if result.status == Status::Failed {
            failures += 1;
            failure_times.insert(result.id.clone(), Instant::now());
        }
        statuses.insert(result.id.clone(), result.status);
        results.push(result);
    }

    // Race accounting: a dependency that failed at or after a dependent's
    // start taints the dependent's observed outcome. Never silently
    // folded into plain passed/failed.
    if config.mode == ExecutionMode::Diagnostic {
        for result in &mut results {
            if !matches!(result.status, Status::Passed | Status::Failed) {
                continue;
            }
            let Some(&started) = start_instants.get(&result.id) else {
                continue;
            };
            let dep_failed_mid_run = dag.ancestors(&result.id).iter().any(|a| {
                failure_times
                    .get(a)
                    .is_some_and(|failed_at| *failed_at >= started)
            });
            if dep_failed_mid_run {
                result.status = match result.status {
                    Status::Passed => Status::PassedWithDepsFailed,
                    Status::Failed => Status::FailedWithDepsFailed,
                    other => other,
                };
                debug!(test = %result.id, status = result.status.as_str(), "dependency failed mid-run");
            }
        }
    }

    Ok(results)
}

/// Scan pending tests in stable order: gate the doomed, dispatch the
/// dispatchable, stop filling once the window is full.
#[allow(clippy::too_many_arguments)]
fn dispatch_ready(
    dag: &TestDag,
    config: &ExecConfig,
    tx: &crossbeam_channel::Sender<Completion>,
    pending: &mut Vec<TestId>,
    statuses: &mut FxHashMap<TestId, Status>,
    start_instants: &mut FxHashMap<TestId, Instant>,
    results: &mut Vec<TestResult>,
    in_flight: &mut usize,
) {
    let mut i = 0;
    while i < pending.len() {
        let id = pending[i].clone();
        let Some(node) = dag.node(&id) else {
            pending.remove(i);
            continue;
        };

        if config.mode == ExecutionMode::Diagnostic {
            // An ancestor that already failed dooms this test before it
            // ever starts. Transitive check: a direct dependency may still
            // be running while a deeper ancestor has already failed.
            let doomed = dag
                .ancestors(&id)
                .iter()
                .any(|a| statuses.get(a).is_some_and(|s| s.is_failure()));
            if doomed {
                let result =
                    TestResult::dependencies_failed(id.clone(), timestamp::now_rfc3339());
                statuses.insert(id, result.status);
                results.push(result);
                pending.remove(i);
                continue;
            }

            // Dispatchable once every dependency is complete or running.
            let deps_underway = node.depends_on.iter().all(|d| {
                statuses.contains_key(d) || start_instants.contains_key(d) || !dag.contains(d)
            });
            if !deps_underway {
                i += 1;
                continue;
            }
        }

        if *in_flight >= config.max_parallel {
            break;
        }

        let executable = node.executable.clone();
        let timeout = config.timeout;
        let worker_id = id.clone();
        let worker_tx = tx.clone();
        start_instants.insert(id.clone(), Instant::now());
        std::thread::Builder::new()
            .name("gauntlet-exec-worker".to_string())
            .spawn(move || {
                let result = subprocess::run_test(&worker_id, &executable, timeout);
                // Receiver gone means the run was torn down; nothing to do.
                let _ = worker_tx.send(Completion {
                    id: worker_id,
                    result,
                });
            })
            .expect("failed to spawn executor worker thread");
        *in_flight += 1;
        pending.remove(i);
    }
}
