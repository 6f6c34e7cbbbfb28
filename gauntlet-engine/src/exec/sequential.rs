//! Sequential runner: one test at a time in traversal order.

use tracing::{debug, info};

use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{ExecutionMode, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_core::types::timestamp;

use crate::dag::TestDag;

use super::{subprocess, ExecConfig};

/// Walk the traversal order, gating on dependency failures in diagnostic
/// mode and stopping early on max_failures or cancellation. Results come
/// back in traversal order; tests never dispatched are omitted.
pub fn run(dag: &TestDag, config: &ExecConfig) -> Vec<TestResult> {
    let order = match config.mode {
        ExecutionMode::Diagnostic => dag.topo_leaves_first(),
        ExecutionMode::Detection => dag.bfs_roots_first(),
    };
    info!(
        mode = config.mode.as_str(),
        tests = order.len(),
        "sequential execution"
    );

    let mut statuses: FxHashMap<TestId, Status> = FxHashMap::default();
    let mut results = Vec::with_capacity(order.len());
    let mut failures = 0u32;

    for id in order {
        if config.cancellation.is_cancelled() || config.failure_budget_reached(failures) {
            debug!(remaining = %id, "stopping dispatch");
            break;
        }

        if config.mode == ExecutionMode::Diagnostic {
            let gated = dag
                .node(&id)
                .map(|n| {
                    n.depends_on
                        .iter()
                        .any(|d| statuses.get(d).is_some_and(|s| s.is_failure()))
                })
                .unwrap_or(false);
            if gated {
                let result = TestResult::dependencies_failed(id.clone(), timestamp::now_rfc3339());
                statuses.insert(id, result.status);
                results.push(result);
                continue;
            }
        }

        let Some(node) = dag.node(&id) else { continue };
        let result = subprocess::run_test(&node.id, &node.executable, config.timeout);
        if result.status == Status::Failed {
            failures += 1;
        }
        statuses.insert(id, result.status);
        results.push(result);
    }

    results
}
