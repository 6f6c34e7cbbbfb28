//! Subprocess discipline for a single test executable.
//!
//! Stdout and stderr are captured separately on reader threads so a full
//! pipe can never wedge the scheduler. The child is polled against a
//! deadline and killed on timeout; spawn failures and timeouts map to
//! `Failed` results with a descriptive stderr suffix, never to errors.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::Status;
use gauntlet_core::types::test_result::TestResult;
use gauntlet_core::types::timestamp;

/// Poll interval for `try_wait` while the child runs.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Run one test executable to completion or timeout.
pub fn run_test(id: &TestId, executable: &Path, timeout: Duration) -> TestResult {
    let started_at = timestamp::now_rfc3339();
    let start = Instant::now();

    let child = Command::new(executable)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!(test = %id, executable = %executable.display(), error = %e, "failed to spawn test");
            return TestResult {
                id: id.clone(),
                status: Status::Failed,
                duration: start.elapsed(),
                stdout: Vec::new(),
                stderr: format!("failed to spawn {}: {}", executable.display(), e).into_bytes(),
                exit_code: None,
                started_at: started_at.clone(),
                finished_at: timestamp::now_rfc3339(),
            };
        }
    };

    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let (exit_code, timed_out) = wait_with_deadline(&mut child, timeout);

    let stdout = join_pipe_reader(stdout_reader);
    let mut stderr = join_pipe_reader(stderr_reader);

    if timed_out {
        let note = format!(
            "\ntest timed out after {}s; process killed",
            timeout.as_secs()
        );
        stderr.extend_from_slice(note.as_bytes());
    }

    let status = match (exit_code, timed_out) {
        (Some(0), false) => Status::Passed,
        _ => Status::Failed,
    };
    debug!(test = %id, status = status.as_str(), "test finished");

    TestResult {
        id: id.clone(),
        status,
        duration: start.elapsed(),
        stdout,
        stderr,
        exit_code,
        started_at,
        finished_at: timestamp::now_rfc3339(),
    }
}

/// Drain a child pipe on its own thread; a blocked read never stalls the
/// caller.
fn spawn_pipe_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_pipe_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Poll the child until exit or deadline. On deadline, kill and reap.
/// Returns (exit_code, timed_out); a signal-killed child has no code.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> (Option<i32>, bool) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return (status.code(), false),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return (None, true);
                }
                thread::sleep(WAIT_POLL);
            }
            Err(e) => {
                warn!(error = %e, "try_wait failed; killing child");
                let _ = child.kill();
                let _ = child.wait();
                return (None, false);
            }
        }
    }
}
