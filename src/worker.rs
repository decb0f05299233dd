use std::{
    process::{Child, Command, Stdio},
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
    error::{GridcastError, GridcastResult},
    graph::PipelineGraph,
};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a stop finished: the worker exited within the bound, or it had to be
/// killed after ignoring the termination request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Exited,
    TimedOut,
}

struct WorkerHandle {
    child: Child,
    pid: u32,
}

enum WorkerState {
    Idle,
    Running(WorkerHandle),
}

/// Owner of the single external worker process.
///
/// `start`, `stop` and `replace` each execute their whole critical section
/// under one lock, so no two operations interleave and at most one worker
/// exists at any instant. Racing callers are ordered by lock acquisition.
pub struct WorkerManager {
    launcher: String,
    stop_timeout: Duration,
    state: Mutex<WorkerState>,
}

impl WorkerManager {
    pub fn new(launcher: impl Into<String>, stop_timeout: Duration) -> Self {
        Self {
            launcher: launcher.into(),
            stop_timeout,
            state: Mutex::new(WorkerState::Idle),
        }
    }

    /// Spawn a worker for `graph`. Fails with `AlreadyRunning` if one exists;
    /// the running worker is left untouched.
    pub fn start(&self, graph: PipelineGraph) -> GridcastResult<u32> {
        let mut state = self.state.lock();
        self.start_locked(&mut state, graph)
    }

    /// Tear the running worker down, waiting up to the configured bound for a
    /// graceful exit. The manager ends `Idle` no matter how the wait goes.
    pub fn stop(&self) -> GridcastResult<StopOutcome> {
        let mut state = self.state.lock();
        self.stop_locked(&mut state)
    }

    /// Stop whatever is running (tolerating idle) and start a worker for the
    /// new graph, as one critical section.
    pub fn replace(&self, graph: PipelineGraph) -> GridcastResult<u32> {
        let mut state = self.state.lock();
        match self.stop_locked(&mut state) {
            Ok(_) | Err(GridcastError::NotRunning) => {}
            Err(e) => return Err(e),
        }
        self.start_locked(&mut state, graph)
    }

    pub fn running_pid(&self) -> Option<u32> {
        match &*self.state.lock() {
            WorkerState::Idle => None,
            WorkerState::Running(handle) => Some(handle.pid),
        }
    }

    fn start_locked(&self, state: &mut WorkerState, graph: PipelineGraph) -> GridcastResult<u32> {
        if matches!(state, WorkerState::Running(_)) {
            return Err(GridcastError::AlreadyRunning);
        }

        // The description goes through as an argument vector, never a shell:
        // feed urls and names must not be interpretable.
        let child = Command::new(&self.launcher)
            .args(graph.launch_args())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| {
                GridcastError::spawn(format!("failed to launch '{}': {e}", self.launcher))
            })?;

        let pid = child.id();
        tracing::info!(pid, launcher = %self.launcher, "started pipeline worker");
        *state = WorkerState::Running(WorkerHandle { child, pid });
        Ok(pid)
    }

    fn stop_locked(&self, state: &mut WorkerState) -> GridcastResult<StopOutcome> {
        let WorkerState::Running(mut handle) = std::mem::replace(state, WorkerState::Idle) else {
            return Err(GridcastError::NotRunning);
        };

        // From here on the manager is Idle regardless of how the worker
        // responds.
        request_terminate(&mut handle.child);

        let deadline = Instant::now() + self.stop_timeout;
        loop {
            match handle.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!(pid = handle.pid, %status, "pipeline worker stopped");
                    return Ok(StopOutcome::Exited);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(pid = handle.pid, error = %e, "failed to poll pipeline worker");
                    return Ok(StopOutcome::Exited);
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }

        tracing::warn!(
            pid = handle.pid,
            timeout = ?self.stop_timeout,
            "pipeline worker ignored termination request, killing"
        );
        let _ = handle.child.kill();
        let _ = handle.child.wait();
        Ok(StopOutcome::TimedOut)
    }
}

// SIGTERM first so the worker can flush; SIGKILL only after the bounded wait.
#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        tracing::debug!(pid = child.id(), "worker gone before termination request");
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper(secs: &str) -> PipelineGraph {
        PipelineGraph::from_tokens(vec![secs.to_string()])
    }

    fn manager() -> WorkerManager {
        WorkerManager::new("sleep", DEFAULT_STOP_TIMEOUT)
    }

    #[test]
    fn start_then_stop_round_trip() {
        let mgr = manager();
        let pid = mgr.start(sleeper("30")).unwrap();
        assert_eq!(mgr.running_pid(), Some(pid));
        assert_eq!(mgr.stop().unwrap(), StopOutcome::Exited);
        assert_eq!(mgr.running_pid(), None);
    }

    #[test]
    fn second_start_reports_already_running_and_keeps_worker() {
        let mgr = manager();
        let pid = mgr.start(sleeper("30")).unwrap();
        let err = mgr.start(sleeper("30")).unwrap_err();
        assert!(matches!(err, GridcastError::AlreadyRunning));
        assert_eq!(mgr.running_pid(), Some(pid));
        mgr.stop().unwrap();
    }

    #[test]
    fn stop_twice_reports_not_running_and_stays_idle() {
        let mgr = manager();
        mgr.start(sleeper("30")).unwrap();
        assert!(mgr.stop().is_ok());
        assert!(matches!(mgr.stop().unwrap_err(), GridcastError::NotRunning));
        assert_eq!(mgr.running_pid(), None);
    }

    #[test]
    fn replace_swaps_the_worker() {
        let mgr = manager();
        let first = mgr.start(sleeper("30")).unwrap();
        let second = mgr.replace(sleeper("30")).unwrap();
        assert_ne!(first, second);
        assert_eq!(mgr.running_pid(), Some(second));
        mgr.stop().unwrap();
    }

    #[test]
    fn replace_starts_from_idle() {
        let mgr = manager();
        let pid = mgr.replace(sleeper("30")).unwrap();
        assert_eq!(mgr.running_pid(), Some(pid));
        mgr.stop().unwrap();
    }

    #[test]
    fn spawn_failure_leaves_manager_idle() {
        let mgr = WorkerManager::new("gridcast-no-such-launcher", DEFAULT_STOP_TIMEOUT);
        let err = mgr.start(sleeper("1")).unwrap_err();
        assert!(matches!(err, GridcastError::Spawn(_)));
        assert_eq!(mgr.running_pid(), None);
    }

    #[cfg(unix)]
    #[test]
    fn stop_kills_a_worker_that_ignores_termination() {
        let mgr = WorkerManager::new("sh", Duration::from_millis(200));
        let graph =
            PipelineGraph::from_tokens(vec!["-c".to_string(), "trap '' TERM; sleep 30".to_string()]);
        mgr.start(graph).unwrap();
        assert_eq!(mgr.stop().unwrap(), StopOutcome::TimedOut);
        assert_eq!(mgr.running_pid(), None);
    }
}
