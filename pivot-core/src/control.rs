//! Cooperative pause/resume/cancel control and progress reporting.
//!
//! A solve runs synchronously on the calling thread. A controller thread
//! holding a clone of [`SolveControl`] can pause, resume or cancel it; the
//! engine polls [`SolveControl::checkpoint`] between pivots and at every
//! branch-and-bound recursion entry. Pausing blocks the solving thread on a
//! condvar until resumed; cancellation makes the solve unwind with
//! [`SolveStatus::Canceled`], keeping any incumbent found so far.

use std::sync::{Arc, Condvar, Mutex};

use crate::status::SolveStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlState {
    Running,
    Paused,
    Canceled,
}

/// Shared handle for pausing, resuming and canceling a running solve.
#[derive(Clone)]
pub struct SolveControl {
    inner: Arc<(Mutex<ControlState>, Condvar)>,
}

impl Default for SolveControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SolveControl {
    /// Create a control handle in the running state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(ControlState::Running), Condvar::new())),
        }
    }

    /// Request that the solve block at its next checkpoint.
    pub fn pause(&self) {
        let (lock, _) = &*self.inner;
        let mut state = lock.lock().unwrap();
        if *state == ControlState::Running {
            *state = ControlState::Paused;
        }
    }

    /// Release a paused solve.
    pub fn resume(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        if *state == ControlState::Paused {
            *state = ControlState::Running;
        }
        cvar.notify_all();
    }

    /// Abort the solve at its next checkpoint. Irreversible.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = ControlState::Canceled;
        cvar.notify_all();
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap() == ControlState::Canceled
    }

    /// Poll point for the engine. Returns `false` when the solve must abort;
    /// blocks while paused.
    pub fn checkpoint(&self) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        while *state == ControlState::Paused {
            state = cvar.wait(state).unwrap();
        }
        *state != ControlState::Canceled
    }
}

/// Receiver for solver progress: informational lines, the monotone pivot
/// counter, and the single terminal status per solve.
pub trait Progress {
    /// An informational text line.
    fn message(&mut self, _line: &str) {}

    /// Monotonically increasing pivot/iteration counter.
    fn iteration(&mut self, _iter: u64) {}

    /// The terminal status, reported exactly once per solve.
    fn finished(&mut self, _status: SolveStatus) {}
}

/// No-op progress sink.
impl Progress for () {}

/// Progress sink that forwards to the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn message(&mut self, line: &str) {
        log::info!("{}", line);
    }

    fn iteration(&mut self, iter: u64) {
        log::debug!("iteration {}", iter);
    }

    fn finished(&mut self, status: SolveStatus) {
        log::info!("solve finished: {}", status);
    }
}
