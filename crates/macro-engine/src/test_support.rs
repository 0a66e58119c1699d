//! Test support utilities for macro-engine unit and integration tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They are intended for use by the test suite only.

use std::{collections::HashSet, time::Duration};

use config::{ActionOp, BindingTable};
use parking_lot::Mutex;
use tokio::time::{Instant, sleep};

use crate::inject::{InjectError, InputTarget, Injector};

/// Injector that records every successful event and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingInjector {
    events: Mutex<Vec<(InputTarget, ActionOp)>>,
    failing: Mutex<HashSet<InputTarget>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every injection for `target` fail with a backend error.
    pub fn fail_on(&self, target: InputTarget) {
        self.failing.lock().insert(target);
    }

    /// Snapshot of recorded events in injection order.
    pub fn events(&self) -> Vec<(InputTarget, ActionOp)> {
        self.events.lock().clone()
    }

    /// Number of recorded `op` events for `target`.
    pub fn count(&self, target: &InputTarget, op: ActionOp) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(t, o)| t == target && *o == op)
            .count()
    }

    /// Last recorded operation for `target`, if any.
    pub fn last_op(&self, target: &InputTarget) -> Option<ActionOp> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|(t, _)| t == target)
            .map(|(_, o)| *o)
    }
}

impl Injector for RecordingInjector {
    fn inject(&self, target: &InputTarget, op: ActionOp) -> Result<(), InjectError> {
        if self.failing.lock().contains(target) {
            return Err(InjectError::Backend(format!("refusing {}", target)));
        }
        self.events.lock().push((target.clone(), op));
        Ok(())
    }
}

/// Parse a binding table from JSON, panicking on error.
pub fn table(json: &str) -> BindingTable {
    match config::load_from_str(json, None) {
        Ok(t) => t,
        Err(e) => panic!("invalid test config: {}", e.pretty()),
    }
}

/// Poll `pred` every 2ms until it holds or `timeout_ms` elapses.
pub async fn wait_until<F>(timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(2)).await;
    }
}
