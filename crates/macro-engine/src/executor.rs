//! Runs action lists against the injector.
//!
//! Execution is best effort: a failed injection is logged and the sequence
//! continues. Every press is recorded in a per-run [`DownTracker`] (and in the
//! shared [`PressLedger`]) so the run can release whatever it left held.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use config::{ActionKind, ActionOp};
use parking_lot::Mutex;
use tokio::time;
use tracing::{debug, trace};

use crate::inject::{InputTarget, Injector};

/// Inputs pressed by one run and not yet released.
#[derive(Debug, Default)]
pub struct DownTracker {
    down: BTreeSet<InputTarget>,
}

impl DownTracker {
    /// Returns true if this run pressed `target` and has not released it.
    pub fn is_down(&self, target: &InputTarget) -> bool {
        self.down.contains(target)
    }

    /// Returns true if nothing is held by this run.
    pub fn is_empty(&self) -> bool {
        self.down.is_empty()
    }
}

/// Counts of what a run did, for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Injections that succeeded.
    pub injected: usize,
    /// Presses skipped because the input was already held by this run.
    pub skipped: usize,
    /// Injections that failed.
    pub failed: usize,
}

impl Outcome {
    fn absorb(&mut self, other: Self) {
        self.injected += other.injected;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// `base + jitter * draw` for `draw` in `[0, 1)`, saturating at `Duration::MAX`.
fn jittered(base: Duration, jitter: Duration, draw: f64) -> Duration {
    let extra = Duration::try_from_secs_f64(jitter.as_secs_f64() * draw).unwrap_or(jitter);
    base.saturating_add(extra)
}

/// Process-wide count of presses across all live runs.
///
/// Mirrors the union of every [`DownTracker`]; whatever is left after all
/// units of work have finished is released at shutdown.
#[derive(Debug, Default)]
pub(crate) struct PressLedger {
    held: Mutex<HashMap<InputTarget, usize>>,
}

impl PressLedger {
    fn mark_down(&self, target: &InputTarget) {
        *self.held.lock().entry(target.clone()).or_default() += 1;
    }

    fn mark_up(&self, target: &InputTarget) {
        let mut held = self.held.lock();
        if let Some(n) = held.get_mut(target) {
            *n -= 1;
            if *n == 0 {
                held.remove(target);
            }
        }
    }

    fn drain(&self) -> Vec<InputTarget> {
        let mut held = self.held.lock();
        let mut out: Vec<InputTarget> = held.drain().map(|(t, _)| t).collect();
        out.sort();
        out
    }
}

/// Executes action lists in order on the calling unit of work.
#[derive(Clone)]
pub struct Executor {
    injector: Arc<dyn Injector>,
    ledger: Arc<PressLedger>,
}

impl Executor {
    /// Executor sending through `injector`, with an empty press ledger.
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        Self {
            injector,
            ledger: Arc::new(PressLedger::default()),
        }
    }

    /// Run `actions` once, then release everything the run left held.
    pub async fn run(&self, actions: &[ActionKind], tracker: &mut DownTracker) -> Outcome {
        let mut outcome = self.run_pass(actions, tracker).await;
        outcome.absorb(self.release_all(tracker));
        outcome
    }

    /// Run `actions` once without the cleanup pass. Loops call this repeatedly.
    pub async fn run_pass(&self, actions: &[ActionKind], tracker: &mut DownTracker) -> Outcome {
        let mut outcome = Outcome::default();
        for action in actions {
            trace!(?action, "execute_action");
            match action {
                ActionKind::Key { key, op } => {
                    self.apply(InputTarget::Key(key.clone()), *op, tracker, &mut outcome)
                }
                ActionKind::Mouse { button, op } => {
                    self.apply(InputTarget::Mouse(*button), *op, tracker, &mut outcome)
                }
                ActionKind::Delay { base, jitter } => {
                    time::sleep(jittered(*base, *jitter, rand::random::<f64>())).await;
                }
            }
        }
        outcome
    }

    /// Release every input still marked down in `tracker`.
    pub fn release_all(&self, tracker: &mut DownTracker) -> Outcome {
        let mut outcome = Outcome::default();
        for target in std::mem::take(&mut tracker.down) {
            self.send(&target, ActionOp::Release, &mut outcome);
            self.ledger.mark_up(&target);
        }
        outcome
    }

    /// Release inputs that no run released itself. Returns what was released.
    pub(crate) fn release_residual(&self) -> Vec<InputTarget> {
        let residual = self.ledger.drain();
        let mut outcome = Outcome::default();
        for target in &residual {
            debug!(input = %target, "release_residual");
            self.send(target, ActionOp::Release, &mut outcome);
        }
        residual
    }

    fn apply(
        &self,
        target: InputTarget,
        op: ActionOp,
        tracker: &mut DownTracker,
        outcome: &mut Outcome,
    ) {
        match op {
            ActionOp::Press => {
                if tracker.down.contains(&target) {
                    debug!(input = %target, "press_skipped_already_down");
                    outcome.skipped += 1;
                    return;
                }
                self.send(&target, ActionOp::Press, outcome);
                self.ledger.mark_down(&target);
                tracker.down.insert(target);
            }
            ActionOp::Release => {
                self.send(&target, ActionOp::Release, outcome);
                if tracker.down.remove(&target) {
                    self.ledger.mark_up(&target);
                }
            }
            ActionOp::Click => self.send(&target, ActionOp::Click, outcome),
        }
    }

    fn send(&self, target: &InputTarget, op: ActionOp, outcome: &mut Outcome) {
        match self.injector.inject(target, op) {
            Ok(()) => outcome.injected += 1,
            Err(e) => {
                debug!(input = %target, op = op.as_str(), error = %e, "inject_failed");
                outcome.failed += 1;
            }
        }
    }
}
