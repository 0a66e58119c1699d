//! Registry of running repeat loops.
//!
//! Holds at most one [`LoopHandle`] per trigger. Start and stop for the same
//! trigger are linearized by a single guard; the spawned unit of work is
//! created while the guard is held so an entry is never observable without
//! its task. Nothing awaits while the guard is held.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::atomic::{AtomicU64, Ordering},
};

use config::TriggerId;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// What a newly spawned loop unit receives: its stop flag, and the generation
/// that identifies its registry entry.
#[derive(Debug, Clone)]
pub(crate) struct LoopTicket {
    pub(crate) token: CancellationToken,
    pub(crate) generation: u64,
}

/// A running loop: its cancellation flag and its unit of work.
pub(crate) struct LoopHandle {
    token: CancellationToken,
    generation: u64,
    handle: JoinHandle<()>,
}

impl LoopHandle {
    /// Signal the loop to stop after its current pass.
    fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the loop's unit of work to exit.
    pub(crate) async fn join(self) {
        // Panics are reported by the lifecycle wrapper around the unit.
        self.handle.await.ok();
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopStart {
    Started,
    AlreadyRunning,
    /// The engine is paused or shutting down.
    Refused,
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopToggle {
    Started,
    Stopped,
    Refused,
}

/// `TriggerId -> LoopHandle`, at most one entry per trigger.
pub(crate) struct LoopRegistry {
    /// Parent of every loop token; cancelled on shutdown.
    root: CancellationToken,
    /// Source of entry generations; never reused.
    next_generation: AtomicU64,
    entries: Mutex<HashMap<TriggerId, LoopHandle>>,
}

impl LoopRegistry {
    pub(crate) fn new(root: CancellationToken) -> Self {
        Self {
            root,
            next_generation: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn ticket(&self) -> LoopTicket {
        LoopTicket {
            token: self.root.child_token(),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn spawn_entry<S>(&self, spawn: S) -> LoopHandle
    where
        S: FnOnce(LoopTicket) -> JoinHandle<()>,
    {
        let ticket = self.ticket();
        let handle = spawn(ticket.clone());
        LoopHandle {
            token: ticket.token,
            generation: ticket.generation,
            handle,
        }
    }

    /// Check-and-insert. `admit` is evaluated under the guard; `spawn` is only
    /// called when the trigger was idle and admitted.
    pub(crate) fn start<A, S>(&self, id: &TriggerId, admit: A, spawn: S) -> LoopStart
    where
        A: FnOnce() -> bool,
        S: FnOnce(LoopTicket) -> JoinHandle<()>,
    {
        let mut entries = self.entries.lock();
        match entries.entry(id.clone()) {
            Entry::Occupied(_) => {
                trace!("loop_start_ignored_running" = %id);
                LoopStart::AlreadyRunning
            }
            Entry::Vacant(slot) => {
                if !admit() {
                    return LoopStart::Refused;
                }
                slot.insert(self.spawn_entry(spawn));
                trace!("loop_registered" = %id);
                LoopStart::Started
            }
        }
    }

    /// Remove the entry for `id` and signal it. Does not wait.
    pub(crate) fn stop(&self, id: &TriggerId) -> Option<LoopHandle> {
        let removed = self.entries.lock().remove(id);
        if let Some(entry) = &removed {
            entry.cancel();
            trace!("loop_stop_signalled" = %id);
        }
        removed
    }

    /// Remove the entry for `id` only if it is still generation `generation`.
    ///
    /// Called by a loop unit as it exits, so an entry never outlives its task;
    /// a newer loop for the same trigger is left alone.
    pub(crate) fn remove_if(&self, id: &TriggerId, generation: u64) -> bool {
        let mut entries = self.entries.lock();
        match entries.entry(id.clone()) {
            Entry::Occupied(slot) if slot.get().generation == generation => {
                slot.remove().cancel();
                trace!("loop_entry_reaped" = %id, generation);
                true
            }
            _ => false,
        }
    }

    /// Start when idle, stop when running; one atomic step under the guard.
    pub(crate) fn toggle<A, S>(&self, id: &TriggerId, admit: A, spawn: S) -> LoopToggle
    where
        A: FnOnce() -> bool,
        S: FnOnce(LoopTicket) -> JoinHandle<()>,
    {
        let mut entries = self.entries.lock();
        match entries.entry(id.clone()) {
            Entry::Occupied(slot) => {
                slot.remove().cancel();
                trace!("loop_toggle_stop" = %id);
                LoopToggle::Stopped
            }
            Entry::Vacant(slot) => {
                if !admit() {
                    return LoopToggle::Refused;
                }
                slot.insert(self.spawn_entry(spawn));
                trace!("loop_toggle_start" = %id);
                LoopToggle::Started
            }
        }
    }

    /// Remove and signal every entry. Returns the handles so callers may join them.
    pub(crate) fn cancel_all(&self) -> Vec<(TriggerId, LoopHandle)> {
        let drained: Vec<(TriggerId, LoopHandle)> = self.entries.lock().drain().collect();
        for (id, entry) in &drained {
            entry.cancel();
            trace!("loop_cancelled" = %id);
        }
        drained
    }

    pub(crate) fn is_active(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Snapshot of triggers with a running loop, sorted.
    pub(crate) fn active(&self) -> Vec<TriggerId> {
        let mut ids: Vec<TriggerId> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;

    fn idle_loop(ticket: LoopTicket) -> JoinHandle<()> {
        tokio::spawn(async move { ticket.token.cancelled().await })
    }

    #[tokio::test]
    async fn second_start_is_ignored() {
        let reg = LoopRegistry::new(CancellationToken::new());
        let id = TriggerId::keyboard("a");
        assert_eq!(reg.start(&id, || true, idle_loop), LoopStart::Started);
        assert_eq!(reg.start(&id, || true, idle_loop), LoopStart::AlreadyRunning);
        assert_eq!(reg.len(), 1);
        let handle = reg.stop(&id).expect("entry");
        tokio::time::timeout(Duration::from_millis(500), handle.join())
            .await
            .expect("loop exits after stop");
        assert!(!reg.is_active("keyboard_a"));
        assert!(reg.stop(&id).is_none());
    }

    #[tokio::test]
    async fn refused_start_leaves_no_entry() {
        let reg = LoopRegistry::new(CancellationToken::new());
        let id = TriggerId::keyboard("a");
        let spawned = AtomicUsize::new(0);
        let res = reg.start(
            &id,
            || false,
            |t| {
                spawned.fetch_add(1, Ordering::SeqCst);
                idle_loop(t)
            },
        );
        assert_eq!(res, LoopStart::Refused);
        assert_eq!(spawned.load(Ordering::SeqCst), 0);
        assert_eq!(reg.len(), 0);
    }

    #[tokio::test]
    async fn toggle_alternates() {
        let reg = LoopRegistry::new(CancellationToken::new());
        let id = TriggerId::mouse("x1");
        assert_eq!(reg.toggle(&id, || true, idle_loop), LoopToggle::Started);
        assert_eq!(reg.toggle(&id, || true, idle_loop), LoopToggle::Stopped);
        assert_eq!(reg.toggle(&id, || false, idle_loop), LoopToggle::Refused);
        assert!(reg.active().is_empty());
    }

    #[tokio::test]
    async fn root_cancel_reaches_loops() {
        let root = CancellationToken::new();
        let reg = LoopRegistry::new(root.clone());
        let id = TriggerId::keyboard("z");
        let seen: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        reg.start(
            &id,
            || true,
            move |t| {
                *seen2.lock() = Some(t.token.clone());
                idle_loop(t)
            },
        );
        root.cancel();
        let token = seen.lock().clone().expect("token captured");
        assert!(token.is_cancelled());
        assert_eq!(reg.cancel_all().len(), 1);
    }

    #[tokio::test]
    async fn exiting_unit_only_reaps_its_own_entry() {
        let reg = LoopRegistry::new(CancellationToken::new());
        let id = TriggerId::keyboard("r");
        let first: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
        let f = first.clone();
        reg.start(
            &id,
            || true,
            move |t| {
                *f.lock() = Some(t.generation);
                idle_loop(t)
            },
        );
        let old = first.lock().expect("generation captured");

        // Stop and restart: the old unit's late exit must not evict the new loop.
        reg.stop(&id);
        reg.start(&id, || true, idle_loop);
        assert!(!reg.remove_if(&id, old));
        assert!(reg.is_active("keyboard_r"));

        let current = reg.entries.lock().get("keyboard_r").map(|e| e.generation);
        let current = current.expect("entry");
        assert_ne!(current, old);
        assert!(reg.remove_if(&id, current));
        assert!(!reg.is_active("keyboard_r"));
        assert!(!reg.remove_if(&id, current));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_never_duplicate() {
        let reg = Arc::new(LoopRegistry::new(CancellationToken::new()));
        let id = TriggerId::keyboard("t");
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let reg = reg.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let mut started = 0i64;
                for _ in 0..100 {
                    match reg.toggle(&id, || true, idle_loop) {
                        LoopToggle::Started => started += 1,
                        LoopToggle::Stopped => started -= 1,
                        LoopToggle::Refused => {}
                    }
                    assert!(reg.len() <= 1);
                }
                started
            }));
        }
        let mut net = 0;
        for t in tasks {
            net += t.await.expect("task");
        }
        // Every start is matched by a stop unless one loop is still registered.
        assert_eq!(net, reg.len() as i64);
    }
}
