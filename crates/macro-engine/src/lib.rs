//! automacro engine
//!
//! The engine turns physical input edges into synthetic input sequences:
//! - looks up the trigger in the binding table
//! - runs one-shot action lists, or starts/stops repeating loops
//! - suspends everything while the pause gate is set
//! - owns every spawned unit of work and tears them down on shutdown
//!
//! It exposes a small API:
//! - [`Engine`]: the handle you construct and feed input edges into
//! - [`Injector`]: the outbound seam to the synthetic input backend
//! - [`EdgeRouter`]: a ready-made ingestion adapter with pause-chord detection
//!
//! Input hooks and real OS injection live outside this crate.
use std::sync::{Arc, Weak};

mod error;
mod executor;
mod ingest;
mod inject;
mod key_state;
mod lifecycle;
mod loops;
mod pause;
pub mod test_support;

use config::{BindingTable, TriggerDefinition, TriggerId, TriggerKind};
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

pub use error::{Error, Result};
pub use executor::{DownTracker, Executor, Outcome};
pub use ingest::{ChordState, EdgeRouter, InputEvent, Routed};
pub use inject::{InjectError, InputTarget, Injector, TracingInjector};
pub use lifecycle::LISTENER_JOIN_TIMEOUT;

use key_state::PressedKeys;
use lifecycle::Lifecycle;
use loops::{LoopRegistry, LoopStart, LoopTicket, LoopToggle};
use pause::PauseGate;

struct Inner {
    /// Read-only after load.
    bindings: BindingTable,
    executor: Executor,
    /// Active loop per trigger (own guard).
    loops: LoopRegistry,
    /// Physically held keyboard keys (own guard).
    pressed: PressedKeys,
    gate: PauseGate,
    lifecycle: Lifecycle,
}

/// Engine coordinates trigger dispatch, loops, pausing and shutdown.
///
/// Construct via [`Engine::new`], then feed de-duplicated input edges via
/// [`Engine::on_key_edge`] / [`Engine::on_mouse_edge`], or trigger ids via
/// [`Engine::dispatch`]. Dispatch never blocks on action execution: work is
/// spawned onto the runtime given at construction.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Create a new engine.
    ///
    /// - `bindings`: the loaded binding table
    /// - `injector`: synthetic input backend
    /// - `runtime`: where units of work are spawned
    pub fn new(bindings: BindingTable, injector: Arc<dyn Injector>, runtime: Handle) -> Self {
        let lifecycle = Lifecycle::new(runtime);
        let loops = LoopRegistry::new(lifecycle.running_token().clone());
        info!(triggers = bindings.len(), "engine_created");
        Self {
            inner: Arc::new(Inner {
                bindings,
                executor: Executor::new(injector),
                loops,
                pressed: PressedKeys::default(),
                gate: PauseGate::default(),
                lifecycle,
            }),
        }
    }

    /// Handle a press (`is_press`) or release edge for trigger `id`.
    ///
    /// No-op while paused, after shutdown, or when `id` is unbound.
    pub fn dispatch(&self, id: &TriggerId, is_press: bool) {
        let inner = &self.inner;
        if inner.gate.is_paused() || !inner.lifecycle.is_running() {
            trace!("dispatch_ignored" = %id, is_press);
            return;
        }
        let Some(def) = inner.bindings.get(id.as_str()) else {
            return;
        };

        match (def.kind, is_press) {
            (TriggerKind::FireOnce, true) => self.spawn_once(id, def),
            (TriggerKind::HoldRepeat, true) => {
                let res = inner
                    .loops
                    .start(id, || self.admits_loops(), |t| self.spawn_loop(id, def, t));
                if res == LoopStart::Started {
                    debug!("trigger_loop_start" = %id, kind = def.kind.as_str());
                }
            }
            (TriggerKind::HoldRepeat, false) => {
                if inner.loops.stop(id).is_some() {
                    debug!("trigger_loop_stop" = %id, kind = def.kind.as_str());
                }
            }
            (TriggerKind::ToggleRepeat, true) => {
                match inner
                    .loops
                    .toggle(id, || self.admits_loops(), |t| self.spawn_loop(id, def, t))
                {
                    LoopToggle::Started => {
                        debug!("trigger_loop_start" = %id, kind = def.kind.as_str())
                    }
                    LoopToggle::Stopped => {
                        debug!("trigger_loop_stop" = %id, kind = def.kind.as_str())
                    }
                    LoopToggle::Refused => {}
                }
            }
            (TriggerKind::FireOnce | TriggerKind::ToggleRepeat, false) => {}
        }
    }

    /// Keyboard edge from the ingestion layer. Repeated presses of a held key
    /// are collapsed into one press edge.
    pub fn on_key_edge(&self, key: &str, pressed: bool) {
        if self.inner.gate.is_paused() {
            return;
        }
        if pressed {
            if !self.inner.pressed.on_key_down(key) {
                trace!("key_repeat_suppressed" = %key);
                return;
            }
        } else {
            self.inner.pressed.on_key_up(key);
        }
        self.dispatch(&TriggerId::keyboard(key), pressed);
    }

    /// Mouse button edge from the ingestion layer.
    pub fn on_mouse_edge(&self, button: &str, pressed: bool) {
        if self.inner.gate.is_paused() {
            return;
        }
        self.dispatch(&TriggerId::mouse(button), pressed);
    }

    /// The pause chord was pressed.
    pub fn on_pause_chord(&self) {
        let paused = self.toggle_pause();
        info!("event handling {}", if paused { "paused" } else { "resumed" });
    }

    /// Flip the pause gate; pausing stops every running loop. Returns the new state.
    pub fn toggle_pause(&self) -> bool {
        self.inner.gate.toggle(&self.inner.loops)
    }

    /// Returns true while the pause gate is set.
    pub fn is_paused(&self) -> bool {
        self.inner.gate.is_paused()
    }

    /// False once [`Engine::shutdown`] has begun.
    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Returns true if a loop is registered for `id`.
    pub fn is_looping(&self, id: &str) -> bool {
        self.inner.loops.is_active(id)
    }

    /// Number of registered loops.
    pub fn loop_count(&self) -> usize {
        self.inner.loops.len()
    }

    /// Triggers that currently have a registered loop.
    pub fn active_loops(&self) -> Vec<TriggerId> {
        self.inner.loops.active()
    }

    /// Returns true if the ingestion layer reported `key` as held.
    pub fn is_key_held(&self, key: &str) -> bool {
        self.inner.pressed.is_down(key)
    }

    /// Number of units of work (one-shot runs and loops) still executing.
    pub fn unit_count(&self) -> usize {
        self.inner.lifecycle.unit_count()
    }

    /// Token cancelled when shutdown begins. Ingestion tasks should stop
    /// delivering events once it fires.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.lifecycle.running_token().clone()
    }

    /// Track an ingestion task; shutdown waits up to
    /// [`LISTENER_JOIN_TIMEOUT`] for it and aborts it afterwards.
    pub fn register_listener(&self, handle: JoinHandle<()>) -> Result<()> {
        self.inner.lifecycle.register_listener(handle)
    }

    /// Stop all loops, wait for listeners and every unit of work, then release
    /// any input still held. Idempotent.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        inner
            .lifecycle
            .shutdown(&inner.loops, &inner.executor)
            .await;
    }

    fn admits_loops(&self) -> bool {
        !self.inner.gate.is_paused() && self.inner.lifecycle.is_running()
    }

    fn spawn_once(&self, id: &TriggerId, def: &Arc<TriggerDefinition>) {
        debug!("trigger_once" = %id);
        let executor = self.inner.executor.clone();
        let running = self.inner.lifecycle.running_token().clone();
        let def = def.clone();
        let label = id.clone();
        self.inner.lifecycle.register("once", id.clone(), async move {
            if running.is_cancelled() {
                return;
            }
            let mut tracker = DownTracker::default();
            let outcome = executor.run(&def.actions, &mut tracker).await;
            trace!("once_done" = %label, ?outcome);
        });
    }

    fn spawn_loop(
        &self,
        id: &TriggerId,
        def: &Arc<TriggerDefinition>,
        ticket: LoopTicket,
    ) -> JoinHandle<()> {
        let executor = self.inner.executor.clone();
        let def = def.clone();
        let inner = Arc::downgrade(&self.inner);
        let label = id.clone();
        let LoopTicket { token, generation } = ticket;
        self.inner.lifecycle.register("loop", id.clone(), async move {
            // Built on first poll, never under the registry guard. Dropped on
            // every exit path, panics included.
            let exit = LoopExit {
                inner,
                id: label,
                generation,
            };
            let mut tracker = DownTracker::default();
            let mut passes: u64 = 0;
            // Cancellation is observed between passes only.
            while !token.is_cancelled() {
                executor.run_pass(&def.actions, &mut tracker).await;
                passes += 1;
                tokio::task::yield_now().await;
            }
            executor.release_all(&mut tracker);
            debug!("loop_exit" = %exit.id, passes);
        })
    }
}

/// Removes a loop's registry entry when its unit of work ends.
///
/// A normal stop has already removed the entry; this catches units that die
/// without being stopped, so the registry never lists a loop that is gone.
struct LoopExit {
    inner: Weak<Inner>,
    id: TriggerId,
    generation: u64,
}

impl Drop for LoopExit {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.loops.remove_if(&self.id, self.generation);
        }
    }
}
