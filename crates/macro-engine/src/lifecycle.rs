//! Ownership of every spawned unit of work and orderly shutdown.

use std::{any::Any, future::Future, panic::AssertUnwindSafe, time::Duration};

use config::TriggerId;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::OnceCell, task::JoinHandle, time};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use crate::{Error, Result, executor::Executor, loops::LoopRegistry};

/// Maximum time to wait for each registered listener during shutdown.
pub const LISTENER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Render a panic payload for logging.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) struct Lifecycle {
    runtime: Handle,
    /// Cancelled once shutdown begins; observed by loops and listeners.
    running: CancellationToken,
    units: TaskTracker,
    listeners: Mutex<Vec<JoinHandle<()>>>,
    /// Set once a shutdown pass has run to completion.
    shutdown_done: OnceCell<()>,
}

impl Lifecycle {
    pub(crate) fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            running: CancellationToken::new(),
            units: TaskTracker::new(),
            listeners: Mutex::new(Vec::new()),
            shutdown_done: OnceCell::new(),
        }
    }

    pub(crate) fn running_token(&self) -> &CancellationToken {
        &self.running
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.running.is_cancelled()
    }

    /// Number of units of work that have not finished yet.
    pub(crate) fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Spawn and track a unit of work. It is deregistered when it finishes,
    /// including by panic, which is reported as an internal error.
    pub(crate) fn register<F>(&self, kind: &'static str, id: TriggerId, unit: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guarded = AssertUnwindSafe(unit).catch_unwind();
        self.units.spawn_on(
            async move {
                if let Err(payload) = guarded.await {
                    let err = Error::Internal(format!(
                        "{} unit for {} panicked: {}",
                        kind,
                        id,
                        panic_message(payload.as_ref())
                    ));
                    error!("{}", err);
                }
            },
            &self.runtime,
        )
    }

    /// Track an event-ingestion task so shutdown can wait for it (bounded).
    pub(crate) fn register_listener(&self, handle: JoinHandle<()>) -> Result<()> {
        let mut listeners = self.listeners.lock();
        if !self.is_running() {
            handle.abort();
            return Err(Error::ShutDown);
        }
        listeners.push(handle);
        Ok(())
    }

    /// Stop everything and wait for it.
    ///
    /// Order: clear the running flag, cancel all loops, wait for listeners
    /// (bounded per listener), wait for all units of work (unbounded), then
    /// release any input still recorded as held. Safe to call repeatedly and
    /// concurrently: one caller drives the pass, and every caller returns only
    /// after it has completed. If the driving caller is dropped midway, a
    /// waiting caller takes over.
    pub(crate) async fn shutdown(&self, loops: &LoopRegistry, executor: &Executor) {
        self.shutdown_done
            .get_or_init(|| self.drain(loops, executor))
            .await;
    }

    async fn drain(&self, loops: &LoopRegistry, executor: &Executor) {
        info!("shutdown_begin");
        {
            // register_listener checks the flag under the same guard.
            let _listeners = self.listeners.lock();
            self.running.cancel();
        }
        self.units.close();
        let stopped = loops.cancel_all();

        let listeners: Vec<JoinHandle<()>> = self.listeners.lock().drain(..).collect();
        for handle in listeners {
            let abort = handle.abort_handle();
            if time::timeout(LISTENER_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("listener did not stop within {:?}", LISTENER_JOIN_TIMEOUT);
                abort.abort();
            }
        }

        for (id, handle) in stopped {
            debug!("shutdown_join_loop" = %id);
            handle.join().await;
        }
        self.units.wait().await;

        let released = executor.release_residual();
        if !released.is_empty() {
            warn!(count = released.len(), "released inputs left held");
        }
        debug!("shutdown_complete");
    }
}
