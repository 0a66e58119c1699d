//! Global pause switch toggled by the pause chord.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::loops::LoopRegistry;

/// Process-wide pause switch.
///
/// While set, dispatch ignores every event. Entering the paused state stops
/// every running loop; leaving it does not restart anything.
#[derive(Debug, Default)]
pub(crate) struct PauseGate {
    paused: AtomicBool,
}

impl PauseGate {
    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Flip the gate. Returns the new state (true = paused).
    ///
    /// The flag is published before the registry is cleared, and loop starts
    /// re-check it under the registry guard, so no loop survives a pause.
    pub(crate) fn toggle(&self, loops: &LoopRegistry) -> bool {
        let paused = !self.paused.fetch_xor(true, Ordering::SeqCst);
        if paused {
            let stopped = loops.cancel_all();
            debug!(stopped = stopped.len(), "pause_stopped_loops");
        }
        paused
    }
}

#[cfg(test)]
mod tests {
    use config::TriggerId;
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[tokio::test]
    async fn pausing_clears_loops_and_resume_does_not_restart() {
        let gate = PauseGate::default();
        let loops = LoopRegistry::new(CancellationToken::new());
        let id = TriggerId::keyboard("a");
        loops.start(
            &id,
            || !gate.is_paused(),
            |t| tokio::spawn(async move { t.token.cancelled().await }),
        );
        assert_eq!(loops.len(), 1);

        assert!(gate.toggle(&loops));
        assert!(gate.is_paused());
        assert_eq!(loops.len(), 0);

        assert!(!gate.toggle(&loops));
        assert!(!gate.is_paused());
        assert_eq!(loops.len(), 0);
    }
}
