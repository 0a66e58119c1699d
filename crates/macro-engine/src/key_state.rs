//! Physically held keys, for collapsing hardware auto-repeat.

use std::collections::HashSet;

use parking_lot::Mutex;

/// Tracks which keyboard keys are physically held so hardware auto-repeat
/// press events collapse into a single press edge.
#[derive(Default)]
pub(crate) struct PressedKeys {
    held: Mutex<HashSet<String>>,
}

impl PressedKeys {
    /// Record a key down; returns true for the first down, false for repeats.
    pub(crate) fn on_key_down(&self, key: &str) -> bool {
        self.held.lock().insert(key.to_string())
    }

    /// Record a key up; returns true if the key was held.
    pub(crate) fn on_key_up(&self, key: &str) -> bool {
        self.held.lock().remove(key)
    }

    /// Return true if the key is currently considered down.
    pub(crate) fn is_down(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }
}
