//! Ingestion adapter: raw listener events to engine edges.
//!
//! Tracks Ctrl/Shift so the pause chord (Ctrl+Shift+X) can be recognised
//! before events reach the trigger coordinator. Chord detection keeps working
//! while paused; everything else is gated by the engine.

use crate::Engine;

/// Raw event as delivered by a keyboard or mouse listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Key pressed, by key name.
    KeyDown(String),
    /// Key released.
    KeyUp(String),
    /// Mouse button pressed, by button name.
    MouseDown(String),
    /// Mouse button released.
    MouseUp(String),
}

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Forwarded to the engine as a key or mouse edge.
    Edge,
    /// Recognised as the pause chord; not forwarded.
    PauseChord,
}

fn is_ctrl(key: &str) -> bool {
    matches!(key, "ctrl" | "ctrl_l" | "ctrl_r")
}

fn is_shift(key: &str) -> bool {
    matches!(key, "shift" | "shift_l" | "shift_r")
}

/// `x`, `X`, or the control character some hooks report for Ctrl+X.
fn is_chord_key(key: &str) -> bool {
    matches!(key, "x" | "X" | "\u{18}")
}

/// Modifier state used for pause-chord detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChordState {
    ctrl: bool,
    shift: bool,
}

impl ChordState {
    /// Update modifier state with `ev`; returns true when `ev` completes the pause chord.
    pub fn observe(&mut self, ev: &InputEvent) -> bool {
        match ev {
            InputEvent::KeyDown(k) => {
                if is_ctrl(k) {
                    self.ctrl = true;
                } else if is_shift(k) {
                    self.shift = true;
                } else if is_chord_key(k) {
                    return self.ctrl && self.shift;
                }
                false
            }
            InputEvent::KeyUp(k) => {
                if is_ctrl(k) {
                    self.ctrl = false;
                } else if is_shift(k) {
                    self.shift = false;
                }
                false
            }
            InputEvent::MouseDown(_) | InputEvent::MouseUp(_) => false,
        }
    }
}

/// Feeds listener events into an [`Engine`].
pub struct EdgeRouter {
    engine: Engine,
    chord: ChordState,
}

impl EdgeRouter {
    /// Router feeding `engine`, with no modifiers held.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            chord: ChordState::default(),
        }
    }

    /// Route one event.
    pub fn handle(&mut self, ev: &InputEvent) -> Routed {
        if self.chord.observe(ev) {
            self.engine.on_pause_chord();
            return Routed::PauseChord;
        }
        match ev {
            InputEvent::KeyDown(k) => self.engine.on_key_edge(k, true),
            InputEvent::KeyUp(k) => self.engine.on_key_edge(k, false),
            InputEvent::MouseDown(b) => self.engine.on_mouse_edge(b, true),
            InputEvent::MouseUp(b) => self.engine.on_mouse_edge(b, false),
        }
        Routed::Edge
    }

    /// The engine events are routed into.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn down(k: &str) -> InputEvent {
        InputEvent::KeyDown(k.into())
    }

    fn up(k: &str) -> InputEvent {
        InputEvent::KeyUp(k.into())
    }

    #[test]
    fn chord_needs_both_modifiers() {
        let mut st = ChordState::default();
        assert!(!st.observe(&down("ctrl_l")));
        assert!(!st.observe(&down("x")));
        assert!(!st.observe(&down("shift_r")));
        assert!(st.observe(&down("X")));
        assert!(!st.observe(&up("ctrl_l")));
        assert!(!st.observe(&down("x")));
    }

    #[test]
    fn control_character_counts() {
        let mut st = ChordState::default();
        st.observe(&down("ctrl"));
        st.observe(&down("shift"));
        assert!(st.observe(&down("\u{18}")));
    }

    fn event() -> impl Strategy<Value = InputEvent> {
        let keys = prop::sample::select(vec!["ctrl_l", "shift_l", "x", "a"]);
        (keys, any::<bool>()).prop_map(|(k, d)| if d { down(k) } else { up(k) })
    }

    proptest! {
        // The chord fires exactly when x goes down with both modifiers held.
        #[test]
        fn chord_matches_model(events in prop::collection::vec(event(), 0..48)) {
            let mut st = ChordState::default();
            let (mut ctrl, mut shift) = (false, false);
            for ev in &events {
                let fired = st.observe(ev);
                let expect = matches!(ev, InputEvent::KeyDown(k) if k == "x") && ctrl && shift;
                prop_assert_eq!(fired, expect);
                match ev {
                    InputEvent::KeyDown(k) if k == "ctrl_l" => ctrl = true,
                    InputEvent::KeyUp(k) if k == "ctrl_l" => ctrl = false,
                    InputEvent::KeyDown(k) if k == "shift_l" => shift = true,
                    InputEvent::KeyUp(k) if k == "shift_l" => shift = false,
                    _ => {}
                }
            }
        }
    }
}
