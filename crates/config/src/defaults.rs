// Defaults applied while converting raw config entries.

/// Delay used when a `delay` action omits `duration` (seconds).
pub(crate) const DELAY_DURATION_SECS: f64 = 0.1;

/// Jitter used when a `delay` action omits `random` (seconds).
pub(crate) const DELAY_RANDOM_SECS: f64 = 0.0;

/// Prefix for keyboard trigger identifiers.
pub(crate) const KEYBOARD_PREFIX: &str = "keyboard_";

/// Prefix for mouse trigger identifiers.
pub(crate) const MOUSE_PREFIX: &str = "mouse_";
