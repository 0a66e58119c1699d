//! Outbound seam to the synthetic input collaborator.
//!
//! The engine never talks to the OS directly: every key or button event goes
//! through an [`Injector`]. Implementations must be callable concurrently from
//! any unit of work.

use std::fmt;

use config::{ActionOp, MouseButton};
use thiserror::Error;
use tracing::info;

/// A key or mouse button that can be injected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputTarget {
    /// A keyboard key by name, e.g. `a` or `shift`.
    Key(String),
    /// A mouse button.
    Mouse(MouseButton),
}

impl InputTarget {
    /// Shorthand for [`InputTarget::Key`].
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }
}

impl fmt::Display for InputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, "key:{}", k),
            Self::Mouse(b) => write!(f, "mouse:{}", b),
        }
    }
}

/// Failure of a single injection call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InjectError {
    /// The backend rejected or failed the event.
    #[error("{0}")]
    Backend(String),
}

/// Synthetic input primitive: one key-down, key-up or click.
pub trait Injector: Send + Sync {
    /// Emit one `op` for `target`. Called concurrently from many units of work.
    fn inject(&self, target: &InputTarget, op: ActionOp) -> Result<(), InjectError>;
}

/// Injector that only records each event in the log.
///
/// Used by hosts that drive the engine without an OS backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInjector;

impl Injector for TracingInjector {
    fn inject(&self, target: &InputTarget, op: ActionOp) -> Result<(), InjectError> {
        info!(input = %target, op = op.as_str(), "injected");
        Ok(())
    }
}
