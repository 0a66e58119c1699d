use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the macro engine.
///
/// Injection failures never surface here: the executor logs them and moves
/// on to the next action.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine has been shut down and no longer accepts work.
    #[error("Engine is shut down")]
    ShutDown,

    /// A unit of work failed in a way the engine's locking should make impossible.
    #[error("Internal error: {0}")]
    Internal(String),
}
