//! Binding table types and loading for automacro.
//!
//! A configuration file maps trigger identifiers (`keyboard_<key>` or
//! `mouse_<button>`) to a trigger definition: a repeat policy plus an ordered
//! list of synthetic input actions. The table is loaded once at startup and is
//! read-only afterwards.
#![allow(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

use std::{
    env,
    path::{Path, PathBuf},
};

mod defaults;
mod error;
mod loader;
mod raw;
mod types;

#[cfg(test)]
mod test_parse;

pub use error::{Error, excerpt_at};
pub use loader::{load_from_path, load_from_str};
pub use types::{
    ActionKind, ActionOp, BindingTable, MouseButton, TriggerDefinition, TriggerId, TriggerKind,
};

/// Determine the preferred user config path (`~/.automacro/config.json`).
pub fn default_config_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".automacro");
    p.push("config.json");
    p
}

/// Resolve the effective config path using the default policy.
///
/// Policy:
/// 1) Use `explicit` when provided.
/// 2) Else use `~/.automacro/config.json` when it exists.
/// 3) Else return a clear "no config found" error.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let preferred = default_config_path();
    if preferred.exists() {
        return Ok(preferred);
    }

    Err(Error::Read {
        path: Some(preferred),
        message: "No config found. Create ~/.automacro/config.json or pass a path explicitly"
            .to_string(),
    })
}
