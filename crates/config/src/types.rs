//! Validated binding table types.

use std::{
    borrow::Borrow,
    collections::{BTreeMap, btree_map},
    fmt,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use crate::{
    Error,
    defaults::{KEYBOARD_PREFIX, MOUSE_PREFIX},
    raw,
};

/// Opaque trigger key, e.g. `keyboard_a` or `mouse_x1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(String);

impl TriggerId {
    /// Trigger identifier for a keyboard key name.
    pub fn keyboard(key: &str) -> Self {
        Self(format!("{KEYBOARD_PREFIX}{key}"))
    }

    /// Trigger identifier for a mouse button name.
    ///
    /// Button names are passed through as reported by the event source; only
    /// configured identifiers are validated against [`MouseButton`].
    pub fn mouse(button: &str) -> Self {
        Self(format!("{MOUSE_PREFIX}{button}"))
    }

    /// Borrow the full identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TriggerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = s.strip_prefix(KEYBOARD_PREFIX) {
            if key.is_empty() {
                return Err(format!("trigger '{s}' is missing a key name"));
            }
            return Ok(Self(s.to_string()));
        }
        if let Some(button) = s.strip_prefix(MOUSE_PREFIX) {
            button.parse::<MouseButton>()?;
            return Ok(Self(s.to_string()));
        }
        Err(format!(
            "trigger '{s}' must start with '{KEYBOARD_PREFIX}' or '{MOUSE_PREFIX}'"
        ))
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TriggerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TriggerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mouse buttons accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// All buttons, in configuration order.
    pub const ALL: [Self; 5] = [Self::Left, Self::Right, Self::Middle, Self::X1, Self::X2];

    /// Configuration name of this button.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
            Self::X1 => "x1",
            Self::X2 => "x2",
        }
    }
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown mouse button '{s}' (expected left|right|middle|x1|x2)"))
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an input action does to its key or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionOp {
    Press,
    Release,
    /// Press and release as one injected action.
    Click,
}

impl ActionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Release => "release",
            Self::Click => "click",
        }
    }
}

impl FromStr for ActionOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "press" => Ok(Self::Press),
            "release" => Ok(Self::Release),
            "click" => Ok(Self::Click),
            other => Err(format!(
                "unknown action '{other}' (expected press|release|click)"
            )),
        }
    }
}

/// One step of a macro.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Key { key: String, op: ActionOp },
    Mouse { button: MouseButton, op: ActionOp },
    /// Sleep for `base` plus a uniform random fraction of `jitter`.
    Delay { base: Duration, jitter: Duration },
}

/// Repeat policy of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Run the action list once per press edge.
    FireOnce,
    /// Repeat the action list while held; stop on release.
    HoldRepeat,
    /// Press starts the loop when idle and stops it when running.
    ToggleRepeat,
}

impl TriggerKind {
    /// Configuration name (`once`, `hold`, `toggle`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FireOnce => "once",
            Self::HoldRepeat => "hold",
            Self::ToggleRepeat => "toggle",
        }
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Self::FireOnce),
            "hold" => Ok(Self::HoldRepeat),
            "toggle" => Ok(Self::ToggleRepeat),
            other => Err(format!(
                "unknown trigger_type '{other}' (expected once|hold|toggle)"
            )),
        }
    }
}

/// A trigger's repeat policy and ordered actions.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDefinition {
    pub kind: TriggerKind,
    pub actions: Arc<[ActionKind]>,
}

/// Immutable mapping from trigger identifier to definition.
///
/// Definitions are reference counted so that units of work can hold on to
/// their action list without copying it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    triggers: BTreeMap<TriggerId, Arc<TriggerDefinition>>,
}

impl BindingTable {
    /// Build a table from already validated entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (TriggerId, TriggerDefinition)>,
    {
        Self {
            triggers: entries
                .into_iter()
                .map(|(id, def)| (id, Arc::new(def)))
                .collect(),
        }
    }

    /// Look up the definition bound to `id`.
    pub fn get(&self, id: &str) -> Option<&Arc<TriggerDefinition>> {
        self.triggers.get(id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Iterate bindings in identifier order.
    pub fn iter(&self) -> btree_map::Iter<'_, TriggerId, Arc<TriggerDefinition>> {
        self.triggers.iter()
    }

    /// Render the table as pretty-printed JSON in the configuration file format.
    pub fn to_json_pretty(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(&raw::from_table(self)).map_err(|e| Error::Serialize {
            message: format!("Failed to serialize config: {}", e),
        })
    }
}

impl<'a> IntoIterator for &'a BindingTable {
    type Item = (&'a TriggerId, &'a Arc<TriggerDefinition>);
    type IntoIter = btree_map::Iter<'a, TriggerId, Arc<TriggerDefinition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_id_namespaces() {
        let k = TriggerId::keyboard("a");
        assert_eq!(k.as_str(), "keyboard_a");
        assert_eq!(TriggerId::mouse("x1").as_str(), "mouse_x1");
    }

    #[test]
    fn trigger_id_parse_rejects_bad_shapes() {
        assert!("keyboard_a".parse::<TriggerId>().is_ok());
        assert!("mouse_left".parse::<TriggerId>().is_ok());
        assert!("keyboard_".parse::<TriggerId>().is_err());
        assert!("mouse_wheel".parse::<TriggerId>().is_err());
        assert!("a".parse::<TriggerId>().is_err());
    }

    #[test]
    fn lookup_by_str() {
        let table = BindingTable::from_entries([(
            TriggerId::keyboard("q"),
            TriggerDefinition {
                kind: TriggerKind::FireOnce,
                actions: Arc::from(Vec::new()),
            },
        )]);
        assert!(table.get("keyboard_q").is_some());
        assert!(table.get("keyboard_w").is_none());
        assert_eq!(table.len(), 1);
    }
}
