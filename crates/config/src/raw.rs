//! Serde shapes of the on-disk JSON document.
//!
//! Raw types mirror the file format one-to-one and carry no invariants; the
//! conversion into [`crate::types`] performs the shape checks.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    ActionKind, ActionOp, BindingTable, Error, MouseButton, TriggerDefinition, TriggerId,
    TriggerKind,
    defaults::{DELAY_DURATION_SECS, DELAY_RANDOM_SECS},
};

/// Whole document: trigger id -> trigger entry.
pub(crate) type RawDocument = BTreeMap<String, RawTrigger>;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTrigger {
    pub trigger_type: String,
    #[serde(default)]
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random: Option<f64>,
}

/// Convert a non-negative number of seconds into a `Duration`.
fn seconds(trigger: &str, field: &str, value: f64) -> Result<Duration, Error> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(
            trigger,
            format!("'{field}' must be a non-negative number of seconds, got {value}"),
        ));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| Error::invalid(trigger, format!("'{field}' is out of range: {e}")))
}

impl RawAction {
    fn into_action(self, trigger: &str, index: usize) -> Result<ActionKind, Error> {
        let ctx = |msg: String| Error::invalid(trigger, format!("action #{index}: {msg}"));
        match self.kind.as_str() {
            "keyboard" | "mouse" => {
                let key = self
                    .key
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| ctx(format!("'{}' action requires 'key'", self.kind)))?;
                let op = self
                    .action
                    .as_deref()
                    .ok_or_else(|| ctx(format!("'{}' action requires 'action'", self.kind)))?
                    .parse::<ActionOp>()
                    .map_err(ctx)?;
                if self.kind == "keyboard" {
                    Ok(ActionKind::Key { key, op })
                } else {
                    let button = key.parse::<MouseButton>().map_err(ctx)?;
                    Ok(ActionKind::Mouse { button, op })
                }
            }
            "delay" => {
                let base = seconds(
                    trigger,
                    "duration",
                    self.duration.unwrap_or(DELAY_DURATION_SECS),
                )?;
                let jitter = seconds(trigger, "random", self.random.unwrap_or(DELAY_RANDOM_SECS))?;
                Ok(ActionKind::Delay { base, jitter })
            }
            other => Err(ctx(format!(
                "unknown action type '{other}' (expected keyboard|mouse|delay)"
            ))),
        }
    }

    fn from_action(action: &ActionKind) -> Self {
        match action {
            ActionKind::Key { key, op } => Self {
                kind: "keyboard".to_string(),
                key: Some(key.clone()),
                action: Some(op.as_str().to_string()),
                duration: None,
                random: None,
            },
            ActionKind::Mouse { button, op } => Self {
                kind: "mouse".to_string(),
                key: Some(button.as_str().to_string()),
                action: Some(op.as_str().to_string()),
                duration: None,
                random: None,
            },
            ActionKind::Delay { base, jitter } => Self {
                kind: "delay".to_string(),
                key: None,
                action: None,
                duration: Some(base.as_secs_f64()),
                random: (!jitter.is_zero()).then(|| jitter.as_secs_f64()),
            },
        }
    }
}

impl RawTrigger {
    pub(crate) fn into_definition(self, trigger: &str) -> Result<TriggerDefinition, Error> {
        let kind = self
            .trigger_type
            .parse::<TriggerKind>()
            .map_err(|m| Error::invalid(trigger, m))?;
        let actions = self
            .actions
            .into_iter()
            .enumerate()
            .map(|(i, a)| a.into_action(trigger, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TriggerDefinition {
            kind,
            actions: Arc::from(actions),
        })
    }

    pub(crate) fn from_definition(def: &TriggerDefinition) -> Self {
        Self {
            trigger_type: def.kind.as_str().to_string(),
            actions: def.actions.iter().map(RawAction::from_action).collect(),
        }
    }
}

/// Validate a raw document into a binding table.
pub(crate) fn into_table(doc: RawDocument) -> Result<BindingTable, Error> {
    let mut entries = Vec::with_capacity(doc.len());
    for (id, raw) in doc {
        let trigger = id
            .parse::<TriggerId>()
            .map_err(|m| Error::invalid(&id, m))?;
        let def = raw.into_definition(&id)?;
        entries.push((trigger, def));
    }
    Ok(BindingTable::from_entries(entries))
}

/// Render a binding table back into its raw document form.
pub(crate) fn from_table(table: &BindingTable) -> RawDocument {
    table
        .iter()
        .map(|(id, def)| (id.to_string(), RawTrigger::from_definition(def)))
        .collect()
}
