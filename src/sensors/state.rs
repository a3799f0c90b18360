//! Rendered sensor value.
//!
//! Each live entity carries a [`SensorState`] picked once from the descriptor
//! kind. Both variants support the same two operations: `apply` a raw value
//! pushed by the device, and `restore` a value the host remembered from a
//! previous run.

use super::SensorKind;
use serde_json::Value;

/// Host states that mean "no value" and are never restored.
const UNRESTORABLE: [&str; 2] = ["unknown", "unavailable"];

/// String values a binary sensor treats as on.
const TRUTHY: [&str; 4] = ["true", "on", "1", "yes"];

#[derive(Debug, Clone, PartialEq)]
pub enum SensorState {
    /// Native value as sent by the device. `None` until the first reading.
    Numeric(Option<Value>),
    /// On/off. `None` until the first reading.
    Binary(Option<bool>),
}

impl SensorState {
    /// Empty state for a sensor kind.
    pub fn for_kind(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Numeric => SensorState::Numeric(None),
            SensorKind::Binary => SensorState::Binary(None),
        }
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            SensorState::Numeric(_) => SensorKind::Numeric,
            SensorState::Binary(_) => SensorKind::Binary,
        }
    }

    /// Apply a raw value pushed by the device.
    pub fn apply(&mut self, raw: &Value) {
        match self {
            SensorState::Numeric(value) => {
                *value = if raw.is_null() { None } else { Some(raw.clone()) };
            }
            SensorState::Binary(on) => *on = Some(coerce_bool(raw)),
        }
    }

    /// Restore a value remembered by the host. `unknown`/`unavailable` are skipped.
    pub fn restore(&mut self, prior: &str) {
        if UNRESTORABLE.contains(&prior) {
            return;
        }
        match self {
            SensorState::Numeric(value) => *value = Some(Value::String(prior.to_string())),
            SensorState::Binary(on) => *on = Some(prior == "on"),
        }
    }

    /// On/off for binary sensors, `None` otherwise or before the first reading.
    pub fn is_on(&self) -> Option<bool> {
        match self {
            SensorState::Binary(on) => *on,
            SensorState::Numeric(_) => None,
        }
    }

    /// Native value for numeric sensors.
    pub fn value(&self) -> Option<&Value> {
        match self {
            SensorState::Numeric(value) => value.as_ref(),
            SensorState::Binary(_) => None,
        }
    }

    /// Host-facing string form (`on`/`off` for binary sensors).
    pub fn render(&self) -> Option<String> {
        match self {
            SensorState::Numeric(Some(Value::String(s))) => Some(s.clone()),
            SensorState::Numeric(Some(v)) => Some(v.to_string()),
            SensorState::Binary(Some(true)) => Some("on".to_string()),
            SensorState::Binary(Some(false)) => Some("off".to_string()),
            _ => None,
        }
    }
}

fn coerce_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => TRUTHY.contains(&s.to_lowercase().as_str()),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
