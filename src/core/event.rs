//! Events fed to a running statechart.

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named event with an optional payload.
///
/// Payload fields are visible to guards and actions as `event.<field>`.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Event, Value};
///
/// let event = Event::new("floorSelected").with("floor", 5);
/// assert_eq!(event.name(), "floorSelected");
/// assert_eq!(event.get("floor"), Some(&Value::Int(5)));
/// assert_eq!(event.to_string(), "floorSelected(floor=5)");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Attach a payload field, returning the event.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.data.is_empty() {
            let fields: Vec<String> = self
                .data
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, "({})", fields.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_without_payload_displays_bare_name() {
        assert_eq!(Event::new("tick").to_string(), "tick");
    }

    #[test]
    fn payload_is_ordered_by_key() {
        let event = Event::new("move").with("y", 2).with("x", 1);
        assert_eq!(event.to_string(), "move(x=1, y=2)");
    }

    #[test]
    fn event_roundtrips_through_json() {
        let event = Event::new("floorSelected").with("floor", 3);
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
