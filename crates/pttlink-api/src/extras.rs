// ── Bus payloads ──
//
// A bus message is an action string plus a flat map of typed extras.
// Readers always supply a default, so a missing or mistyped key never
// fails; it just reads as the default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single typed extra value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

/// Keyed extras carried by a bus message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extras(BTreeMap<String, Value>);

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_owned(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(Value::Int(v)) => *v,
            _ => default,
        }
    }

    /// String extra; an empty string reads as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::Str(v)) if !v.is_empty() => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_str_list(&self, key: &str) -> Option<&[String]> {
        match self.0.get(key) {
            Some(Value::StrList(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One message on the bus: an action and its extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub action: String,
    #[serde(default)]
    pub extras: Extras,
}

impl Message {
    pub fn new(action: impl Into<String>, extras: Extras) -> Self {
        Self {
            action: action.into(),
            extras,
        }
    }

    /// Encode as a single JSON object, for hosts whose bus is a byte stream.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn readers_fall_back_to_defaults() {
        let extras = Extras::new()
            .with("FLAG", true)
            .with("COUNT", 7)
            .with("NAME", "alice")
            .with("EMPTY", "");

        assert!(extras.get_bool("FLAG", false));
        assert!(extras.get_bool("MISSING", true));
        // Wrong type reads as the default, not as a coercion.
        assert!(!extras.get_bool("COUNT", false));
        assert_eq!(extras.get_int("COUNT", -1), 7);
        assert_eq!(extras.get_int("NAME", -1), -1);
        assert_eq!(extras.get_str("NAME"), Some("alice"));
        assert_eq!(extras.get_str("EMPTY"), None);
        assert_eq!(extras.get_str("MISSING"), None);
    }

    #[test]
    fn message_json_keeps_value_kinds() {
        let message = Message::new(
            "com.example.ptt.COMMAND",
            Extras::new()
                .with("COMMAND", "SIGN_IN")
                .with("TMP", false)
                .with("WA", 2)
                .with("TABS", vec!["RECENTS".to_owned(), "USERS".to_owned()]),
        );

        let json = message.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["extras"]["TMP"], serde_json::json!(false));
        assert_eq!(parsed["extras"]["WA"], serde_json::json!(2));

        assert_eq!(Message::from_json(&json).unwrap(), message);
    }

    #[test]
    fn message_without_extras_decodes() {
        let message = Message::from_json(r#"{"action":"x.APP_STATE"}"#).unwrap();
        assert!(message.extras.is_empty());
    }
}
