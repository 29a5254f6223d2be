// src/protocol/event.rs

use serde_json::{Map, Value};

/// One Wyoming event: a type tag, a JSON data object and an optional binary
/// payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    pub kind: String,
    pub data: Map<String, Value>,
    pub payload: Option<Vec<u8>>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: Map::new(),
            payload: None,
        }
    }

    /// Build an event from a `json!({...})` literal. Anything other than an
    /// object leaves the data empty.
    pub fn with_data(kind: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            data,
            payload: None,
        }
    }

    /// Attach a payload. An empty payload is the same as no payload on the wire.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = if payload.is_empty() { None } else { Some(payload) };
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// String field from the data object.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Vec::len)
    }
}
