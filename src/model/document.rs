//! The monolithic save document.

use serde_json::{Map, Value};

use super::node::{Node, Payload};
use crate::errors::{Result, TtsError};

pub const OBJECT_STATES: &str = "ObjectStates";
pub const SAVE_NAME: &str = "SaveName";
pub const GAME_MODE: &str = "GameMode";
pub const VERSION_NUMBER: &str = "VersionNumber";

/// A whole save file: base attributes, top-level objects and the global
/// script/state/markup payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveDocument {
    /// Top-level attributes other than `ObjectStates` and the global payloads.
    pub base: Map<String, Value>,
    /// Top-level objects, in order.
    pub objects: Vec<Node>,
    /// Global payloads. `memo` is never set here.
    pub global: Payload,
}

impl SaveDocument {
    /// Parses a save document from JSON.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut base) = value else {
            return Err(TtsError::Malformed(
                "save file is not a JSON object".to_string(),
            ));
        };

        let objects = match base.shift_remove(OBJECT_STATES) {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Node::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(TtsError::Malformed(
                    "save file does not contain an ObjectStates array".to_string(),
                ))
            }
        };

        let global = Payload::take_from(&mut base, false);

        Ok(Self {
            base,
            objects,
            global,
        })
    }

    /// Converts the document back into JSON.
    ///
    /// `ObjectStates` is inserted after the base attributes unless the base
    /// already positions it; global payloads come last.
    pub fn into_value(self) -> Value {
        let mut fields = self.base;
        let objects = self.objects.into_iter().map(Node::into_value).collect();
        fields.insert(OBJECT_STATES.to_string(), Value::Array(objects));
        self.global.put_into(&mut fields);
        Value::Object(fields)
    }

    /// Returns a non-blank string attribute of the base document.
    pub fn base_str(&self, key: &str) -> Option<&str> {
        non_blank_str(&self.base, key)
    }
}

/// Returns the trimmed value of a string field if it is not blank.
pub fn non_blank_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
