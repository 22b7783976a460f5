//! Objects of the save tree.

use serde_json::{Map, Value};

use crate::errors::{Result, TtsError};

pub const GUID: &str = "GUID";
pub const NAME: &str = "Name";
pub const NICKNAME: &str = "Nickname";
pub const TRANSFORM: &str = "Transform";
pub const LUA_SCRIPT: &str = "LuaScript";
pub const LUA_SCRIPT_STATE: &str = "LuaScriptState";
pub const XML_UI: &str = "XmlUI";
pub const MEMO: &str = "Memo";
pub const CONTAINED_OBJECTS: &str = "ContainedObjects";

/// Embedded text payloads carried by an object (or by the document itself).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// Lua script body.
    pub script: Option<String>,
    /// Persisted script state. Never parsed.
    pub script_state: Option<String>,
    /// XML UI markup.
    pub markup: Option<String>,
    /// Free-text note. Only objects carry one.
    pub memo: Option<String>,
}

impl Payload {
    /// Removes the payload fields from `fields`.
    ///
    /// Values that are not strings are left in place as structural data.
    pub(crate) fn take_from(fields: &mut Map<String, Value>, with_memo: bool) -> Self {
        Self {
            script: take_string(fields, LUA_SCRIPT),
            script_state: take_string(fields, LUA_SCRIPT_STATE),
            markup: take_string(fields, XML_UI),
            memo: if with_memo {
                take_string(fields, MEMO)
            } else {
                None
            },
        }
    }

    /// Appends the present payload fields to `fields`.
    pub(crate) fn put_into(self, fields: &mut Map<String, Value>) {
        let pairs = [
            (LUA_SCRIPT, self.script),
            (LUA_SCRIPT_STATE, self.script_state),
            (XML_UI, self.markup),
            (MEMO, self.memo),
        ];
        for (key, value) in pairs {
            if let Some(text) = value {
                fields.insert(key.to_string(), Value::String(text));
            }
        }
    }

    /// Returns true if no payload is present.
    pub fn is_empty(&self) -> bool {
        self.script.is_none()
            && self.script_state.is_none()
            && self.markup.is_none()
            && self.memo.is_none()
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(fields.get(key), Some(Value::String(_))) {
        return None;
    }
    match fields.shift_remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// One object of the save tree.
///
/// `fields` holds every structural attribute verbatim and in its original
/// key order; payloads and children are split out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// Structural attributes, opaque to the pipeline.
    pub fields: Map<String, Value>,
    /// Embedded payloads.
    pub payload: Payload,
    /// Contained objects, in order.
    pub children: Vec<Node>,
}

impl Node {
    /// Parses a node (and its contained objects) from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(TtsError::Malformed(
                "object state is not a JSON object".to_string(),
            ));
        };

        let payload = Payload::take_from(&mut fields, true);

        let children = match fields.get(CONTAINED_OBJECTS) {
            Some(Value::Array(_)) => match fields.shift_remove(CONTAINED_OBJECTS) {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(Node::from_value)
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        Ok(Self {
            fields,
            payload,
            children,
        })
    }

    /// Converts the node back into a JSON value.
    ///
    /// Payloads follow the structural fields; `ContainedObjects` is only
    /// emitted when there are children.
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        self.payload.put_into(&mut fields);
        if !self.children.is_empty() {
            let children = self.children.into_iter().map(Node::into_value).collect();
            fields.insert(CONTAINED_OBJECTS.to_string(), Value::Array(children));
        }
        Value::Object(fields)
    }

    /// Returns the object's GUID, if it has a non-empty one.
    pub fn guid(&self) -> Option<&str> {
        self.str_field(GUID)
    }

    /// Returns the object's type name.
    pub fn name(&self) -> Option<&str> {
        self.str_field(NAME)
    }

    /// Returns the object's human label.
    pub fn nickname(&self) -> Option<&str> {
        self.str_field(NICKNAME)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Counts this node and all of its descendants.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}
