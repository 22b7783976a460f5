//! Shared test utilities.

use serde_json::{json, Value};

use crate::model::{ManifestEntry, Node};

/// Creates a manifest entry with the given file, parent GUID and order.
pub fn entry(file: &str, parent: Option<&str>, order: Option<i64>) -> ManifestEntry {
    ManifestEntry {
        kind: "Object".to_string(),
        nickname: None,
        guid: None,
        file: file.to_string(),
        parent: parent.map(str::to_string),
        order: order.map(|o| o as f64),
    }
}

/// Creates a minimal, valid object JSON value.
pub fn object_json(guid: &str, name: &str, nickname: &str) -> Value {
    json!({
        "GUID": guid,
        "Name": name,
        "Nickname": nickname,
        "Transform": {"posX": 0.0, "posY": 1.0, "posZ": 0.0}
    })
}

/// Creates a node with the given identity and no payloads.
pub fn make_node(guid: &str, name: &str, nickname: &str) -> Node {
    Node::from_value(object_json(guid, name, nickname)).unwrap()
}
