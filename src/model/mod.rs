//! Data model: save documents, objects and the split manifest.

mod document;
mod manifest;
mod node;

pub use document::{non_blank_str, SaveDocument, GAME_MODE, OBJECT_STATES, SAVE_NAME, VERSION_NUMBER};
pub use manifest::{sort_by_order, ManifestEntry, ManifestIndex, ParentKey};
pub use node::{
    Node, Payload, CONTAINED_OBJECTS, GUID, LUA_SCRIPT, LUA_SCRIPT_STATE, MEMO, NAME, NICKNAME,
    TRANSFORM, XML_UI,
};
