//! Flat manifest describing where each object lives on disk.

use std::borrow::Borrow;
use std::cmp::Ordering;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Leading sibling index in a file name, e.g. `003_Deck_abc123.json`.
static ORDER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{3,})_").unwrap());

/// One manifest record: an object, its backing file and its place in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Object type (`Name`), or `Object` when unnamed.
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,

    /// Human label.
    #[serde(default)]
    pub nickname: Option<String>,

    /// Object GUID.
    #[serde(default)]
    pub guid: Option<String>,

    /// Path of the structural JSON file, relative to the source directory,
    /// `/`-separated.
    pub file: String,

    /// GUID of the containing object; `None` for top-level objects.
    #[serde(default)]
    pub parent: Option<String>,

    /// Zero-based position among siblings. Hand-edited manifests may carry
    /// fractional orders; anything that is not a finite number reads as absent.
    #[serde(
        default,
        deserialize_with = "deserialize_order",
        serialize_with = "serialize_order"
    )]
    pub order: Option<f64>,
}

fn deserialize_order<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite()))
}

fn serialize_order<S>(order: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match order {
        Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            serializer.serialize_i64(*n as i64)
        }
        Some(n) => serializer.serialize_f64(*n),
        None => serializer.serialize_none(),
    }
}

fn default_type() -> String {
    "Object".to_string()
}

impl ManifestEntry {
    /// Returns the sort key for this entry.
    ///
    /// The explicit `order` wins; otherwise a `NNN_` file name prefix is
    /// converted to a zero-based index; otherwise the entry sorts last.
    pub fn order_key(&self) -> f64 {
        if let Some(order) = self.order.filter(|n| n.is_finite()) {
            return order;
        }

        let base = self.file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(&self.file);
        ORDER_PREFIX
            .captures(base)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .map(|n| n - 1.0)
            .unwrap_or(f64::INFINITY)
    }

    /// Returns the grouping key of this entry's parent.
    pub fn parent_key(&self) -> ParentKey {
        match self.parent.as_deref() {
            Some(guid) if !guid.is_empty() => ParentKey::Object(guid.to_string()),
            _ => ParentKey::Root,
        }
    }
}

/// Sorts entries by [`ManifestEntry::order_key`], keeping the original
/// relative order of entries with equal keys.
pub fn sort_by_order<T: Borrow<ManifestEntry>>(entries: Vec<T>) -> Vec<T> {
    let mut keyed: Vec<(f64, usize, T)> = entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| (entry.borrow().order_key(), idx, entry))
        .collect();

    keyed.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    keyed.into_iter().map(|(_, _, entry)| entry).collect()
}

/// Sibling group key: the root sentinel or a parent GUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentKey {
    /// Top-level objects.
    Root,
    /// Children of the object with this GUID.
    Object(String),
}

impl std::fmt::Display for ParentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "__root__"),
            Self::Object(guid) => write!(f, "parent GUID {}", guid),
        }
    }
}

/// Manifest entries grouped by parent, in first-seen group order.
#[derive(Debug, Clone, Default)]
pub struct ManifestIndex {
    groups: IndexMap<ParentKey, Vec<ManifestEntry>>,
}

impl ManifestIndex {
    /// Groups entries by parent in a single pass.
    pub fn new(entries: &[ManifestEntry]) -> Self {
        let mut groups: IndexMap<ParentKey, Vec<ManifestEntry>> = IndexMap::new();
        for entry in entries {
            groups
                .entry(entry.parent_key())
                .or_default()
                .push(entry.clone());
        }
        Self { groups }
    }

    /// Returns the sorted siblings under `key` (empty if none).
    pub fn siblings(&self, key: &ParentKey) -> Vec<&ManifestEntry> {
        match self.groups.get(key) {
            Some(group) => sort_by_order(group.iter().collect()),
            None => Vec::new(),
        }
    }

    /// Returns the sorted top-level entries.
    pub fn roots(&self) -> Vec<&ManifestEntry> {
        self.siblings(&ParentKey::Root)
    }

    /// Returns the sorted children of the object with `guid`.
    pub fn children_of(&self, guid: &str) -> Vec<&ManifestEntry> {
        self.siblings(&ParentKey::Object(guid.to_string()))
    }

    /// Iterates over the raw groups in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = (&ParentKey, &[ManifestEntry])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
