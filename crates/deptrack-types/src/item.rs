use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::GraphKey;

/// Payload serialization format carried alongside each item.
///
/// Stored as a small integer column; the set is closed and new formats get
/// new tags rather than mutating existing ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum Encoding {
    /// Uninterpreted bytes.
    Raw = 0,
    /// JSON-serialized domain record.
    #[default]
    Json = 1,
}

impl Encoding {
    /// The integer tag written to storage.
    pub fn tag(&self) -> i32 {
        *self as i32
    }

    /// Parse a storage tag back into an encoding.
    pub fn from_tag(tag: i32) -> Result<Self, TypeError> {
        match tag {
            0 => Ok(Encoding::Raw),
            1 => Ok(Encoding::Json),
            other => Err(TypeError::UnknownEncoding(other)),
        }
    }
}

/// The sole persisted entity: a generic graph item.
///
/// A **node** is an item whose `k1 == k2` (a self-loop), keyed by the content
/// hash of the entity it represents. An **edge** has `k1 != k2` with `k1` the
/// source node's key and `k2` the target's. `k3` disambiguates parallel edges
/// between the same `(k1, k2)` pair and is never part of the delete match key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphItem {
    pub item_type: String,
    pub k1: GraphKey,
    pub k2: GraphKey,
    pub k3: Option<GraphKey>,
    pub encoding: Encoding,
    /// Opaque serialized domain entity. Carried as text in JSON
    /// representations; payloads are themselves serialized documents.
    #[serde(with = "data_text")]
    pub data: Vec<u8>,
}

mod data_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(deserializer)?.into_bytes())
    }
}

impl GraphItem {
    /// Build a node item: a self-loop under `key` carrying `data`.
    pub fn node(item_type: impl Into<String>, key: GraphKey, data: Vec<u8>) -> Self {
        Self {
            item_type: item_type.into(),
            k1: key,
            k2: key,
            k3: None,
            encoding: Encoding::Json,
            data,
        }
    }

    /// Build an edge item from `source` to `target`.
    pub fn edge(
        item_type: impl Into<String>,
        source: GraphKey,
        target: GraphKey,
        k3: Option<GraphKey>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            k1: source,
            k2: target,
            k3,
            encoding: Encoding::Json,
            data,
        }
    }

    /// Whether this item is a node (self-loop).
    pub fn is_node(&self) -> bool {
        self.k1 == self.k2
    }

    /// Whether this item is an edge.
    pub fn is_edge(&self) -> bool {
        !self.is_node()
    }
}

/// A single-hop traversal result: a discovered node plus the edge that
/// reached it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphItemPair {
    pub node: GraphItem,
    pub edge: GraphItem,
}
