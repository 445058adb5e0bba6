use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::item::{Encoding, GraphItem};

/// Item type name for module nodes.
pub const MODULE_TYPE: &str = "module";
/// Item type name for source nodes.
pub const SOURCE_TYPE: &str = "source";
/// Item type name for module-to-module dependency edges.
pub const DEPENDS_TYPE: &str = "depends";
/// Item type name for source-to-module management edges.
pub const MANAGES_TYPE: &str = "manages";

/// A module: one unit of software identified by language, organization, and
/// name. Its graph key is derived from exactly these three fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub language: String,
    pub organization: String,
    pub module: String,
}

/// A source: where module descriptors were discovered, identified by URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
}

/// A dependency declaration between two modules (payload of a `depends`
/// edge).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depends {
    pub language: String,
    pub organization: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// A management declaration: a source manages a module at some version
/// (payload of a `manages` edge).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manages {
    pub system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Decoded form of a generic graph item.
///
/// The set of entity kinds is closed; decoding dispatches on the item's
/// type tag rather than through any open registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphEntity {
    Module(Module),
    Source(Source),
    Depends(Depends),
    Manages(Manages),
}

/// Decode a generic graph item into its typed domain record.
///
/// Dispatches on `item_type`; the payload is interpreted according to the
/// item's encoding tag. Unknown type tags and malformed payloads are errors.
pub fn decode(item: &GraphItem) -> Result<GraphEntity, TypeError> {
    match item.item_type.as_str() {
        MODULE_TYPE => Ok(GraphEntity::Module(decode_payload(item)?)),
        SOURCE_TYPE => Ok(GraphEntity::Source(decode_payload(item)?)),
        DEPENDS_TYPE => Ok(GraphEntity::Depends(decode_payload(item)?)),
        MANAGES_TYPE => Ok(GraphEntity::Manages(decode_payload(item)?)),
        other => Err(TypeError::UnknownItemType(other.to_string())),
    }
}

fn decode_payload<T: for<'de> Deserialize<'de>>(item: &GraphItem) -> Result<T, TypeError> {
    match item.encoding {
        Encoding::Json => serde_json::from_slice(&item.data).map_err(|e| TypeError::Payload {
            item_type: item.item_type.clone(),
            reason: e.to_string(),
        }),
        Encoding::Raw => Err(TypeError::Payload {
            item_type: item.item_type.clone(),
            reason: "raw payloads carry no typed record".to_string(),
        }),
    }
}

/// Serialize a domain record into a JSON item payload.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, TypeError> {
    serde_json::to_vec(value).map_err(|e| TypeError::Payload {
        item_type: String::new(),
        reason: e.to_string(),
    })
}
