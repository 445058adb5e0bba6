//! Deterministic key derivation for deptrack graph nodes.
//!
//! A key is the SHA-256 hash of an ordered concatenation of an entity's
//! identity fields. Two entities with identical identity fields always derive
//! the same key, forever — this is the basis for cross-producer convergence
//! and must not change without a data migration plan.

use sha2::{Digest, Sha256};

use deptrack_types::{GraphItem, GraphKey, Module, Source};

/// Derive a key from ordered identity fields.
///
/// Fields are hashed as their raw UTF-8 bytes with no separators, in the
/// order given. Pure function; the only failure mode is passing the wrong
/// field set, which is a programmer error.
pub fn derive_key(fields: &[&str]) -> GraphKey {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
    }
    GraphKey::from_hash(hasher.finalize().into())
}

/// The node key for a module: hash of `(language, organization, module)`.
pub fn key_for_module(module: &Module) -> GraphKey {
    derive_key(&[&module.language, &module.organization, &module.module])
}

/// The node key for a source: hash of its URL.
pub fn key_for_source(source: &Source) -> GraphKey {
    derive_key(&[&source.url])
}

/// Human-readable identity of an item for log lines: the type tag and hex
/// keys joined with `---`.
pub fn readable_key(item: &GraphItem) -> String {
    let mut parts = vec![
        item.item_type.clone(),
        item.k1.to_hex(),
        item.k2.to_hex(),
    ];
    if let Some(k3) = &item.k3 {
        parts.push(k3.to_hex());
    }
    parts.join("---")
}
