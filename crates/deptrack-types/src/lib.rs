//! Foundation types for deptrack.
//!
//! This crate provides the generic graph-item model and the typed domain
//! schema layered on top of it. Every other deptrack crate depends on
//! `deptrack-types`.
//!
//! # Key Types
//!
//! - [`GraphKey`] — fixed-length opaque content key (SHA-256 sized)
//! - [`GraphItem`] — the sole persisted entity: a node (`k1 == k2`) or an
//!   edge (`k1 != k2`) with an opaque payload
//! - [`GraphItemPair`] — a traversal result: one node plus the edge that
//!   reached it
//! - [`Module`], [`Source`], [`Depends`], [`Manages`] — typed domain
//!   records carried in item payloads
//! - [`GraphEntity`] — closed decode target for generic items

pub mod error;
pub mod item;
pub mod key;
pub mod schema;

pub use error::TypeError;
pub use item::{Encoding, GraphItem, GraphItemPair};
pub use key::GraphKey;
pub use schema::{
    decode, encode_payload, Depends, GraphEntity, Manages, Module, Source, DEPENDS_TYPE,
    MANAGES_TYPE, MODULE_TYPE, SOURCE_TYPE,
};
