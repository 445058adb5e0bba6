//! SQL-backed graph storage engine for deptrack.
//!
//! The store persists an arbitrary-shaped dependency graph as generic
//! [`GraphItem`](deptrack_types::GraphItem) rows in a single relational
//! table, and exposes exactly five operations: `put`, `delete`, `list`,
//! `find_upstream`, and `find_downstream`. Traversals are single-hop
//! self-joins; multi-hop composition belongs to the service layer.
//!
//! # Backends
//!
//! The store issues its SQL through sqlx's neutral `Any` driver and is
//! parameterized by a named [`Statements`] set per relational backend
//! (SQLite, PostgreSQL, MySQL). Statement text can be overridden from an
//! external YAML document; unspecified statements keep their built-in
//! defaults.
//!
//! # Design Rules
//!
//! 1. Rows are never hard-deleted: `delete` stamps a tombstone, and every
//!    read path filters tombstoned rows on both sides of a join.
//! 2. `put` is an idempotent per-item upsert; a write resurrects a
//!    tombstoned row.
//! 3. Keys are stored as fixed-width lowercase hex, the same codec on the
//!    write path and in every join predicate.
//! 4. Reads go through a read-oriented pool, writes through a separate
//!    write pool; a store without a write pool is read-only.

pub mod connection;
pub mod error;
pub mod statements;
pub mod store;

pub use connection::{Backend, ConnectionError, DatabaseConfig, GraphPools};
pub use error::{StoreError, StoreResult};
pub use statements::{Dialect, StatementOverrides, Statements, StatementsError};
pub use store::GraphStore;
