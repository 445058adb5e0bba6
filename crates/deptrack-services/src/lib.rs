//! Domain services over the deptrack graph store.
//!
//! The store knows only generic graph items and single-hop traversal; this
//! crate layers domain semantics on top:
//!
//! - [`DependencyService`] — one-hop typed lookups: "what does this module
//!   depend on" and "what depends on this module".
//! - [`TopologyService`] — multi-hop reachability composed from repeated
//!   one-hop queries, streamed to the caller flat or grouped by BFS tier.
//! - [`RegistryService`] — source tracking plus source/module listings and
//!   `manages`-edge cross-lookups.

pub mod dependency;
pub mod error;
pub mod registry;
pub mod topology;

pub use dependency::{Dependency, DependencyRequest, DependencyService};
pub use error::{ServiceError, ServiceResult};
pub use registry::{ManagedModule, ManagingSource, RegistryService, TrackRequest};
pub use topology::{Direction, Tier, TopologyService};
