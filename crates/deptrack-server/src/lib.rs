//! REST translation edge for deptrack.
//!
//! A thin axum layer mapping HTTP verbs and paths onto the registry,
//! dependency, and topology services. One-hop lookups answer with a
//! single JSON body;
//! topology walks answer with newline-delimited JSON streamed as the
//! traversal progresses, so a client observes partial topology before the
//! walk completes and a dropped connection cancels it.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::{AppState, DeptrackServer};
