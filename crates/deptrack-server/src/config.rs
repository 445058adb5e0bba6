use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ServerResult;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Relational engine name: one of `sqlite`, `postgres`, `mysql`.
    pub backend: String,
    /// Read-write connection string; omit for a read-only deployment.
    pub rw_dsn: Option<String>,
    /// Separate read connection string (e.g. a replica).
    pub ro_dsn: Option<String>,
    /// Optional YAML document overriding individual SQL statements.
    pub statements_file: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7785".parse().unwrap(),
            backend: "sqlite".to_string(),
            rw_dsn: Some("sqlite:deptrack.db?mode=rwc".to_string()),
            ro_dsn: None,
            statements_file: None,
            max_connections: 5,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
