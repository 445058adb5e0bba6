//! Relational backend selection and connection pooling.
//!
//! Backends form a small closed set resolved once at startup; unknown
//! names are rejected with an error naming the accepted set. Connections
//! go through sqlx's `Any` driver, so the backend choice only governs the
//! statement dialect — the pools themselves are backend-neutral.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::statements::Dialect;

/// The supported relational engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
    Mysql,
}

impl Backend {
    /// The DSN scheme the backend's driver expects.
    pub fn scheme(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
            Backend::Mysql => "mysql",
        }
    }

    /// The placeholder dialect of the backend's SQL flavor.
    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::Postgres => Dialect::Numbered,
            Backend::Sqlite | Backend::Mysql => Dialect::Positional,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Backend {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" => Ok(Backend::Postgres),
            "mysql" => Ok(Backend::Mysql),
            other => Err(ConnectionError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Connection configuration for the graph store's pools.
///
/// `rw_dsn` binds the write pool; omitting it opens the store read-only.
/// `ro_dsn` points reads at a separate pool (e.g. a replica); when absent,
/// reads share the write pool.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub rw_dsn: Option<String>,
    pub ro_dsn: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            rw_dsn: None,
            ro_dsn: None,
            max_connections: 5,
        }
    }

    pub fn rw_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.rw_dsn = Some(dsn.into());
        self
    }

    pub fn ro_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.ro_dsn = Some(dsn.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Open the configured pools.
    ///
    /// At least one DSN must be given, and each DSN's scheme must match
    /// the resolved backend.
    pub async fn connect(&self) -> Result<GraphPools, ConnectionError> {
        install_drivers();

        let rw = match &self.rw_dsn {
            Some(dsn) => Some(self.open_pool(dsn).await?),
            None => None,
        };

        let ro = match &self.ro_dsn {
            Some(dsn) => self.open_pool(dsn).await?,
            None => match &rw {
                Some(pool) => pool.clone(),
                None => return Err(ConnectionError::NoDsn),
            },
        };

        Ok(GraphPools { rw, ro })
    }

    async fn open_pool(&self, dsn: &str) -> Result<AnyPool, ConnectionError> {
        if !dsn.starts_with(self.backend.scheme()) {
            return Err(ConnectionError::SchemeMismatch {
                backend: self.backend,
                dsn: dsn.to_string(),
            });
        }
        Ok(AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(dsn)
            .await?)
    }
}

/// The read-write and read-oriented pools backing a graph store.
#[derive(Clone, Debug)]
pub struct GraphPools {
    /// Write pool; `None` makes the store read-only.
    pub rw: Option<AnyPool>,
    /// Read pool; may alias the write pool or point at a replica.
    pub ro: AnyPool,
}

/// Errors resolving a backend or opening its pools.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("{0} not supported, specify one of: sqlite, postgres, mysql")]
    UnsupportedBackend(String),

    #[error("no DSN configured: provide a read-write or read-only connection string")]
    NoDsn,

    #[error("DSN scheme does not match backend {backend}: {dsn}")]
    SchemeMismatch { backend: Backend, dsn: String },

    #[error("cannot open database pool: {0}")]
    Db(#[from] sqlx::Error),
}

/// Register the sqlx `Any` drivers exactly once per process.
pub fn install_drivers() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(sqlx::any::install_default_drivers);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_supported_backends() {
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("postgres".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("mysql".parse::<Backend>().unwrap(), Backend::Mysql);
    }

    #[test]
    fn unknown_backend_names_the_accepted_set() {
        let err = "oracle".parse::<Backend>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("oracle"));
        assert!(msg.contains("sqlite"));
        assert!(msg.contains("postgres"));
        assert!(msg.contains("mysql"));
    }

    #[test]
    fn dialect_per_backend() {
        assert_eq!(Backend::Postgres.dialect(), Dialect::Numbered);
        assert_eq!(Backend::Sqlite.dialect(), Dialect::Positional);
        assert_eq!(Backend::Mysql.dialect(), Dialect::Positional);
    }

    #[tokio::test]
    async fn connect_requires_a_dsn() {
        let result = DatabaseConfig::new(Backend::Sqlite).connect().await;
        assert!(matches!(result, Err(ConnectionError::NoDsn)));
    }

    #[tokio::test]
    async fn scheme_mismatch_is_rejected() {
        let result = DatabaseConfig::new(Backend::Postgres)
            .rw_dsn("sqlite::memory:")
            .connect()
            .await;
        assert!(matches!(result, Err(ConnectionError::SchemeMismatch { .. })));
    }

    #[tokio::test]
    async fn read_pool_aliases_write_pool_by_default() {
        let pools = DatabaseConfig::new(Backend::Sqlite)
            .rw_dsn("sqlite::memory:")
            .max_connections(1)
            .connect()
            .await
            .unwrap();
        assert!(pools.rw.is_some());
    }
}
