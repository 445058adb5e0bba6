//! Named SQL statement sets, one per relational backend.
//!
//! Statement text is written with `?` placeholders and an `{edge_types}`
//! expansion token for the traversal `IN (...)` clause. The store expands
//! the token to one placeholder per edge type at query time, then lets the
//! [`Dialect`] rewrite placeholders into the backend's native syntax
//! (`$1..$n` for PostgreSQL).

use std::path::Path;

use serde::Deserialize;

use crate::connection::Backend;

/// Placeholder syntax of a relational backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// `?` positional placeholders (SQLite, MySQL).
    Positional,
    /// `$1..$n` numbered placeholders (PostgreSQL).
    Numbered,
}

impl Dialect {
    /// Rewrite `?` placeholders into the dialect's native form.
    pub fn finalize(&self, sql: &str) -> String {
        match self {
            Dialect::Positional => sql.to_string(),
            Dialect::Numbered => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut n = 0usize;
                for ch in sql.chars() {
                    if ch == '?' {
                        n += 1;
                        out.push('$');
                        out.push_str(&n.to_string());
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }
}

/// Expand the `{edge_types}` token into `n` comma-separated placeholders.
pub fn expand_edge_types(sql: &str, n: usize) -> String {
    let list = vec!["?"; n].join(", ");
    sql.replace("{edge_types}", &list)
}

const CREATE_GRAPH_DATA_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS graph_data(
    item_type VARCHAR(55) NOT NULL,
    k1 CHAR(64) NOT NULL,
    k2 CHAR(64) NOT NULL,
    k3 VARCHAR(64) NOT NULL DEFAULT '',
    encoding SMALLINT NOT NULL,
    item_data TEXT NOT NULL,
    last_modified BIGINT NOT NULL,
    date_deleted BIGINT DEFAULT NULL,
    PRIMARY KEY (item_type, k1, k2, k3)
);";

const INSERT_GRAPH_DATA: &str = "\
INSERT INTO graph_data
(item_type, k1, k2, k3, encoding, item_data, last_modified, date_deleted)
VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
ON CONFLICT (item_type, k1, k2, k3) DO UPDATE SET
encoding = excluded.encoding,
item_data = excluded.item_data,
last_modified = excluded.last_modified,
date_deleted = NULL;";

const INSERT_GRAPH_DATA_MYSQL: &str = "\
INSERT INTO graph_data
(item_type, k1, k2, k3, encoding, item_data, last_modified, date_deleted)
VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
ON DUPLICATE KEY UPDATE
encoding = VALUES(encoding),
item_data = VALUES(item_data),
last_modified = VALUES(last_modified),
date_deleted = NULL;";

const DELETE_GRAPH_DATA: &str = "\
UPDATE graph_data
SET date_deleted = ?
WHERE item_type = ? AND k1 = ? AND k2 = ?;";

const LIST_GRAPH_DATA: &str = "\
SELECT item_type, k1, k2, k3, encoding, item_data
FROM graph_data
WHERE item_type = ? AND date_deleted IS NULL
LIMIT ? OFFSET ?;";

const SELECT_UPSTREAM: &str = "\
SELECT g1.item_type, g1.k1, g1.k2, g1.k3, g1.encoding, g1.item_data,
       g2.item_type, g2.k1, g2.k2, g2.k3, g2.encoding, g2.item_data
FROM graph_data AS g1
INNER JOIN graph_data AS g2 ON g1.k1 = g2.k2
WHERE g2.k1 = ?
AND g2.item_type IN ({edge_types})
AND g2.k1 != g2.k2
AND g2.date_deleted IS NULL
AND g1.k1 = g1.k2
AND g1.date_deleted IS NULL;";

const SELECT_DOWNSTREAM: &str = "\
SELECT g1.item_type, g1.k1, g1.k2, g1.k3, g1.encoding, g1.item_data,
       g2.item_type, g2.k1, g2.k2, g2.k3, g2.encoding, g2.item_data
FROM graph_data AS g1
INNER JOIN graph_data AS g2 ON g1.k2 = g2.k1
WHERE g2.k2 = ?
AND g2.item_type IN ({edge_types})
AND g2.k1 != g2.k2
AND g2.date_deleted IS NULL
AND g1.k1 = g1.k2
AND g1.date_deleted IS NULL;";

/// The named SQL statements a [`GraphStore`](crate::GraphStore) runs.
///
/// An explicitly constructed, immutable value: build the per-backend
/// defaults with [`Statements::defaults`], then optionally merge an
/// override document with [`Statements::with_overrides`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statements {
    pub create_graph_data_table: String,
    pub insert_graph_data: String,
    pub delete_graph_data: String,
    pub list_graph_data: String,
    pub select_upstream: String,
    pub select_downstream: String,
}

impl Statements {
    /// The built-in statement set for a backend.
    ///
    /// SQLite and PostgreSQL share the standard-conflict upsert; MySQL
    /// substitutes its `ON DUPLICATE KEY UPDATE` form.
    pub fn defaults(backend: Backend) -> Self {
        let insert = match backend {
            Backend::Mysql => INSERT_GRAPH_DATA_MYSQL,
            Backend::Sqlite | Backend::Postgres => INSERT_GRAPH_DATA,
        };
        Self {
            create_graph_data_table: CREATE_GRAPH_DATA_TABLE.to_string(),
            insert_graph_data: insert.to_string(),
            delete_graph_data: DELETE_GRAPH_DATA.to_string(),
            list_graph_data: LIST_GRAPH_DATA.to_string(),
            select_upstream: SELECT_UPSTREAM.to_string(),
            select_downstream: SELECT_DOWNSTREAM.to_string(),
        }
    }

    /// Merge an override set field-wise; absent overrides keep defaults.
    pub fn with_overrides(mut self, overrides: StatementOverrides) -> Self {
        if let Some(s) = overrides.create_graph_data_table {
            self.create_graph_data_table = s;
        }
        if let Some(s) = overrides.insert_graph_data {
            self.insert_graph_data = s;
        }
        if let Some(s) = overrides.delete_graph_data {
            self.delete_graph_data = s;
        }
        if let Some(s) = overrides.list_graph_data {
            self.list_graph_data = s;
        }
        if let Some(s) = overrides.select_upstream {
            self.select_upstream = s;
        }
        if let Some(s) = overrides.select_downstream {
            self.select_downstream = s;
        }
        self
    }
}

/// Replacement SQL text loaded from an external YAML document.
///
/// Every field is optional; a document may override a single statement.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatementOverrides {
    pub create_graph_data_table: Option<String>,
    pub insert_graph_data: Option<String>,
    pub delete_graph_data: Option<String>,
    pub list_graph_data: Option<String>,
    pub select_upstream: Option<String>,
    pub select_downstream: Option<String>,
}

impl StatementOverrides {
    /// Parse an override document.
    pub fn parse(contents: &str) -> Result<Self, StatementsError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load an override document from a file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, StatementsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }
}

/// Errors loading a statement-override document.
#[derive(Debug, thiserror::Error)]
pub enum StatementsError {
    #[error("cannot read statements file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed statements document: {0}")]
    Parse(#[from] serde_yaml::Error),
}
