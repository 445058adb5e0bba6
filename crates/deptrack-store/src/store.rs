//! The SQL-backed graph store engine.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sqlx::any::AnyRow;
use sqlx::Row;

use deptrack_types::{Encoding, GraphItem, GraphItemPair, GraphKey};

use crate::connection::{Backend, DatabaseConfig, GraphPools};
use crate::error::{StoreError, StoreResult};
use crate::statements::{expand_edge_types, Dialect, Statements};

/// Graph storage engine over a single relational table.
///
/// Safely shared across concurrently handled requests: reads go through
/// the read pool, writes through the write pool, and no in-process locking
/// is added beyond what the relational engine provides. Concurrent writes
/// to the same identity race at the database layer; commit order wins.
pub struct GraphStore {
    rw: Option<sqlx::AnyPool>,
    ro: sqlx::AnyPool,
    statements: Statements,
    dialect: Dialect,
    traversal_queries: AtomicU64,
}

impl GraphStore {
    /// Construct a store over already-opened pools.
    ///
    /// Runs the create-table statement against the write pool when one is
    /// bound. Insert, delete, and list statements are finalized for the
    /// backend's dialect up front; traversal statements are finalized per
    /// call after edge-type expansion.
    pub async fn new(
        backend: Backend,
        pools: GraphPools,
        statements: Statements,
    ) -> StoreResult<Self> {
        let dialect = backend.dialect();
        let statements = Statements {
            create_graph_data_table: statements.create_graph_data_table.clone(),
            insert_graph_data: dialect.finalize(&statements.insert_graph_data),
            delete_graph_data: dialect.finalize(&statements.delete_graph_data),
            list_graph_data: dialect.finalize(&statements.list_graph_data),
            select_upstream: statements.select_upstream,
            select_downstream: statements.select_downstream,
        };

        if let Some(rw) = &pools.rw {
            sqlx::query(&statements.create_graph_data_table)
                .execute(rw)
                .await?;
        }

        Ok(Self {
            rw: pools.rw,
            ro: pools.ro,
            statements,
            dialect,
            traversal_queries: AtomicU64::new(0),
        })
    }

    /// Open a private in-memory SQLite store with default statements.
    ///
    /// For tests and embedding; a single-connection pool keeps the
    /// in-memory database alive and shared between reads and writes.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let pools = DatabaseConfig::new(Backend::Sqlite)
            .rw_dsn("sqlite::memory:")
            .max_connections(1)
            .connect()
            .await?;
        Self::new(Backend::Sqlite, pools, Statements::defaults(Backend::Sqlite)).await
    }

    /// Whether the store was opened without a write pool.
    pub fn is_read_only(&self) -> bool {
        self.rw.is_none()
    }

    /// Running count of one-hop traversal queries issued since open.
    pub fn traversal_queries(&self) -> u64 {
        self.traversal_queries.load(Ordering::Relaxed)
    }

    /// Idempotent per-item upsert.
    ///
    /// Identity is `(item_type, k1, k2, k3)`; a write replaces the prior
    /// row's payload and encoding, stamps `last_modified` with the call
    /// time, and clears any tombstone. Items are written independently: if
    /// any item fails the whole call reports a partial-insertion error
    /// after attempting (and logging) every item, so callers retry the
    /// whole batch.
    pub async fn put(&self, items: &[GraphItem]) -> StoreResult<()> {
        let rw = self.rw.as_ref().ok_or(StoreError::Unsupported)?;
        if items.is_empty() {
            return Ok(());
        }

        let stamp = Utc::now().timestamp();
        let mut failed = 0usize;

        for item in items {
            let result = sqlx::query(&self.statements.insert_graph_data)
                .bind(&item.item_type)
                .bind(item.k1.to_hex())
                .bind(item.k2.to_hex())
                .bind(item.k3.map(|k| k.to_hex()).unwrap_or_default())
                .bind(item.encoding.tag())
                .bind(String::from_utf8_lossy(&item.data).into_owned())
                .bind(stamp)
                .execute(rw)
                .await;

            if let Err(err) = result {
                tracing::error!(
                    error = %err,
                    item_type = %item.item_type,
                    k1 = %item.k1.short_hex(),
                    k2 = %item.k2.short_hex(),
                    "failed to put graph item"
                );
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(StoreError::PartialInsertion {
                failed,
                total: items.len(),
            });
        }
        Ok(())
    }

    /// Soft-delete items by `(item_type, k1, k2)`.
    ///
    /// Stamps `date_deleted`; rows are never removed. `k3` is not part of
    /// the match key, so every parallel edge between the pair is
    /// tombstoned together. Deleting an absent or already-deleted item is
    /// not an error. Batch policy matches [`put`](Self::put).
    pub async fn delete(&self, items: &[GraphItem]) -> StoreResult<()> {
        let rw = self.rw.as_ref().ok_or(StoreError::Unsupported)?;
        if items.is_empty() {
            return Ok(());
        }

        let stamp = Utc::now().timestamp();
        let mut failed = 0usize;

        for item in items {
            let result = sqlx::query(&self.statements.delete_graph_data)
                .bind(stamp)
                .bind(&item.item_type)
                .bind(item.k1.to_hex())
                .bind(item.k2.to_hex())
                .execute(rw)
                .await;

            if let Err(err) = result {
                tracing::error!(
                    error = %err,
                    item_type = %item.item_type,
                    k1 = %item.k1.short_hex(),
                    k2 = %item.k2.short_hex(),
                    "failed to delete graph item"
                );
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(StoreError::PartialDeletion {
                failed,
                total: items.len(),
            });
        }
        Ok(())
    }

    /// Paginated read of live items of one type.
    ///
    /// `page` floors to 1 and `count` clamps to `[10, 100]`; row order is
    /// store-defined and not stable across calls.
    pub async fn list(&self, item_type: &str, page: i32, count: i32) -> StoreResult<Vec<GraphItem>> {
        let page = i64::from(page.max(1));
        let limit = i64::from(count.clamp(10, 100));
        let offset = (page - 1) * limit;

        let rows = sqlx::query(&self.statements.list_graph_data)
            .bind(item_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.ro)
            .await?;

        rows.iter().map(|row| read_item(row, 0)).collect()
    }

    /// One hop forward: live `(node, edge)` pairs reachable by following
    /// outgoing edges of the given types from `key` — "what does `key`
    /// depend on".
    pub async fn find_upstream(
        &self,
        key: &GraphKey,
        edge_types: &[String],
    ) -> StoreResult<Vec<GraphItemPair>> {
        self.find(&self.statements.select_upstream, key, edge_types)
            .await
    }

    /// One hop backward: live `(node, edge)` pairs whose edges of the
    /// given types point at `key` — "what depends on `key`".
    pub async fn find_downstream(
        &self,
        key: &GraphKey,
        edge_types: &[String],
    ) -> StoreResult<Vec<GraphItemPair>> {
        self.find(&self.statements.select_downstream, key, edge_types)
            .await
    }

    async fn find(
        &self,
        template: &str,
        key: &GraphKey,
        edge_types: &[String],
    ) -> StoreResult<Vec<GraphItemPair>> {
        // An empty IN () list is invalid SQL on every backend.
        if edge_types.is_empty() {
            return Ok(Vec::new());
        }
        self.traversal_queries.fetch_add(1, Ordering::Relaxed);

        let sql = self
            .dialect
            .finalize(&expand_edge_types(template, edge_types.len()));

        let mut query = sqlx::query(&sql).bind(key.to_hex());
        for edge_type in edge_types {
            query = query.bind(edge_type);
        }

        let rows = query.fetch_all(&self.ro).await?;
        rows.iter()
            .map(|row| {
                Ok(GraphItemPair {
                    node: read_item(row, 0)?,
                    edge: read_item(row, 6)?,
                })
            })
            .collect()
    }
}

/// Map six columns starting at `offset` back into a graph item.
fn read_item(row: &AnyRow, offset: usize) -> StoreResult<GraphItem> {
    let item_type: String = row.try_get(offset)?;
    let k1: String = row.try_get(offset + 1)?;
    let k2: String = row.try_get(offset + 2)?;
    let k3: String = row.try_get(offset + 3)?;
    let encoding: i32 = row.try_get(offset + 4)?;
    let data: String = row.try_get(offset + 5)?;

    Ok(GraphItem {
        item_type,
        k1: GraphKey::from_hex(&k1).map_err(StoreError::CorruptRow)?,
        k2: GraphKey::from_hex(&k2).map_err(StoreError::CorruptRow)?,
        // PostgreSQL blank-pads CHAR columns, so an operator-supplied
        // schema may hand back the '' sentinel as 64 spaces.
        k3: match k3.trim_end() {
            "" => None,
            hex => Some(GraphKey::from_hex(hex).map_err(StoreError::CorruptRow)?),
        },
        encoding: Encoding::from_tag(encoding).map_err(StoreError::CorruptRow)?,
        data: data.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deptrack_keys::derive_key;
    use deptrack_types::{encode_payload, Module, DEPENDS_TYPE, MODULE_TYPE};

    async fn store() -> GraphStore {
        GraphStore::open_in_memory().await.unwrap()
    }

    fn module_node(name: &str) -> GraphItem {
        let module = Module {
            language: "go".into(),
            organization: "deptrack".into(),
            module: name.into(),
        };
        let key = derive_key(&[&module.language, &module.organization, &module.module]);
        GraphItem::node(MODULE_TYPE, key, encode_payload(&module).unwrap())
    }

    fn depends_edge(from: &GraphItem, to: &GraphItem) -> GraphItem {
        GraphItem::edge(DEPENDS_TYPE, from.k1, to.k1, None, b"{}".to_vec())
    }

    fn depends(edge_types: bool) -> Vec<String> {
        if edge_types {
            vec![DEPENDS_TYPE.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Seed A -> B -> C with module self-loops and depends edges.
    async fn seed_chain(gs: &GraphStore) -> (GraphItem, GraphItem, GraphItem) {
        let a = module_node("a");
        let b = module_node("b");
        let c = module_node("c");
        gs.put(&[
            a.clone(),
            b.clone(),
            c.clone(),
            depends_edge(&a, &b),
            depends_edge(&b, &c),
        ])
        .await
        .unwrap();
        (a, b, c)
    }

    #[tokio::test]
    async fn empty_put_and_delete_are_noops() {
        let gs = store().await;
        gs.put(&[]).await.unwrap();
        gs.delete(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn put_then_list_roundtrip() {
        let gs = store().await;
        let node = module_node("core");
        gs.put(std::slice::from_ref(&node)).await.unwrap();

        let items = gs.list(MODULE_TYPE, 1, 10).await.unwrap();
        assert_eq!(items, vec![node]);
    }

    #[tokio::test]
    async fn put_replaces_payload_in_place() {
        let gs = store().await;
        let mut node = module_node("core");
        gs.put(std::slice::from_ref(&node)).await.unwrap();

        node.data = br#"{"language":"go","organization":"deptrack","module":"core","scopes":["test"]}"#
            .to_vec();
        gs.put(std::slice::from_ref(&node)).await.unwrap();

        let items = gs.list(MODULE_TYPE, 1, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data, node.data);
    }

    #[tokio::test]
    async fn read_only_store_rejects_writes() {
        let pools = DatabaseConfig::new(Backend::Sqlite)
            .rw_dsn("sqlite::memory:")
            .max_connections(1)
            .connect()
            .await
            .unwrap();
        let ro_pools = GraphPools {
            rw: None,
            ro: pools.ro.clone(),
        };
        let gs = GraphStore::new(Backend::Sqlite, ro_pools, Statements::defaults(Backend::Sqlite))
            .await
            .unwrap();

        assert!(gs.is_read_only());
        let node = module_node("core");
        assert!(matches!(
            gs.put(std::slice::from_ref(&node)).await,
            Err(StoreError::Unsupported)
        ));
        assert!(matches!(
            gs.delete(std::slice::from_ref(&node)).await,
            Err(StoreError::Unsupported)
        ));
    }

    #[tokio::test]
    async fn idempotent_delete() {
        let gs = store().await;
        let node = module_node("core");
        gs.put(std::slice::from_ref(&node)).await.unwrap();

        gs.delete(std::slice::from_ref(&node)).await.unwrap();
        gs.delete(std::slice::from_ref(&node)).await.unwrap();
        // Deleting something that never existed is fine too.
        gs.delete(&[module_node("ghost")]).await.unwrap();

        assert!(gs.list(MODULE_TYPE, 1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_resurrects_tombstoned_item() {
        let gs = store().await;
        let (a, b, _) = seed_chain(&gs).await;

        gs.delete(std::slice::from_ref(&b)).await.unwrap();
        assert!(gs
            .find_upstream(&a.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());

        gs.put(std::slice::from_ref(&b)).await.unwrap();
        let pairs = gs.find_upstream(&a.k1, &depends(true)).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].node.k1, b.k1);
        assert_eq!(gs.list(MODULE_TYPE, 1, 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn traversal_directionality() {
        let gs = store().await;
        let (a, b, c) = seed_chain(&gs).await;

        let up_a = gs.find_upstream(&a.k1, &depends(true)).await.unwrap();
        assert_eq!(up_a.len(), 1);
        assert_eq!(up_a[0].node.k1, b.k1);
        assert_eq!(up_a[0].edge.k1, a.k1);
        assert_eq!(up_a[0].edge.k2, b.k1);

        let down_c = gs.find_downstream(&c.k1, &depends(true)).await.unwrap();
        assert_eq!(down_c.len(), 1);
        assert_eq!(down_c[0].node.k1, b.k1);

        assert!(gs
            .find_upstream(&c.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());
        assert!(gs
            .find_downstream(&a.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn multi_edge_k3_disambiguation() {
        let gs = store().await;
        let a = module_node("a");
        let b = module_node("b");
        let k3_one = derive_key(&["declaration-1"]);
        let k3_two = derive_key(&["declaration-2"]);
        let edge_one = GraphItem::edge(DEPENDS_TYPE, a.k1, b.k1, Some(k3_one), b"{}".to_vec());
        let edge_two = GraphItem::edge(DEPENDS_TYPE, a.k1, b.k1, Some(k3_two), b"{}".to_vec());

        gs.put(&[a.clone(), b.clone(), edge_one, edge_two])
            .await
            .unwrap();

        let pairs = gs.find_upstream(&a.k1, &depends(true)).await.unwrap();
        assert_eq!(pairs.len(), 2);
        let k3s: Vec<_> = pairs.iter().map(|p| p.edge.k3.unwrap()).collect();
        assert!(k3s.contains(&k3_one));
        assert!(k3s.contains(&k3_two));

        // Delete matches (type, k1, k2) only: both parallel edges go.
        gs.delete(&[GraphItem::edge(DEPENDS_TYPE, a.k1, b.k1, None, vec![])])
            .await
            .unwrap();
        assert!(gs
            .find_upstream(&a.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn blank_padded_k3_reads_as_absent() {
        let pools = DatabaseConfig::new(Backend::Sqlite)
            .rw_dsn("sqlite::memory:")
            .max_connections(1)
            .connect()
            .await
            .unwrap();
        let raw = pools.ro.clone();
        let gs = GraphStore::new(Backend::Sqlite, pools, Statements::defaults(Backend::Sqlite))
            .await
            .unwrap();

        // A CHAR-typed k3 column comes back blank-padded from PostgreSQL;
        // seed the padded shape directly and read it through the store.
        let node = module_node("core");
        sqlx::query(
            "INSERT INTO graph_data \
             (item_type, k1, k2, k3, encoding, item_data, last_modified, date_deleted) \
             VALUES (?, ?, ?, ?, ?, ?, ?, NULL);",
        )
        .bind(MODULE_TYPE)
        .bind(node.k1.to_hex())
        .bind(node.k2.to_hex())
        .bind(" ".repeat(64))
        .bind(Encoding::Json.tag())
        .bind(String::from_utf8_lossy(&node.data).into_owned())
        .bind(0i64)
        .execute(&raw)
        .await
        .unwrap();

        let items = gs.list(MODULE_TYPE, 1, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].k3.is_none());
    }

    #[tokio::test]
    async fn pagination_bounds() {
        let gs = store().await;
        let nodes: Vec<GraphItem> = (0..15).map(|i| module_node(&format!("m{i}"))).collect();
        gs.put(&nodes).await.unwrap();

        // page 0 floors to 1, count 1000 clamps to 100.
        assert_eq!(gs.list(MODULE_TYPE, 0, 1000).await.unwrap().len(), 15);
        // count 1 clamps to 10.
        assert_eq!(gs.list(MODULE_TYPE, 1, 1).await.unwrap().len(), 10);
        // second page picks up the remainder.
        assert_eq!(gs.list(MODULE_TYPE, 2, 1).await.unwrap().len(), 5);
        assert_eq!(gs.list(MODULE_TYPE, 3, 1).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn soft_delete_excludes_from_all_reads() {
        let gs = store().await;
        let (a, b, c) = seed_chain(&gs).await;

        // Tombstoned node never appears as the node side of a pair.
        gs.delete(std::slice::from_ref(&b)).await.unwrap();
        assert_eq!(gs.list(MODULE_TYPE, 1, 10).await.unwrap().len(), 2);
        assert!(gs
            .find_upstream(&a.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());
        assert!(gs
            .find_downstream(&c.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());

        // Tombstoned edge never appears even when both nodes are live.
        gs.put(std::slice::from_ref(&b)).await.unwrap();
        gs.delete(&[depends_edge(&b, &c)]).await.unwrap();
        assert!(gs
            .find_upstream(&b.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn edge_without_node_self_loop_is_unresolvable() {
        let gs = store().await;
        let a = module_node("a");
        let b = module_node("b");
        // The edge exists, but b has no self-loop row.
        gs.put(&[a.clone(), depends_edge(&a, &b)]).await.unwrap();
        assert!(gs
            .find_upstream(&a.k1, &depends(true))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn empty_edge_type_list_finds_nothing() {
        let gs = store().await;
        let (a, _, _) = seed_chain(&gs).await;
        assert!(gs
            .find_upstream(&a.k1, &depends(false))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn multiple_edge_types_in_one_traversal() {
        let gs = store().await;
        let a = module_node("a");
        let b = module_node("b");
        let managed = GraphItem::edge("manages", a.k1, b.k1, None, b"{}".to_vec());
        gs.put(&[a.clone(), b.clone(), depends_edge(&a, &b), managed])
            .await
            .unwrap();

        let pairs = gs
            .find_upstream(
                &a.k1,
                &["depends".to_string(), "manages".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[tokio::test]
    async fn list_is_scoped_to_item_type() {
        let gs = store().await;
        let (a, b, _) = seed_chain(&gs).await;
        let _ = (a, b);
        assert_eq!(gs.list(MODULE_TYPE, 1, 10).await.unwrap().len(), 3);
        assert_eq!(gs.list(DEPENDS_TYPE, 1, 10).await.unwrap().len(), 2);
        assert!(gs.list("source", 1, 10).await.unwrap().is_empty());
    }
}
