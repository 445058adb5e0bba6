//! Multi-hop topology traversal, streamed.
//!
//! The store only answers one-hop questions; this module composes repeated
//! one-hop queries into a bounded reachability walk. Traversal is
//! breadth-first with a visited set keyed by node key, so dependency cycles
//! terminate and a node reachable via multiple paths is emitted once, at
//! the depth of its first discovery.
//!
//! Results are streamed incrementally over a channel rather than buffered:
//! a caller observes partial topology before the walk completes, and
//! dropping the receiving end cancels the walk promptly (the channel is
//! checked before every hop, so no further one-hop queries are issued). A traversal holds no state
//! beyond its own request: pending until the task starts, expanding while
//! the frontier is non-empty, draining once it empties, and failed on the
//! first store error — which is delivered as the stream's final item.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use deptrack_store::{GraphStore, StoreError};
use deptrack_types::{GraphItemPair, GraphKey, DEPENDS_TYPE};

use crate::error::ServiceResult;

/// Which way a walk follows edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Outgoing edges: what the root depends on.
    Dependencies,
    /// Incoming edges: what depends on the root.
    Dependents,
}

/// One BFS depth level of a tiered traversal.
///
/// Tier 0 holds the root's direct neighbors; tier N holds every
/// not-yet-visited node reachable in exactly N+1 hops.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tier {
    pub depth: u32,
    pub pairs: Vec<GraphItemPair>,
}

/// Size of the bounded channel between the walking task and the caller.
const CHANNEL_CAPACITY: usize = 32;

/// Composes one-hop store queries into streamed multi-hop traversals.
#[derive(Clone)]
pub struct TopologyService {
    store: Arc<GraphStore>,
    edge_types: Vec<String>,
}

impl TopologyService {
    /// A service walking `depends` edges.
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            store,
            edge_types: vec![DEPENDS_TYPE.to_string()],
        }
    }

    /// Override the edge types the walk follows.
    pub fn with_edge_types(mut self, edge_types: Vec<String>) -> Self {
        self.edge_types = edge_types;
        self
    }

    /// Flat forward reachability from `root`, one pair per discovered node.
    pub fn dependencies_topology(
        &self,
        root: GraphKey,
    ) -> ReceiverStream<ServiceResult<GraphItemPair>> {
        self.walk(root, Direction::Dependencies)
    }

    /// Flat backward reachability into `root`.
    pub fn dependents_topology(
        &self,
        root: GraphKey,
    ) -> ReceiverStream<ServiceResult<GraphItemPair>> {
        self.walk(root, Direction::Dependents)
    }

    /// Forward reachability grouped and streamed per BFS depth level.
    pub fn dependencies_topology_tiered(
        &self,
        root: GraphKey,
    ) -> ReceiverStream<ServiceResult<Tier>> {
        self.walk_tiered(root, Direction::Dependencies)
    }

    /// Backward reachability grouped and streamed per BFS depth level.
    pub fn dependents_topology_tiered(
        &self,
        root: GraphKey,
    ) -> ReceiverStream<ServiceResult<Tier>> {
        self.walk_tiered(root, Direction::Dependents)
    }

    fn walk(&self, root: GraphKey, direction: Direction) -> ReceiverStream<ServiceResult<GraphItemPair>> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let store = Arc::clone(&self.store);
        let edge_types = self.edge_types.clone();

        tokio::spawn(async move {
            let mut visited: HashSet<GraphKey> = HashSet::new();
            visited.insert(root);
            let mut frontier = vec![root];

            while !frontier.is_empty() {
                let mut next = Vec::new();
                for key in frontier {
                    // Receiver dropped: caller cancelled, stop querying.
                    if tx.is_closed() {
                        return;
                    }
                    let pairs = match hop(&store, &key, &edge_types, direction).await {
                        Ok(pairs) => pairs,
                        Err(err) => {
                            tracing::debug!(
                                root = %root.short_hex(),
                                error = %err,
                                "topology walk failed"
                            );
                            let _ = tx.send(Err(err.into())).await;
                            return;
                        }
                    };
                    for pair in pairs {
                        if visited.insert(pair.node.k1) {
                            next.push(pair.node.k1);
                            if tx.send(Ok(pair)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                frontier = next;
            }
        });

        ReceiverStream::new(rx)
    }

    fn walk_tiered(&self, root: GraphKey, direction: Direction) -> ReceiverStream<ServiceResult<Tier>> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let store = Arc::clone(&self.store);
        let edge_types = self.edge_types.clone();

        tokio::spawn(async move {
            let mut visited: HashSet<GraphKey> = HashSet::new();
            visited.insert(root);
            let mut frontier = vec![root];
            let mut depth = 0u32;

            while !frontier.is_empty() {
                let mut next = Vec::new();
                let mut pairs_at_depth = Vec::new();

                for key in frontier {
                    // Tiers send once per level; without this check a
                    // dropped receiver would only be noticed after the
                    // whole level was expanded.
                    if tx.is_closed() {
                        return;
                    }
                    let pairs = match hop(&store, &key, &edge_types, direction).await {
                        Ok(pairs) => pairs,
                        Err(err) => {
                            tracing::debug!(
                                root = %root.short_hex(),
                                error = %err,
                                "tiered topology walk failed"
                            );
                            let _ = tx.send(Err(err.into())).await;
                            return;
                        }
                    };
                    for pair in pairs {
                        // First discovery assigns the tier; later paths to
                        // the same node are dropped.
                        if visited.insert(pair.node.k1) {
                            next.push(pair.node.k1);
                            pairs_at_depth.push(pair);
                        }
                    }
                }

                if !pairs_at_depth.is_empty() {
                    let tier = Tier {
                        depth,
                        pairs: pairs_at_depth,
                    };
                    if tx.send(Ok(tier)).await.is_err() {
                        return;
                    }
                }

                depth += 1;
                frontier = next;
            }
        });

        ReceiverStream::new(rx)
    }
}

async fn hop(
    store: &GraphStore,
    key: &GraphKey,
    edge_types: &[String],
    direction: Direction,
) -> Result<Vec<GraphItemPair>, StoreError> {
    match direction {
        Direction::Dependencies => store.find_upstream(key, edge_types).await,
        Direction::Dependents => store.find_downstream(key, edge_types).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deptrack_keys::derive_key;
    use deptrack_store::{Backend, DatabaseConfig, GraphPools, Statements};
    use deptrack_types::{GraphItem, MODULE_TYPE};
    use tokio_stream::StreamExt;

    fn node(name: &str) -> GraphItem {
        GraphItem::node(MODULE_TYPE, derive_key(&[name]), b"{}".to_vec())
    }

    fn edge(from: &str, to: &str) -> GraphItem {
        GraphItem::edge(
            DEPENDS_TYPE,
            derive_key(&[from]),
            derive_key(&[to]),
            None,
            b"{}".to_vec(),
        )
    }

    async fn service(items: Vec<GraphItem>) -> TopologyService {
        let store = Arc::new(GraphStore::open_in_memory().await.unwrap());
        store.put(&items).await.unwrap();
        TopologyService::new(store)
    }

    fn names(pairs: &[GraphItemPair]) -> HashSet<GraphKey> {
        pairs.iter().map(|p| p.node.k1).collect()
    }

    #[tokio::test]
    async fn flat_walk_streams_transitive_closure() {
        let svc = service(vec![
            node("a"),
            node("b"),
            node("c"),
            edge("a", "b"),
            edge("b", "c"),
        ])
        .await;

        let pairs: Vec<GraphItemPair> = svc
            .dependencies_topology(derive_key(&["a"]))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(pairs.len(), 2);
        assert_eq!(
            names(&pairs),
            HashSet::from([derive_key(&["b"]), derive_key(&["c"])])
        );
    }

    #[tokio::test]
    async fn cycle_terminates_and_visits_once() {
        let svc = service(vec![
            node("a"),
            node("b"),
            edge("a", "b"),
            edge("b", "a"),
        ])
        .await;

        let pairs: Vec<GraphItemPair> = svc
            .dependencies_topology(derive_key(&["a"]))
            .map(|r| r.unwrap())
            .collect()
            .await;

        // The root is never re-emitted; b appears exactly once.
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].node.k1, derive_key(&["b"]));
    }

    #[tokio::test]
    async fn diamond_emits_shared_node_once() {
        let svc = service(vec![
            node("a"),
            node("b"),
            node("c"),
            node("d"),
            edge("a", "b"),
            edge("a", "c"),
            edge("b", "d"),
            edge("c", "d"),
        ])
        .await;

        let pairs: Vec<GraphItemPair> = svc
            .dependencies_topology(derive_key(&["a"]))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(pairs.len(), 3);
    }

    #[tokio::test]
    async fn tiers_group_by_first_discovery_depth() {
        let svc = service(vec![
            node("a"),
            node("b"),
            node("c"),
            node("d"),
            edge("a", "b"),
            edge("a", "c"),
            edge("b", "d"),
            edge("c", "d"),
        ])
        .await;

        let tiers: Vec<Tier> = svc
            .dependencies_topology_tiered(derive_key(&["a"]))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].depth, 0);
        assert_eq!(
            names(&tiers[0].pairs),
            HashSet::from([derive_key(&["b"]), derive_key(&["c"])])
        );
        assert_eq!(tiers[1].depth, 1);
        // d appears only once, in the tier of its first discovery.
        assert_eq!(tiers[1].pairs.len(), 1);
        assert_eq!(tiers[1].pairs[0].node.k1, derive_key(&["d"]));
    }

    #[tokio::test]
    async fn dependents_walk_goes_backward() {
        let svc = service(vec![
            node("a"),
            node("b"),
            node("c"),
            edge("a", "b"),
            edge("b", "c"),
        ])
        .await;

        let pairs: Vec<GraphItemPair> = svc
            .dependents_topology(derive_key(&["c"]))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(
            names(&pairs),
            HashSet::from([derive_key(&["a"]), derive_key(&["b"])])
        );
    }

    #[tokio::test]
    async fn store_error_is_the_final_stream_item() {
        // A statement set whose traversal SQL is broken makes every hop fail.
        let pools = DatabaseConfig::new(Backend::Sqlite)
            .rw_dsn("sqlite::memory:")
            .max_connections(1)
            .connect()
            .await
            .unwrap();
        let mut statements = Statements::defaults(Backend::Sqlite);
        statements.select_upstream = "SELECT malformed FROM nowhere WHERE ? IN ({edge_types});".into();
        let store = Arc::new(
            GraphStore::new(Backend::Sqlite, GraphPools { rw: pools.rw, ro: pools.ro }, statements)
                .await
                .unwrap(),
        );
        let svc = TopologyService::new(store);

        let results: Vec<ServiceResult<GraphItemPair>> = svc
            .dependencies_topology(derive_key(&["a"]))
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    async fn chain_store() -> Arc<GraphStore> {
        let store = Arc::new(GraphStore::open_in_memory().await.unwrap());
        store
            .put(&[
                node("a"),
                node("b"),
                node("c"),
                edge("a", "b"),
                edge("b", "c"),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_further_queries() {
        let store = chain_store().await;
        let svc = TopologyService::new(Arc::clone(&store));

        let stream = svc.dependencies_topology(derive_key(&["a"]));
        drop(stream);
        // Let the walking task run; it must observe the closed channel
        // before issuing its first hop.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.traversal_queries(), 0);
    }

    #[tokio::test]
    async fn dropping_the_tiered_stream_stops_further_queries() {
        let store = chain_store().await;
        let svc = TopologyService::new(Arc::clone(&store));

        let stream = svc.dependencies_topology_tiered(derive_key(&["a"]));
        drop(stream);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.traversal_queries(), 0);
    }

    #[tokio::test]
    async fn empty_graph_streams_nothing() {
        let svc = service(vec![node("a")]).await;
        let pairs: Vec<ServiceResult<GraphItemPair>> = svc
            .dependencies_topology(derive_key(&["a"]))
            .collect()
            .await;
        assert!(pairs.is_empty());
    }
}
