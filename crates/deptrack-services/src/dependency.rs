//! One-hop typed dependency lookups.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use deptrack_keys::key_for_module;
use deptrack_store::GraphStore;
use deptrack_types::{
    decode, Depends, GraphEntity, GraphItemPair, GraphKey, Module, DEPENDS_TYPE,
};

use crate::error::{ServiceError, ServiceResult};

/// Identifies the module a lookup starts from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub language: String,
    pub organization: String,
    pub module: String,
}

impl DependencyRequest {
    /// The graph key of the requested module.
    pub fn key(&self) -> GraphKey {
        key_for_module(&Module {
            language: self.language.clone(),
            organization: self.organization.clone(),
            module: self.module.clone(),
        })
    }
}

/// One resolved dependency relationship: the neighboring module and the
/// dependency declaration that connects it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dependency {
    pub module: Module,
    pub depends: Depends,
}

/// Maps domain dependency requests onto graph keys and edge types, calls
/// the store, and decodes generic items back into typed records.
#[derive(Clone)]
pub struct DependencyService {
    store: Arc<GraphStore>,
}

impl DependencyService {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// What the requested module depends on — one hop forward.
    pub async fn list_dependencies(
        &self,
        req: &DependencyRequest,
    ) -> ServiceResult<Vec<Dependency>> {
        let key = req.key();
        let pairs = self
            .store
            .find_upstream(&key, &[DEPENDS_TYPE.to_string()])
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, module = %req.module, "dependency lookup failed");
                ServiceError::ModuleNotFound
            })?;
        pairs.iter().map(dependency_from_pair).collect()
    }

    /// What depends on the requested module — one hop backward.
    pub async fn list_dependents(
        &self,
        req: &DependencyRequest,
    ) -> ServiceResult<Vec<Dependency>> {
        let key = req.key();
        let pairs = self
            .store
            .find_downstream(&key, &[DEPENDS_TYPE.to_string()])
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, module = %req.module, "dependent lookup failed");
                ServiceError::ModuleNotFound
            })?;
        pairs.iter().map(dependency_from_pair).collect()
    }
}

fn dependency_from_pair(pair: &GraphItemPair) -> ServiceResult<Dependency> {
    let module = match decode(&pair.node)? {
        GraphEntity::Module(m) => m,
        _ => {
            return Err(ServiceError::UnexpectedEntity {
                item_type: pair.node.item_type.clone(),
            })
        }
    };
    let depends = match decode(&pair.edge)? {
        GraphEntity::Depends(d) => d,
        _ => {
            return Err(ServiceError::UnexpectedEntity {
                item_type: pair.edge.item_type.clone(),
            })
        }
    };
    Ok(Dependency { module, depends })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deptrack_types::{encode_payload, GraphItem, MODULE_TYPE};

    fn module(name: &str) -> Module {
        Module {
            language: "go".into(),
            organization: "deptrack".into(),
            module: name.into(),
        }
    }

    fn request(name: &str) -> DependencyRequest {
        DependencyRequest {
            language: "go".into(),
            organization: "deptrack".into(),
            module: name.into(),
        }
    }

    fn node(m: &Module) -> GraphItem {
        GraphItem::node(MODULE_TYPE, key_for_module(m), encode_payload(m).unwrap())
    }

    fn edge(from: &Module, to: &Module) -> GraphItem {
        let depends = Depends {
            language: to.language.clone(),
            organization: to.organization.clone(),
            module: to.module.clone(),
            version_constraint: None,
            scopes: vec![],
        };
        GraphItem::edge(
            DEPENDS_TYPE,
            key_for_module(from),
            key_for_module(to),
            None,
            encode_payload(&depends).unwrap(),
        )
    }

    async fn service_with_chain() -> DependencyService {
        let store = Arc::new(GraphStore::open_in_memory().await.unwrap());
        let a = module("a");
        let b = module("b");
        let c = module("c");
        store
            .put(&[
                node(&a),
                node(&b),
                node(&c),
                edge(&a, &b),
                edge(&b, &c),
            ])
            .await
            .unwrap();
        DependencyService::new(store)
    }

    #[tokio::test]
    async fn lists_direct_dependencies() {
        let svc = service_with_chain().await;
        let deps = svc.list_dependencies(&request("a")).await.unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].module.module, "b");
        assert_eq!(deps[0].depends.module, "b");
    }

    #[tokio::test]
    async fn lists_direct_dependents() {
        let svc = service_with_chain().await;
        let deps = svc.list_dependents(&request("c")).await.unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].module.module, "b");
    }

    #[tokio::test]
    async fn zero_results_is_success_not_error() {
        let svc = service_with_chain().await;
        let deps = svc.list_dependencies(&request("c")).await.unwrap();
        assert!(deps.is_empty());
        // A module nobody ever tracked also resolves to an empty list.
        let deps = svc.list_dependencies(&request("never-seen")).await.unwrap();
        assert!(deps.is_empty());
    }

    #[tokio::test]
    async fn request_key_matches_module_key() {
        let req = request("a");
        assert_eq!(req.key(), key_for_module(&module("a")));
    }
}
