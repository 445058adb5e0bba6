//! Source and module registry operations.
//!
//! Sources are where module descriptors are discovered; tracking a source
//! upserts its node together with the modules it manages and one `manages`
//! edge per module. Listing and the source/module cross-lookups are thin
//! typed views over the store's `list` and one-hop traversals.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use deptrack_keys::{key_for_module, key_for_source};
use deptrack_store::GraphStore;
use deptrack_types::{
    decode, encode_payload, GraphEntity, GraphItem, Manages, Module, Source, MANAGES_TYPE,
    MODULE_TYPE, SOURCE_TYPE,
};

use crate::error::{ServiceError, ServiceResult};

/// A module together with the management declaration that binds it to a
/// source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagedModule {
    pub module: Module,
    pub manages: Manages,
}

/// A source together with the management declaration that binds it to a
/// module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagingSource {
    pub source: Source,
    pub manages: Manages,
}

/// A tracking submission: one source and the modules it currently manages.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackRequest {
    pub source: Source,
    #[serde(default)]
    pub modules: Vec<ManagedModule>,
}

/// Typed registry operations over sources, modules, and `manages` edges.
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<GraphStore>,
}

impl RegistryService {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Paginated read of tracked sources.
    pub async fn list_sources(&self, page: i32, count: i32) -> ServiceResult<Vec<Source>> {
        let items = self.store.list(SOURCE_TYPE, page, count).await?;
        items.iter().map(source_from_item).collect()
    }

    /// Paginated read of known modules.
    pub async fn list_modules(&self, page: i32, count: i32) -> ServiceResult<Vec<Module>> {
        let items = self.store.list(MODULE_TYPE, page, count).await?;
        items.iter().map(module_from_item).collect()
    }

    /// Upsert a source, its managed modules, and a `manages` edge per
    /// module. Returns the number of graph items written.
    pub async fn track(&self, req: &TrackRequest) -> ServiceResult<usize> {
        let source_key = key_for_source(&req.source);
        let mut items = vec![GraphItem::node(
            SOURCE_TYPE,
            source_key,
            encode_payload(&req.source)?,
        )];
        for managed in &req.modules {
            let module_key = key_for_module(&managed.module);
            items.push(GraphItem::node(
                MODULE_TYPE,
                module_key,
                encode_payload(&managed.module)?,
            ));
            items.push(GraphItem::edge(
                MANAGES_TYPE,
                source_key,
                module_key,
                None,
                encode_payload(&managed.manages)?,
            ));
        }
        self.store.put(&items).await?;
        tracing::info!(url = %req.source.url, modules = req.modules.len(), "tracked source");
        Ok(items.len())
    }

    /// The modules a source manages — one hop forward along `manages`.
    pub async fn managed_modules(&self, source: &Source) -> ServiceResult<Vec<ManagedModule>> {
        let key = key_for_source(source);
        let pairs = self
            .store
            .find_upstream(&key, &[MANAGES_TYPE.to_string()])
            .await?;
        pairs
            .iter()
            .map(|pair| {
                Ok(ManagedModule {
                    module: module_from_item(&pair.node)?,
                    manages: manages_from_item(&pair.edge)?,
                })
            })
            .collect()
    }

    /// The sources managing a module — one hop backward along `manages`.
    pub async fn managing_sources(&self, module: &Module) -> ServiceResult<Vec<ManagingSource>> {
        let key = key_for_module(module);
        let pairs = self
            .store
            .find_downstream(&key, &[MANAGES_TYPE.to_string()])
            .await?;
        pairs
            .iter()
            .map(|pair| {
                Ok(ManagingSource {
                    source: source_from_item(&pair.node)?,
                    manages: manages_from_item(&pair.edge)?,
                })
            })
            .collect()
    }
}

fn source_from_item(item: &GraphItem) -> ServiceResult<Source> {
    match decode(item)? {
        GraphEntity::Source(s) => Ok(s),
        _ => Err(ServiceError::UnexpectedEntity {
            item_type: item.item_type.clone(),
        }),
    }
}

fn module_from_item(item: &GraphItem) -> ServiceResult<Module> {
    match decode(item)? {
        GraphEntity::Module(m) => Ok(m),
        _ => Err(ServiceError::UnexpectedEntity {
            item_type: item.item_type.clone(),
        }),
    }
}

fn manages_from_item(item: &GraphItem) -> ServiceResult<Manages> {
    match decode(item)? {
        GraphEntity::Manages(m) => Ok(m),
        _ => Err(ServiceError::UnexpectedEntity {
            item_type: item.item_type.clone(),
        }),
    }
}
