use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::{Stream, StreamExt};

use deptrack_services::{
    Dependency, DependencyRequest, ManagedModule, ManagingSource, ServiceResult, TrackRequest,
};
use deptrack_types::{Module, Source};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check handler.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Info handler.
pub async fn info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "deptrack-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

type ModulePath = Path<(String, String, String)>;

fn request((language, organization, module): (String, String, String)) -> DependencyRequest {
    DependencyRequest {
        language,
        organization,
        module,
    }
}

fn default_page() -> i32 {
    1
}

fn default_count() -> i32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i32,
    #[serde(default = "default_count")]
    pub count: i32,
}

#[derive(Debug, Deserialize)]
pub struct ModuleQuery {
    pub language: String,
    pub organization: String,
    pub module: String,
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SourceListResponse {
    pub sources: Vec<Source>,
}

pub async fn list_sources(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<SourceListResponse>, ApiError> {
    let sources = state.registry.list_sources(query.page, query.count).await?;
    Ok(Json(SourceListResponse { sources }))
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub tracked: usize,
}

pub async fn track_source(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<TrackResponse>, ApiError> {
    let tracked = state.registry.track(&request).await?;
    Ok(Json(TrackResponse { tracked }))
}

#[derive(Debug, Serialize)]
pub struct ModuleListResponse {
    pub modules: Vec<Module>,
}

pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ModuleListResponse>, ApiError> {
    let modules = state.registry.list_modules(query.page, query.count).await?;
    Ok(Json(ModuleListResponse { modules }))
}

#[derive(Debug, Serialize)]
pub struct ManagingSourceListResponse {
    pub sources: Vec<ManagingSource>,
}

pub async fn module_sources(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModuleQuery>,
) -> Result<Json<ManagingSourceListResponse>, ApiError> {
    let module = Module {
        language: query.language,
        organization: query.organization,
        module: query.module,
    };
    let sources = state.registry.managing_sources(&module).await?;
    Ok(Json(ManagingSourceListResponse { sources }))
}

#[derive(Debug, Serialize)]
pub struct ManagedModuleListResponse {
    pub modules: Vec<ManagedModule>,
}

pub async fn source_managed_modules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<ManagedModuleListResponse>, ApiError> {
    let source = Source { url: query.url };
    let modules = state.registry.managed_modules(&source).await?;
    Ok(Json(ManagedModuleListResponse { modules }))
}

#[derive(Debug, Serialize)]
pub struct DependencyListResponse {
    pub dependencies: Vec<Dependency>,
}

pub async fn list_dependencies(
    State(state): State<Arc<AppState>>,
    Path(segments): ModulePath,
) -> Result<Json<DependencyListResponse>, ApiError> {
    let dependencies = state.dependency.list_dependencies(&request(segments)).await?;
    Ok(Json(DependencyListResponse { dependencies }))
}

#[derive(Debug, Serialize)]
pub struct DependentListResponse {
    pub dependents: Vec<Dependency>,
}

pub async fn list_dependents(
    State(state): State<Arc<AppState>>,
    Path(segments): ModulePath,
) -> Result<Json<DependentListResponse>, ApiError> {
    let dependents = state.dependency.list_dependents(&request(segments)).await?;
    Ok(Json(DependentListResponse { dependents }))
}

pub async fn dependencies_topology(
    State(state): State<Arc<AppState>>,
    Path(segments): ModulePath,
) -> Response {
    let key = request(segments).key();
    ndjson(state.topology.dependencies_topology(key))
}

pub async fn dependents_topology(
    State(state): State<Arc<AppState>>,
    Path(segments): ModulePath,
) -> Response {
    let key = request(segments).key();
    ndjson(state.topology.dependents_topology(key))
}

pub async fn dependencies_topology_tiered(
    State(state): State<Arc<AppState>>,
    Path(segments): ModulePath,
) -> Response {
    let key = request(segments).key();
    ndjson(state.topology.dependencies_topology_tiered(key))
}

pub async fn dependents_topology_tiered(
    State(state): State<Arc<AppState>>,
    Path(segments): ModulePath,
) -> Response {
    let key = request(segments).key();
    ndjson(state.topology.dependents_topology_tiered(key))
}

/// Stream traversal results as newline-delimited JSON.
///
/// Each item is written as one line as soon as the walk discovers it. A
/// traversal error aborts the body mid-stream — the error is carried by
/// the terminated connection, not by a sentinel record.
fn ndjson<T, S>(stream: S) -> Response
where
    T: Serialize,
    S: Stream<Item = ServiceResult<T>> + Send + 'static,
{
    let body = Body::from_stream(stream.map(|result| match result {
        Ok(value) => match serde_json::to_vec(&value) {
            Ok(mut line) => {
                line.push(b'\n');
                Ok(line)
            }
            Err(err) => Err(axum::Error::new(err)),
        },
        Err(err) => Err(axum::Error::new(err)),
    }));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
        .into_response()
}
