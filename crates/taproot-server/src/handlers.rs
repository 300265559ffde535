//! REST API handlers for the taproot server

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use taproot_core::{Direction, ImpactQuery, Relation};
use taproot_rebuild::TriggerOutcome;

use crate::error::ApiError;
use crate::service::{ImpactResult, NodeDetail, NodeRef, SearchResult};
use crate::ServerState;

pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` once a build has been published, `empty` before.
    pub status: &'static str,
    pub node_count: usize,
    pub link_count: usize,
    pub snapshot_version: u64,
    pub warning_count: usize,
    pub rebuild_in_progress: bool,
    pub last_rebuild_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ImpactParams {
    pub path: Option<String>,
    pub id: Option<String>,
    pub direction: Option<String>,
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub relation: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NodeParams {
    pub path: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub status: TriggerOutcome,
    /// Version being served when the request was accepted.
    pub snapshot_version: u64,
}

fn malformed(rejection: impl std::fmt::Display) -> ApiError {
    ApiError::invalid_argument(format!("malformed query string: {rejection}"))
}

pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let summary = state.query.summary();
    let rebuild = state.rebuild.status();
    Json(HealthResponse {
        status: if summary.snapshot_version > 0 { "ok" } else { "empty" },
        node_count: summary.node_count,
        link_count: summary.link_count,
        snapshot_version: summary.snapshot_version,
        warning_count: summary.warning_count,
        rebuild_in_progress: rebuild.in_progress,
        last_rebuild_error: rebuild.last_error,
    })
}

pub async fn search(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let Query(params) = params.map_err(malformed)?;
    let terms = params.q.ok_or_else(|| ApiError::invalid_argument("missing `q`"))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let query = state.query.clone();
    let results = tokio::task::spawn_blocking(move || query.search(&terms, limit, offset)).await??;
    Ok(Json(results))
}

pub async fn impact(
    State(state): State<Arc<ServerState>>,
    params: Result<axum_extra::extract::Query<ImpactParams>, axum_extra::extract::QueryRejection>,
) -> Result<Json<Vec<ImpactResult>>, ApiError> {
    let axum_extra::extract::Query(params) = params.map_err(malformed)?;
    let target = NodeRef::from_params(params.path, params.id)?;

    let mut query = ImpactQuery::incoming();
    if let Some(direction) = params.direction {
        query = query.direction(direction.parse::<Direction>()?);
    }
    if let Some(depth) = params.max_depth {
        query = query.max_depth(depth);
    }
    if !params.relation.is_empty() {
        let relations = params
            .relation
            .iter()
            .map(|relation| relation.parse::<Relation>())
            .collect::<Result<Vec<_>, _>>()?;
        query = query.relations(relations);
    }

    let service = state.query.clone();
    let results = tokio::task::spawn_blocking(move || service.impact(&target, &query)).await??;
    Ok(Json(results))
}

pub async fn node(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<NodeParams>, QueryRejection>,
) -> Result<Json<NodeDetail>, ApiError> {
    let Query(params) = params.map_err(malformed)?;
    let target = NodeRef::from_params(params.path, params.id)?;
    Ok(Json(state.query.node(&target)?))
}

pub async fn rebuild(
    State(state): State<Arc<ServerState>>,
) -> Result<(StatusCode, Json<RebuildResponse>), ApiError> {
    let status = state.rebuild.trigger();
    if status == TriggerOutcome::Stopped {
        return Err(ApiError::internal("rebuild requested but the rebuild worker has stopped"));
    }
    let snapshot_version = state.query.summary().snapshot_version;
    tracing::info!("Rebuild requested: {:?}", status);
    Ok((StatusCode::ACCEPTED, Json(RebuildResponse { status, snapshot_version })))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("no such endpoint")
}
