//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/emit` | Append an event, returns `{"id": n}` |
//! | `GET` | `/event/{id}` | One event |
//! | `GET` | `/children/{id}` | Immediate children |
//! | `GET` | `/ancestors/{id}` | Reachable root events |
//! | `GET` | `/heads` | Events with no children |
//! | `GET` | `/descendants/{id}?view=` | Descendants tree |
//! | `POST` | `/descendants` | Descendants forest |
//! | `GET` | `/provenance/{id}?view=` | Provenance tree |
//! | `POST` | `/provenance` | Provenance forest |
//! | `GET` | `/healthz` | Liveness |
//! | `GET` | `/version` | Build identity |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use celestial_core::{
    DescendantsForestView, DescendantsView, Event, EventId, NewEvent, ProvenanceForestView,
    ProvenanceView, StoreError, View,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, TreeKind};
use super::state::AppState;
use crate::version::VersionInfo;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitResponse {
    pub id: EventId,
}

/// Body of the batched tree endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeBatchRequest {
    #[serde(default)]
    pub ids: Vec<EventId>,
    #[serde(default)]
    pub view: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub view: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ok: bool,
    pub ts: i64,
    pub events: usize,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_id(raw: &str) -> Result<EventId, ApiError> {
    match raw.parse::<EventId>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ApiError::BadId(raw.to_string())),
    }
}

fn tree_failed(kind: TreeKind) -> impl FnOnce(StoreError) -> ApiError {
    move |source| ApiError::Tree { kind, source }
}

fn batch_ids(
    body: Result<Json<TreeBatchRequest>, JsonRejection>,
) -> Result<(Vec<EventId>, View), ApiError> {
    let Json(request) = body?;
    if request.ids.is_empty() {
        return Err(ApiError::MissingIds);
    }
    let view = request.view.parse()?;
    Ok((request.ids, view))
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// `POST /emit`
///
/// # Errors
///
/// [`ApiError::InvalidJson`] for a malformed body, [`ApiError::EmitFailed`]
/// when the store rejects the event.
pub async fn emit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> ApiResult<EmitResponse> {
    let Json(request) = body?;
    let event = state.store.emit(request).map_err(ApiError::EmitFailed)?;
    Ok(Json(EmitResponse { id: event.id }))
}

/// `GET /event/{id}`
///
/// # Errors
///
/// [`ApiError::BadId`] or [`ApiError::NotFound`].
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Event> {
    let id = parse_id(&raw)?;
    state.store.get(id).map(Json).map_err(ApiError::NotFound)
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// `GET /children/{id}`
///
/// # Errors
///
/// [`ApiError::BadId`] or [`ApiError::NotFound`].
pub async fn children(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Vec<EventId>> {
    let id = parse_id(&raw)?;
    state.store.children(id).map(Json).map_err(ApiError::NotFound)
}

/// `GET /ancestors/{id}`
///
/// # Errors
///
/// [`ApiError::BadId`] or [`ApiError::NotFound`].
pub async fn ancestors(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Vec<EventId>> {
    let id = parse_id(&raw)?;
    state.store.ancestors(id).map(Json).map_err(ApiError::NotFound)
}

/// `GET /heads`
pub async fn heads(State(state): State<Arc<AppState>>) -> Json<Vec<EventId>> {
    Json(state.store.heads())
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// `GET /descendants/{id}?view=struct|meta`
///
/// # Errors
///
/// [`ApiError::BadId`], [`ApiError::BadView`], or [`ApiError::Tree`] when
/// the root is unknown.
pub async fn descendants(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> ApiResult<DescendantsView> {
    let id = parse_id(&raw)?;
    let Query(query) = query?;
    let view: View = query.view.parse()?;
    state
        .store
        .descendants(id, view)
        .map(Json)
        .map_err(tree_failed(TreeKind::Descendants))
}

/// `POST /descendants` with `{"ids": [...], "view": "..."}`
///
/// # Errors
///
/// [`ApiError::MissingIds`] for an empty batch, otherwise as
/// [`descendants`] for any root.
pub async fn descendants_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TreeBatchRequest>, JsonRejection>,
) -> ApiResult<DescendantsForestView> {
    let (ids, view) = batch_ids(body)?;
    state
        .store
        .descendants_forest_view(&ids, view)
        .map(Json)
        .map_err(tree_failed(TreeKind::Descendants))
}

/// `GET /provenance/{id}?view=struct|meta`
///
/// # Errors
///
/// [`ApiError::BadId`], [`ApiError::BadView`], or [`ApiError::Tree`] when
/// the root is unknown.
pub async fn provenance(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> ApiResult<ProvenanceView> {
    let id = parse_id(&raw)?;
    let Query(query) = query?;
    let view: View = query.view.parse()?;
    state
        .store
        .provenance(id, view)
        .map(Json)
        .map_err(tree_failed(TreeKind::Provenance))
}

/// `POST /provenance` with `{"ids": [...], "view": "..."}`
///
/// # Errors
///
/// [`ApiError::MissingIds`] for an empty batch, otherwise as
/// [`provenance`] for any root.
pub async fn provenance_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TreeBatchRequest>, JsonRejection>,
) -> ApiResult<ProvenanceForestView> {
    let (ids, view) = batch_ids(body)?;
    state
        .store
        .provenance_forest_view(&ids, view)
        .map(Json)
        .map_err(tree_failed(TreeKind::Provenance))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// `GET /healthz`
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        ok: true,
        ts: chrono::Utc::now().timestamp(),
        events: state.store.len(),
    })
}

/// `GET /version`
pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo::current())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn unknown_route() -> ApiError {
    ApiError::UnknownRoute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parsing() {
        assert_eq!(parse_id("42").unwrap(), 42);
        for bad in ["0", "-1", "abc", "", "1.5", "18446744073709551616"] {
            assert!(matches!(parse_id(bad), Err(ApiError::BadId(_))), "{bad}");
        }
    }

    #[test]
    fn batch_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<TreeBatchRequest>(r#"{"ids":[1],"extra":true}"#);
        assert!(err.is_err());

        let ok: TreeBatchRequest = serde_json::from_str(r#"{"ids":[1,2]}"#).unwrap();
        assert_eq!(ok.ids, vec![1, 2]);
        assert!(ok.view.is_empty());
    }
}
