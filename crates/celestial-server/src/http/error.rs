//! Error responses for the HTTP API.
//!
//! Every failure becomes a JSON body `{"error": "...", "detail": "..."}`
//! with `detail` omitted when there is nothing more to say. Failures that
//! come from the store also carry its stable `code` and, when it has one,
//! a remediation `hint`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use celestial_core::{ParseViewError, StoreError};
use serde::Serialize;

/// Which traversal a tree request was running, for its error label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Descendants,
    Provenance,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A path id that is not a positive integer.
    #[error("bad id: {0}")]
    BadId(String),

    /// A body that is not valid JSON for the endpoint.
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// A query string that could not be decoded.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The store refused an emit.
    #[error("emit failed: {0}")]
    EmitFailed(#[source] StoreError),

    /// A point lookup named an unknown event.
    #[error("not found: {0}")]
    NotFound(#[source] StoreError),

    /// A tree or forest traversal could not start.
    #[error("{kind:?} traversal failed: {source}")]
    Tree {
        kind: TreeKind,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    BadView(#[from] ParseViewError),

    /// A batch request with an empty `ids` list.
    #[error("ids is required")]
    MissingIds,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("no such route")]
    UnknownRoute,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidJson(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadId(_)
            | Self::InvalidJson(_)
            | Self::InvalidQuery(_)
            | Self::EmitFailed(_)
            | Self::BadView(_)
            | Self::MissingIds => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Tree { .. } | Self::UnknownRoute => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Short label used as the `error` field.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::BadId(_) => "bad id",
            Self::InvalidJson(_) => "invalid json",
            Self::InvalidQuery(_) => "invalid query",
            Self::EmitFailed(_) => "emit failed",
            Self::NotFound(_) | Self::UnknownRoute => "not found",
            Self::Tree {
                kind: TreeKind::Descendants,
                ..
            } => "descendant process failed",
            Self::Tree {
                kind: TreeKind::Provenance,
                ..
            } => "provenance process failed",
            Self::BadView(_) => "bad view",
            Self::MissingIds => "ids is required",
            Self::MethodNotAllowed => "method not allowed",
        }
    }

    /// The store error behind this response, if any.
    #[must_use]
    pub const fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::EmitFailed(err) | Self::NotFound(err) | Self::Tree { source: err, .. } => {
                Some(err)
            }
            _ => None,
        }
    }

    fn body(&self) -> ErrorBody {
        let store = self.store_error();
        ErrorBody {
            error: self.label(),
            detail: self.detail(),
            code: store.map(|err| err.code().code()),
            hint: store.and_then(StoreError::hint),
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Self::BadId(raw) => Some(format!("not a positive integer: {raw:?}")),
            Self::InvalidJson(detail) | Self::InvalidQuery(detail) => Some(detail.clone()),
            Self::EmitFailed(err) | Self::NotFound(err) | Self::Tree { source: err, .. } => {
                Some(err.to_string())
            }
            Self::BadView(err) => Some(err.to_string()),
            Self::MissingIds | Self::MethodNotAllowed | Self::UnknownRoute => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "request rejected");

        (status, Json(self.body())).into_response()
    }
}
