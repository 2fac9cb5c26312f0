//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use nexus_cache::CacheError;
use nexus_resolver::ResolveError;
use nexus_winget::WingetError;

/// A handler failure, carrying the status it maps to.
///
/// The taxonomy: unparseable requests are 400, anything the upstream or
/// cache cannot name is 404, an unreachable upstream is 502, and a
/// malformed manifest read in the foreground is 500. Storage failures
/// never reach this type; they degrade to cache misses upstream of the
/// handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Unparseable path or missing required parameter.
    BadRequest(String),
    /// Package, version, or file absent.
    NotFound(String),
    /// Upstream transport failure.
    UpstreamUnavailable(String),
    /// Foreground manifest parse failure.
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::UpstreamUnavailable(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::PackageNotFound { .. } | ResolveError::VersionNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            ResolveError::UpstreamUnavailable { .. } => ApiError::UpstreamUnavailable(e.to_string()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::PackageNotFound { .. }
            | CacheError::FileNotFound { .. }
            | CacheError::Unsupported { .. } => ApiError::NotFound(e.to_string()),
            CacheError::UpstreamUnavailable { .. } => ApiError::UpstreamUnavailable(e.to_string()),
        }
    }
}

impl From<WingetError> for ApiError {
    fn from(e: WingetError) -> Self {
        match e {
            WingetError::PackageNotFound { .. }
            | WingetError::VersionNotFound { .. }
            | WingetError::FileNotFound { .. } => ApiError::NotFound(e.to_string()),
            WingetError::EmptyTree { .. } | WingetError::UpstreamUnavailable { .. } => {
                ApiError::UpstreamUnavailable(e.to_string())
            }
            WingetError::InvalidManifest { .. } => ApiError::Internal(e.to_string()),
        }
    }
}
