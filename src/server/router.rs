//! Axum router configuration.
//!
//! Focused sub-routers per API surface:
//!
//! ```text
//! /
//! ├── /cdn/*              - package file serving and listings
//! ├── /mirror/*           - raw upstream passthrough
//! ├── /registry/winget/*  - WinGet registry REST surface
//! ├── /_docs/*            - OpenAPI document and viewers
//! └── /health             - liveness probe
//! ```

use axum::Router;
use axum::middleware;
use axum::routing::get;

use crate::handlers::cdn;
use crate::handlers::docs;
use crate::handlers::health::health;
use crate::handlers::mirror;
use crate::handlers::winget;
use crate::server::cors::permissive_cors;
use crate::state::AppState;

/// Build the complete router with all routes and the CORS layer.
pub fn build_router(state: &AppState) -> Router {
    Router::new()
        .nest("/cdn", cdn_router())
        .nest("/mirror", mirror_router())
        .nest("/registry/winget", winget_router())
        .nest("/_docs", docs_router())
        .route("/health", get(health))
        .layer(middleware::from_fn(permissive_cors))
        .with_state(state.clone())
}

/// CDN routes.
///
/// One wildcard route per request: the ecosystem picks the path
/// grammar, the rest of the URL is parsed by the handler (the router
/// cannot see `@spec` separators or the raw trailing slash).
fn cdn_router() -> Router<AppState> {
    Router::new().route("/{ecosystem}/{*rest}", get(cdn::serve))
}

/// Mirror routes.
///
/// - `GET /mirror/{registry}/{*path}` - validated against the registry
///   table, then streamed verbatim.
fn mirror_router() -> Router<AppState> {
    Router::new().route("/{registry}/{*path}", get(mirror::passthrough))
}

/// WinGet registry REST surface.
///
/// Routes:
/// - `GET  /packages` - paginated identifier list
/// - `GET  /packages/{id}` - package summary
/// - `GET  /packages/{id}/versions` - version list
/// - `GET  /packages/{id}/versions/{version}` - version manifest
/// - `GET  /packages/{id}/versions/{version}/locales` - locale manifests
/// - `GET  /packages/{id}/versions/{version}/locales/{locale}` - one locale
/// - `GET  /packages/{id}/versions/{version}/installers` - installers
/// - `GET  /packages/{id}/versions/{version}/installers/{installer}` - one installer
/// - `GET|POST /manifestSearch` - identifier search
fn winget_router() -> Router<AppState> {
    Router::new()
        .route("/packages", get(winget::list_packages))
        .route("/packages/{id}", get(winget::package_summary))
        .route("/packages/{id}/versions", get(winget::list_versions))
        .route("/packages/{id}/versions/{version}", get(winget::version_detail))
        .route("/packages/{id}/versions/{version}/locales", get(winget::list_locales))
        .route("/packages/{id}/versions/{version}/locales/{locale}", get(winget::locale_detail))
        .route("/packages/{id}/versions/{version}/installers", get(winget::list_installers))
        .route(
            "/packages/{id}/versions/{version}/installers/{installer}",
            get(winget::installer_detail),
        )
        .route("/manifestSearch", get(winget::search_get).post(winget::search_post))
}

/// Documentation routes.
fn docs_router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(docs::openapi))
        .route("/scalar", get(docs::scalar))
        .route("/swagger", get(docs::swagger))
}
