//! The OpenAPI document and its viewers.

use axum::Json;
use axum::http::HeaderMap;
use axum::http::header;
use axum::response::Html;
use axum::response::IntoResponse;
use serde_json::Value;
use serde_json::json;

/// Scalar API reference page.
static SCALAR_HTML: &str = include_str!("../assets/scalar.html");

/// Swagger UI page.
static SWAGGER_HTML: &str = include_str!("../assets/swagger.html");

/// `GET /_docs/openapi.json`.
pub async fn openapi() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("public, max-age=600"));
    (headers, Json(openapi_document()))
}

/// `GET /_docs/scalar`.
pub async fn scalar() -> Html<&'static str> {
    Html(SCALAR_HTML)
}

/// `GET /_docs/swagger`.
pub async fn swagger() -> Html<&'static str> {
    Html(SWAGGER_HTML)
}

/// The OpenAPI 3.1 description of the public surface.
fn openapi_document() -> Value {
    let file_or_listing = json!({
        "200": { "description": "File bytes, or a directory listing when the URL ends with a slash" },
        "404": { "description": "Package, version, or file not found" },
        "502": { "description": "Upstream unavailable" }
    });

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Nexus",
            "description": "Universal package-registry gateway and content-delivery front",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            "/cdn/npm/{path}": {
                "get": {
                    "summary": "npm file or directory listing; supports +esm at the package root",
                    "parameters": [path_param("name[@spec][/path], or @scope/name[@spec][/path]")],
                    "responses": file_or_listing.clone(),
                }
            },
            "/cdn/jsr/{path}": {
                "get": {
                    "summary": "JSR file or directory listing",
                    "parameters": [path_param("@scope/pkg[@ver][/path]")],
                    "responses": file_or_listing.clone(),
                }
            },
            "/cdn/gh/{path}": {
                "get": {
                    "summary": "GitHub file or directory listing",
                    "parameters": [path_param("owner/repo[@ref][/path]")],
                    "responses": file_or_listing.clone(),
                }
            },
            "/cdn/cdnjs/{path}": {
                "get": {
                    "summary": "cdnjs file or directory listing",
                    "parameters": [path_param("library[@ver]/path or library/version/path")],
                    "responses": file_or_listing.clone(),
                }
            },
            "/cdn/wp/{path}": {
                "get": {
                    "summary": "WordPress plugin or theme file",
                    "parameters": [path_param("plugins/<slug>/(tags/<ver>|trunk)[/path] or themes/<slug>/<ver>[/path]")],
                    "responses": file_or_listing.clone(),
                }
            },
            "/mirror/{registry}/{path}": {
                "get": {
                    "summary": "Raw upstream passthrough with a 10-minute edge cache",
                    "responses": {
                        "404": { "description": "Unknown mirror registry" },
                        "default": { "description": "Upstream status and body, verbatim" }
                    }
                }
            },
            "/registry/winget/packages": {
                "get": {
                    "summary": "Paginated package list (100 per page, base64 offset continuation)",
                    "responses": { "200": { "description": "Identifier page plus continuation token" } }
                }
            },
            "/registry/winget/packages/{id}": {
                "get": { "summary": "Package summary", "responses": { "200": { "description": "Identifier and versions" } } }
            },
            "/registry/winget/packages/{id}/versions": {
                "get": { "summary": "Version list", "responses": { "200": { "description": "Versions, newest first" } } }
            },
            "/registry/winget/packages/{id}/versions/{version}": {
                "get": { "summary": "Version manifest", "responses": { "200": { "description": "Parsed version manifest" } } }
            },
            "/registry/winget/packages/{id}/versions/{version}/locales": {
                "get": { "summary": "Locale manifests", "responses": { "200": { "description": "Parsed locale manifests" } } }
            },
            "/registry/winget/packages/{id}/versions/{version}/installers": {
                "get": { "summary": "Installers", "responses": { "200": { "description": "Installer entries" } } }
            },
            "/registry/winget/manifestSearch": {
                "get": { "summary": "Search package identifiers", "responses": { "200": { "description": "Matches" } } },
                "post": { "summary": "Search package identifiers", "responses": { "200": { "description": "Matches" } } }
            },
            "/health": {
                "get": { "summary": "Liveness probe", "responses": { "200": { "description": "OK" } } }
            }
        }
    })
}

fn path_param(description: &str) -> Value {
    json!({
        "name": "path",
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": "string" }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_public_surface() {
        let document = openapi_document();
        let paths = document["paths"].as_object().unwrap();
        for expected in [
            "/cdn/npm/{path}",
            "/cdn/jsr/{path}",
            "/cdn/gh/{path}",
            "/cdn/cdnjs/{path}",
            "/cdn/wp/{path}",
            "/mirror/{registry}/{path}",
            "/registry/winget/packages",
            "/registry/winget/manifestSearch",
            "/health",
        ] {
            assert!(paths.contains_key(expected), "missing {expected}");
        }
    }

    #[test]
    fn search_supports_get_and_post() {
        let document = openapi_document();
        let search = &document["paths"]["/registry/winget/manifestSearch"];
        assert!(search.get("get").is_some());
        assert!(search.get("post").is_some());
    }
}
