//! CDN request handling: file serving, directory listings, `+esm`.

use axum::Json;
use axum::extract::OriginalUri;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use futures::future::join_all;
use serde_json::json;
use tracing::debug;
use tracing::instrument;

use nexus_bundler::BundleError;
use nexus_bundler::VirtualFs;
use nexus_bundler::bundle_entry;
use nexus_cache::CacheError;
use nexus_cache::PackageManifest;
use nexus_resolver::Ecosystem;
use nexus_resolver::Resolved;

use crate::content_type::content_type_for;
use crate::error::ApiError;
use crate::handlers::cdn_path::parse_cdn_path;
use crate::state::AppState;

/// `Cache-Control` for keys that can never alias to new bytes.
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// `Cache-Control` for aliases, branches, and other mutable keys.
const CACHE_SHORT: &str = "public, max-age=600";

/// `GET /cdn/{ecosystem}/{*rest}`.
///
/// A trailing slash on the raw request URL selects the
/// directory-listing branch; the parsed path has it normalized away, so
/// the raw URI is consulted directly.
#[instrument(skip(state, uri))]
pub async fn serve(
    State(state): State<AppState>,
    Path((ecosystem, rest)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let ecosystem: Ecosystem = ecosystem
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown ecosystem: {ecosystem}")))?;
    let wants_listing = uri.path().ends_with('/');

    let request = parse_cdn_path(ecosystem, &rest)?;
    let resolved = state
        .resolver()
        .resolve(ecosystem, &request.name, request.spec.as_deref())
        .await?;
    debug!(key = %resolved.key, listing = wants_listing, "cdn request resolved");

    if ecosystem == Ecosystem::Npm && request.path == "+esm" {
        return serve_esm(&state, &resolved).await;
    }

    if wants_listing {
        return serve_listing(&state, &resolved, &request.path).await;
    }

    if request.path.is_empty() {
        let entry = entry_file(&state, &resolved).await?;
        let bytes = state.cache().get_file(&resolved, &entry).await?;
        return Ok(file_response(&entry, bytes, &resolved));
    }

    match state.cache().get_file(&resolved, &request.path).await {
        Ok(bytes) => Ok(file_response(&request.path, bytes, &resolved)),
        // A miss on a concrete path may be a directory: fall back to a
        // prefix-filtered listing before giving up.
        Err(CacheError::FileNotFound { .. }) => serve_listing(&state, &resolved, &request.path).await,
        Err(e) => Err(e.into()),
    }
}

/// Serve file bytes with MIME and cache policy headers.
fn file_response(path: &str, bytes: Bytes, resolved: &Resolved) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        content_type_for(path).parse().expect("valid content type"),
    );
    headers.insert(header::CACHE_CONTROL, cache_control(resolved));
    (StatusCode::OK, headers, bytes).into_response()
}

fn cache_control(resolved: &Resolved) -> header::HeaderValue {
    let value = if resolved.immutable { CACHE_IMMUTABLE } else { CACHE_SHORT };
    header::HeaderValue::from_static(value)
}

/// Directory listing at `path` (empty means package root).
async fn serve_listing(state: &AppState, resolved: &Resolved, path: &str) -> Result<Response, ApiError> {
    let manifest = state.cache().list(resolved).await?;
    let files = manifest.files_under(path);
    if files.is_empty() {
        return Err(ApiError::NotFound(format!("{} has no files under {path:?}", resolved.key)));
    }

    let body = json!({
        "name": resolved.key.name,
        "version": resolved.key.version,
        "path": path,
        "files": files,
    });

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, cache_control(resolved));
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

/// Pick the entry file served at the package root.
async fn entry_file(state: &AppState, resolved: &Resolved) -> Result<String, ApiError> {
    let key = &resolved.key;
    match key.ecosystem {
        Ecosystem::Npm => {
            let packument = state
                .client()
                .npm_packument(&key.name)
                .await
                .map_err(|e| ApiError::from(nexus_resolver::ResolveError::from_upstream(&key.name, e)))?;
            let version = packument.versions.get(&key.version);
            let entry = version
                .and_then(|v| v.browser.clone().or_else(|| v.main.clone()).or_else(|| v.module.clone()))
                .unwrap_or_else(|| "index.js".to_string());
            Ok(entry.trim_start_matches("./").to_string())
        }
        Ecosystem::Jsr => {
            let packument = state
                .client()
                .jsr_packument(&key.name)
                .await
                .map_err(|e| ApiError::from(nexus_resolver::ResolveError::from_upstream(&key.name, e)))?;
            let exports = packument.versions.get(&key.version).and_then(|v| v.exports.clone());
            Ok(jsr_entry_from_exports(exports.as_ref()))
        }
        Ecosystem::Gh => {
            let manifest = state.cache().list(resolved).await?;
            github_entry(&manifest)
                .map(str::to_string)
                .ok_or_else(|| ApiError::NotFound(format!("{key} has no README.md or index.js")))
        }
        Ecosystem::Cdnjs => {
            let library = state
                .client()
                .cdnjs_library(&key.name)
                .await
                .map_err(|e| ApiError::from(nexus_resolver::ResolveError::from_upstream(&key.name, e)))?;
            library
                .filename
                .ok_or_else(|| ApiError::NotFound(format!("{key} has no default filename")))
        }
        Ecosystem::Wp | Ecosystem::Winget => {
            Err(ApiError::BadRequest("a file path is required here".to_string()))
        }
    }
}

/// Narrow a JSR `exports` field to its entry path.
///
/// `exports` is a string, or an object whose `"."` entry is a string or
/// an object with a `default` key. Everything else falls back to
/// `mod.ts`.
fn jsr_entry_from_exports(exports: Option<&serde_json::Value>) -> String {
    let entry = match exports {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Object(map)) => match map.get(".") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(dot)) => {
                dot.get("default").and_then(|v| v.as_str()).map(str::to_string)
            }
            _ => None,
        },
        _ => None,
    };
    entry
        .unwrap_or_else(|| "mod.ts".to_string())
        .trim_start_matches("./")
        .to_string()
}

/// GitHub entry: the README when present, `index.js` otherwise.
fn github_entry(manifest: &PackageManifest) -> Option<&str> {
    for candidate in ["README.md", "index.js"] {
        if manifest.file(candidate).is_some() {
            return Some(candidate);
        }
    }
    None
}

/// The `+esm` branch: transform the entry module, caching the result
/// under the package prefix with the immutable policy when the version
/// is immutable.
async fn serve_esm(state: &AppState, resolved: &Resolved) -> Result<Response, ApiError> {
    if let Some(bytes) = state.cache().get_synthetic(resolved, "+esm").await {
        return Ok(file_response("bundle.js", bytes, resolved));
    }

    let manifest = state.cache().list(resolved).await?;
    let vfs = load_virtual_fs(state, resolved, &manifest).await;
    let entry = entry_file(state, resolved).await?;

    let bundled = bundle_entry(&resolved.key.name, &resolved.key.version, &entry, &vfs).map_err(|e| match e {
        BundleError::EntryNotFound { path } => ApiError::NotFound(format!("entry module not found: {path}")),
    })?;

    let bytes = Bytes::from(bundled);
    if resolved.immutable {
        state.cache().put_synthetic(resolved, "+esm", bytes.clone());
    }
    Ok(file_response("bundle.js", bytes, resolved))
}

/// Read the package's textual files into the bundler's virtual
/// filesystem.
async fn load_virtual_fs(state: &AppState, resolved: &Resolved, manifest: &PackageManifest) -> VirtualFs {
    let reads = manifest.files.iter().filter(|f| is_bundler_relevant(&f.name)).map(|file| {
        let name = file.name.clone();
        async move {
            let bytes = state.cache().get_file(resolved, &name).await.ok()?;
            let text = String::from_utf8(bytes.to_vec()).ok()?;
            Some((name, text))
        }
    });

    let mut vfs = VirtualFs::new();
    for loaded in join_all(reads).await.into_iter().flatten() {
        vfs.insert(loaded.0, loaded.1);
    }
    vfs
}

/// Only module sources and manifests feed the transform.
fn is_bundler_relevant(name: &str) -> bool {
    name == "package.json"
        || [".js", ".mjs", ".cjs", ".jsx", ".json", ".ts", ".mts", ".tsx"]
            .iter()
            .any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_cache::FileEntry;

    #[test]
    fn jsr_exports_narrowing() {
        assert_eq!(jsr_entry_from_exports(Some(&json!("./mod.ts"))), "mod.ts");
        assert_eq!(jsr_entry_from_exports(Some(&json!({ ".": "./main.ts" }))), "main.ts");
        assert_eq!(
            jsr_entry_from_exports(Some(&json!({ ".": { "default": "./index.ts" } }))),
            "index.ts",
        );
        assert_eq!(jsr_entry_from_exports(None), "mod.ts");
        assert_eq!(jsr_entry_from_exports(Some(&json!(42))), "mod.ts");
    }

    #[test]
    fn github_entry_prefers_readme() {
        let manifest = PackageManifest {
            files: vec![
                FileEntry { name: "index.js".to_string(), size: 1, integrity: None },
                FileEntry { name: "README.md".to_string(), size: 1, integrity: None },
            ],
            mtime: 0,
        };
        assert_eq!(github_entry(&manifest), Some("README.md"));

        let manifest = PackageManifest {
            files: vec![FileEntry { name: "src/lib.rs".to_string(), size: 1, integrity: None }],
            mtime: 0,
        };
        assert_eq!(github_entry(&manifest), None);
    }

    #[test]
    fn bundler_relevance_filter() {
        assert!(is_bundler_relevant("package.json"));
        assert!(is_bundler_relevant("dist/index.js"));
        assert!(is_bundler_relevant("src/mod.ts"));
        assert!(!is_bundler_relevant("logo.png"));
        assert!(!is_bundler_relevant("README.md"));
    }
}
