//! The mirror passthrough: URL-concat and stream.

use axum::body::Body;
use axum::extract::OriginalUri;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use tracing::debug;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Known mirrored upstreams: `registry-name → base URL`.
///
/// The upstream path is concatenated verbatim, duplicate slashes
/// included; operators who put a trailing slash in both the table and
/// the request get exactly what they asked for.
const MIRRORS: &[(&str, &str)] = &[
    ("npm", "https://registry.npmjs.org"),
    ("yarn", "https://registry.yarnpkg.com"),
    ("jsr", "https://jsr.io"),
    ("deno", "https://deno.land"),
    ("pypi", "https://pypi.org"),
    ("pythonhosted", "https://files.pythonhosted.org"),
    ("rubygems", "https://rubygems.org"),
    ("crates", "https://crates.io"),
    ("crates-static", "https://static.crates.io"),
    ("golang", "https://proxy.golang.org"),
    ("gosum", "https://sum.golang.org"),
    ("nuget", "https://api.nuget.org"),
    ("maven", "https://repo1.maven.org/maven2"),
    ("google-maven", "https://dl.google.com/dl/android/maven2"),
    ("gradle", "https://plugins.gradle.org"),
    ("packagist", "https://repo.packagist.org"),
    ("cpan", "https://www.cpan.org"),
    ("ctan", "https://mirrors.ctan.org"),
    ("hex", "https://repo.hex.pm"),
    ("hexdocs", "https://hexdocs.pm"),
    ("hackage", "https://hackage.haskell.org"),
    ("julia", "https://pkg.julialang.org"),
    ("cran", "https://cran.r-project.org"),
    ("homebrew", "https://formulae.brew.sh"),
    ("homebrew-bottles", "https://ghcr.io/v2/homebrew/core"),
    ("alpine", "https://dl-cdn.alpinelinux.org/alpine"),
    ("debian", "https://deb.debian.org/debian"),
    ("debian-security", "https://security.debian.org/debian-security"),
    ("ubuntu", "https://archive.ubuntu.com/ubuntu"),
    ("fedora", "https://dl.fedoraproject.org/pub/fedora"),
    ("epel", "https://dl.fedoraproject.org/pub/epel"),
    ("arch", "https://geo.mirror.pkgbuild.com"),
    ("node", "https://nodejs.org/dist"),
    ("electron", "https://github.com/electron/electron/releases/download"),
    ("flutter", "https://storage.googleapis.com/flutter_infra_release"),
    ("dart", "https://pub.dev"),
    ("nixpkgs", "https://cache.nixos.org"),
    ("helm", "https://charts.helm.sh/stable"),
    ("grafana", "https://packages.grafana.com"),
    ("elastic", "https://artifacts.elastic.co"),
    ("winget-source", "https://cdn.winget.microsoft.com/cache"),
    ("vscode-marketplace", "https://marketplace.visualstudio.com"),
];

/// Look up a mirrored registry's base URL.
pub fn mirror_base(registry: &str) -> Option<&'static str> {
    MIRRORS
        .iter()
        .find(|(name, _)| *name == registry)
        .map(|(_, base)| *base)
}

/// Build the upstream URL: base, one joining slash, then the captured
/// path and query, verbatim. No slash normalization — a path that
/// arrives with its own leading slash produces `//` in the result.
fn build_mirror_url(base: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!("{base}/{path}");
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// `GET /mirror/{registry}/{*path}`: line-for-line passthrough of bytes
/// with a 10-minute edge cache.
#[instrument(skip(state, uri))]
pub async fn passthrough(
    State(state): State<AppState>,
    Path((registry, path)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let base = mirror_base(&registry)
        .ok_or_else(|| ApiError::NotFound(format!("unknown mirror registry: {registry}")))?;

    let url = build_mirror_url(base, &path, uri.query());
    debug!(url = %url, "mirroring");

    let upstream = state
        .client()
        .proxy_get(&url)
        .await
        .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))?;

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    if let Some(content_type) = upstream.headers().get(header::CONTENT_TYPE) {
        if let Ok(value) = content_type.to_str() {
            if let Ok(parsed) = value.parse() {
                headers.insert(header::CONTENT_TYPE, parsed);
            }
        }
    }
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("public, max-age=600"));

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((status, headers, body).into_response())
}
