//! CDN path grammar.
//!
//! Every ecosystem packs `(name, version-spec, file-path)` into its own
//! URL shape:
//!
//! ```text
//! npm    @scope/name[@spec][/path]   or   name[@spec][/path]
//! jsr    @scope/pkg[@ver][/path]
//! gh     owner/repo[@ref][/path]
//! cdnjs  library[@spec]/path         or   library/version/path
//! wp     plugins/<slug>/(tags/<ver>|trunk)[/path]
//!        themes/<slug>/<ver>[/path]
//! ```
//!
//! Whether the request wants a directory listing is carried separately:
//! it comes from a trailing slash on the *raw* request URL, which the
//! parsed path has already normalized away.

use nexus_resolver::Ecosystem;
use nexus_resolver::is_complete_semver;

use crate::error::ApiError;

/// A parsed CDN request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnRequest {
    /// Ecosystem-normalized package name.
    pub name: String,
    /// Raw version specifier, if the URL carried one.
    pub spec: Option<String>,
    /// File path within the package; empty at the package root.
    pub path: String,
}

/// Parse the remainder of a `/cdn/<ecosystem>/...` URL.
pub fn parse_cdn_path(ecosystem: Ecosystem, rest: &str) -> Result<CdnRequest, ApiError> {
    let rest = rest.trim_matches('/');
    if rest.is_empty() {
        return Err(ApiError::BadRequest("missing package name".to_string()));
    }
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match ecosystem {
        Ecosystem::Npm => parse_npm(&segments),
        Ecosystem::Jsr => parse_jsr(&segments),
        Ecosystem::Gh => parse_github(&segments),
        Ecosystem::Cdnjs => parse_cdnjs(&segments),
        Ecosystem::Wp => parse_wordpress(&segments),
        Ecosystem::Winget => Err(ApiError::BadRequest(
            "winget is served under /registry/winget".to_string(),
        )),
    }
}

fn parse_npm(segments: &[&str]) -> Result<CdnRequest, ApiError> {
    if segments[0].starts_with('@') {
        let [scope, versioned, path @ ..] = segments else {
            return Err(ApiError::BadRequest("scoped package needs @scope/name".to_string()));
        };
        let (name, spec) = split_versioned(versioned);
        Ok(CdnRequest {
            name: format!("{scope}/{name}"),
            spec,
            path: path.join("/"),
        })
    } else {
        let (name, spec) = split_versioned(segments[0]);
        Ok(CdnRequest {
            name,
            spec,
            path: segments[1..].join("/"),
        })
    }
}

fn parse_jsr(segments: &[&str]) -> Result<CdnRequest, ApiError> {
    if !segments[0].starts_with('@') {
        return Err(ApiError::BadRequest("jsr packages are scoped: @scope/pkg".to_string()));
    }
    parse_npm(segments)
}

fn parse_github(segments: &[&str]) -> Result<CdnRequest, ApiError> {
    let [owner, versioned, path @ ..] = segments else {
        return Err(ApiError::BadRequest("github paths need owner/repo".to_string()));
    };
    let (repo, spec) = split_versioned(versioned);
    Ok(CdnRequest {
        name: format!("{owner}/{repo}"),
        spec,
        path: path.join("/"),
    })
}

fn parse_cdnjs(segments: &[&str]) -> Result<CdnRequest, ApiError> {
    if segments[0].contains('@') {
        let (name, spec) = split_versioned(segments[0]);
        return Ok(CdnRequest {
            name,
            spec,
            path: segments[1..].join("/"),
        });
    }
    // `library/version/path`: the second segment is a version when it
    // looks like one, otherwise the library is unversioned.
    match segments.get(1) {
        Some(second) if is_complete_semver(second) => Ok(CdnRequest {
            name: segments[0].to_string(),
            spec: Some((*second).to_string()),
            path: segments[2..].join("/"),
        }),
        _ => Ok(CdnRequest {
            name: segments[0].to_string(),
            spec: None,
            path: segments[1..].join("/"),
        }),
    }
}

fn parse_wordpress(segments: &[&str]) -> Result<CdnRequest, ApiError> {
    match segments {
        ["plugins", slug, "tags", version, path @ ..] => Ok(CdnRequest {
            name: format!("plugins/{slug}"),
            spec: Some(format!("tags/{version}")),
            path: path.join("/"),
        }),
        ["plugins", slug, "trunk", path @ ..] => Ok(CdnRequest {
            name: format!("plugins/{slug}"),
            spec: Some("trunk".to_string()),
            path: path.join("/"),
        }),
        ["themes", slug, version, path @ ..] => Ok(CdnRequest {
            name: format!("themes/{slug}"),
            spec: Some((*version).to_string()),
            path: path.join("/"),
        }),
        _ => Err(ApiError::BadRequest(
            "wordpress paths are plugins/<slug>/(tags/<ver>|trunk)[/path] or themes/<slug>/<ver>[/path]".to_string(),
        )),
    }
}

/// Split a `name[@spec]` segment. An empty spec (`name@`) counts as
/// absent.
fn split_versioned(segment: &str) -> (String, Option<String>) {
    match segment.split_once('@') {
        Some((name, spec)) if !spec.is_empty() => (name.to_string(), Some(spec.to_string())),
        Some((name, _)) => (name.to_string(), None),
        None => (segment.to_string(), None),
    }
}
