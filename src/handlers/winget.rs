//! The WinGet registry surface: package list, versions, locales,
//! installers, and `manifestSearch`.

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use nexus_winget::ManifestKind;
use nexus_winget::MatchType;
use nexus_winget::classify_manifest;
use nexus_winget::manifest::parse_installer_manifest;
use nexus_winget::manifest::parse_locale_manifest;
use nexus_winget::manifest::parse_version_manifest;

use crate::error::ApiError;
use crate::state::AppState;

/// Packages per page of `/packages`.
const PAGE_SIZE: usize = 100;

/// Version entries per package in search responses.
const MAX_SEARCH_VERSIONS: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "continuationToken")]
    continuation_token: Option<String>,
}

/// `GET /registry/winget/packages` — paginated identifier list.
#[instrument(skip(state))]
pub async fn list_packages(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let index = state.winget().package_index().await?;
    let offset = decode_offset(page.continuation_token.as_deref())?;

    let identifiers: Vec<&String> = index.packages.keys().collect();
    let page_items: Vec<Value> = identifiers
        .iter()
        .skip(offset)
        .take(PAGE_SIZE)
        .map(|id| json!({ "PackageIdentifier": id }))
        .collect();

    let next = offset + page_items.len();
    let continuation = (next < identifiers.len()).then(|| encode_offset(next));

    Ok(Json(json!({
        "Data": page_items,
        "ContinuationToken": continuation,
    })))
}

/// `GET /registry/winget/packages/{id}` — package summary.
#[instrument(skip(state))]
pub async fn package_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let index = state.winget().package_index().await?;
    let versions = index
        .versions(&id)
        .ok_or_else(|| ApiError::NotFound(format!("package not found: {id}")))?;

    Ok(Json(json!({
        "Data": {
            "PackageIdentifier": id,
            "Versions": versions,
        }
    })))
}

/// `GET /registry/winget/packages/{id}/versions`.
#[instrument(skip(state))]
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let index = state.winget().package_index().await?;
    let versions = index
        .versions(&id)
        .ok_or_else(|| ApiError::NotFound(format!("package not found: {id}")))?;

    let data: Vec<Value> = versions.iter().map(|v| json!({ "PackageVersion": v })).collect();
    Ok(Json(json!({ "Data": data })))
}

/// `GET /registry/winget/packages/{id}/versions/{version}`.
///
/// Reads the primary version manifest in the foreground; a malformed
/// manifest here is a 500, unlike background parses which skip.
#[instrument(skip(state))]
pub async fn version_detail(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let paths = state.winget().version_manifest_paths(&id, &version).await?;
    let manifest_path = find_kind(&paths, &id, |kind| kind == &ManifestKind::Version)
        .ok_or_else(|| ApiError::NotFound(format!("no version manifest for {id} {version}")))?;

    let bytes = state.winget().manifest_file(&manifest_path).await?;
    let manifest = parse_version_manifest(&manifest_path, &bytes)?;
    Ok(Json(json!({ "Data": manifest })))
}

/// `GET /registry/winget/packages/{id}/versions/{version}/locales`.
///
/// Malformed locale manifests are logged and skipped; the rest of the
/// list is still served.
#[instrument(skip(state))]
pub async fn list_locales(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let paths = state.winget().version_manifest_paths(&id, &version).await?;

    let mut locales = Vec::new();
    for path in &paths {
        let Some(ManifestKind::Locale(_)) = classify(path, &id) else {
            continue;
        };
        let bytes = state.winget().manifest_file(path).await?;
        match parse_locale_manifest(path, &bytes) {
            Ok(manifest) => locales.push(manifest),
            Err(e) => warn!(path = %path, error = %e, "skipping malformed locale manifest"),
        }
    }

    Ok(Json(json!({ "Data": locales })))
}

/// `GET /registry/winget/packages/{id}/versions/{version}/locales/{locale}`.
#[instrument(skip(state))]
pub async fn locale_detail(
    State(state): State<AppState>,
    Path((id, version, locale)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let paths = state.winget().version_manifest_paths(&id, &version).await?;
    let path = find_kind(&paths, &id, |kind| matches!(kind, ManifestKind::Locale(l) if l.eq_ignore_ascii_case(&locale)))
        .ok_or_else(|| ApiError::NotFound(format!("locale {locale} not found for {id} {version}")))?;

    let bytes = state.winget().manifest_file(&path).await?;
    let manifest = parse_locale_manifest(&path, &bytes)?;
    Ok(Json(json!({ "Data": manifest })))
}

/// `GET /registry/winget/packages/{id}/versions/{version}/installers`.
#[instrument(skip(state))]
pub async fn list_installers(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let installers = load_installers(&state, &id, &version).await?;
    Ok(Json(json!({ "Data": installers })))
}

/// `GET /registry/winget/packages/{id}/versions/{version}/installers/{installer}`.
///
/// Installers carry no upstream identifier; the SHA-256 of the artifact
/// (or the list position) addresses one.
#[instrument(skip(state))]
pub async fn installer_detail(
    State(state): State<AppState>,
    Path((id, version, installer_id)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let installers = load_installers(&state, &id, &version).await?;

    let found = installers.iter().find(|entry| {
        entry
            .get("InstallerIdentifier")
            .and_then(Value::as_str)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(&installer_id))
    });
    match found {
        Some(entry) => Ok(Json(json!({ "Data": entry }))),
        None => Err(ApiError::NotFound(format!("installer {installer_id} not found for {id} {version}"))),
    }
}

async fn load_installers(state: &AppState, id: &str, version: &str) -> Result<Vec<Value>, ApiError> {
    let paths = state.winget().version_manifest_paths(id, version).await?;
    let path = find_kind(&paths, id, |kind| kind == &ManifestKind::Installer)
        .ok_or_else(|| ApiError::NotFound(format!("no installer manifest for {id} {version}")))?;

    let bytes = state.winget().manifest_file(&path).await?;
    let manifest = parse_installer_manifest(&path, &bytes)?;

    Ok(manifest
        .installers
        .iter()
        .enumerate()
        .map(|(position, installer)| {
            let identifier = installer
                .installer_sha256
                .clone()
                .unwrap_or_else(|| position.to_string());
            let mut entry = serde_json::to_value(installer).expect("installer encodes");
            entry["InstallerIdentifier"] = Value::from(identifier);
            entry
        })
        .collect())
}

// ---- manifestSearch ----

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    query: Option<String>,
    #[serde(rename = "matchType")]
    match_type: Option<MatchType>,
    #[serde(rename = "maximumResults")]
    maximum_results: Option<usize>,
    #[serde(rename = "fetchAllManifests")]
    fetch_all_manifests: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    #[serde(rename = "Query")]
    query: Option<SearchBodyQuery>,
    #[serde(rename = "MaximumResults")]
    maximum_results: Option<usize>,
    #[serde(rename = "FetchAllManifests")]
    fetch_all_manifests: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBodyQuery {
    #[serde(rename = "KeyWord")]
    keyword: Option<String>,
    #[serde(rename = "MatchType")]
    match_type: Option<MatchType>,
}

/// `GET /registry/winget/manifestSearch`.
#[instrument(skip(state))]
pub async fn search_get(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    run_search(
        &state,
        query.query,
        query.match_type.unwrap_or_default(),
        query.maximum_results,
        query.fetch_all_manifests.unwrap_or(false),
    )
    .await
}

/// `POST /registry/winget/manifestSearch`.
#[instrument(skip(state, body))]
pub async fn search_post(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Value>, ApiError> {
    let (keyword, match_type) = match body.query {
        Some(query) => (query.keyword, query.match_type.unwrap_or_default()),
        None => (None, MatchType::default()),
    };
    run_search(
        &state,
        keyword,
        match_type,
        body.maximum_results,
        body.fetch_all_manifests.unwrap_or(false),
    )
    .await
}

/// Search is over `PackageIdentifier` only; version lists are capped at
/// the 10 newest per package, or just the newest unless the caller asks
/// for all manifests.
async fn run_search(
    state: &AppState,
    keyword: Option<String>,
    match_type: MatchType,
    maximum_results: Option<usize>,
    fetch_all_manifests: bool,
) -> Result<Json<Value>, ApiError> {
    let index = state.winget().package_index().await?;
    let keyword = keyword.unwrap_or_default();
    debug!(keyword = %keyword, ?match_type, packages = index.len(), "searching");

    let mut data = Vec::new();
    for (id, versions) in &index.packages {
        if !keyword.is_empty() && !match_type.is_match(&keyword, id) {
            continue;
        }

        let cap = if fetch_all_manifests { MAX_SEARCH_VERSIONS } else { 1 };
        let versions: Vec<Value> = versions
            .iter()
            .take(cap)
            .map(|v| json!({ "PackageVersion": v }))
            .collect();

        let (publisher, package_name) = split_identifier(id);
        data.push(json!({
            "PackageIdentifier": id,
            "PackageName": package_name,
            "Publisher": publisher,
            "Versions": versions,
        }));

        if let Some(max) = maximum_results {
            if data.len() >= max {
                break;
            }
        }
    }

    Ok(Json(json!({
        "Data": data,
        "RequiredPackageMatchFields": ["PackageIdentifier"],
        "UnsupportedPackageMatchFields": ["Market", "NormalizedPackageNameAndPublisher"],
    })))
}

/// Derive `(publisher, name)` from a dot-joined identifier.
fn split_identifier(id: &str) -> (&str, &str) {
    id.split_once('.').unwrap_or((id, id))
}

// ---- helpers ----

fn classify(path: &str, id: &str) -> Option<ManifestKind> {
    let filename = path.rsplit('/').next()?;
    classify_manifest(filename, id)
}

fn find_kind(paths: &[String], id: &str, want: impl Fn(&ManifestKind) -> bool) -> Option<String> {
    paths
        .iter()
        .find(|path| classify(path, id).as_ref().is_some_and(&want))
        .cloned()
}

fn encode_offset(offset: usize) -> String {
    BASE64.encode(offset.to_string())
}

fn decode_offset(token: Option<&str>) -> Result<usize, ApiError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(0);
    };
    let decoded = BASE64
        .decode(token)
        .map_err(|_| ApiError::BadRequest("malformed continuation token".to_string()))?;
    String::from_utf8(decoded)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("malformed continuation token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_tokens_roundtrip() {
        let token = encode_offset(300);
        assert_eq!(decode_offset(Some(&token)).unwrap(), 300);
        assert_eq!(decode_offset(None).unwrap(), 0);
        assert_eq!(decode_offset(Some("")).unwrap(), 0);
    }

    #[test]
    fn garbage_tokens_are_bad_requests() {
        assert!(decode_offset(Some("!!!not-base64!!!")).is_err());
        let not_a_number = BASE64.encode("abc");
        assert!(decode_offset(Some(&not_a_number)).is_err());
    }

    #[test]
    fn identifiers_split_on_the_first_dot() {
        assert_eq!(split_identifier("Microsoft.VisualStudioCode"), ("Microsoft", "VisualStudioCode"));
        assert_eq!(
            split_identifier("Microsoft.VisualStudio.Community"),
            ("Microsoft", "VisualStudio.Community"),
        );
        assert_eq!(split_identifier("NoDot"), ("NoDot", "NoDot"));
    }

    #[test]
    fn manifest_kinds_are_found_among_paths() {
        let paths = vec![
            "manifests/m/Microsoft/VisualStudioCode/1.85.2/Microsoft.VisualStudioCode.installer.yaml".to_string(),
            "manifests/m/Microsoft/VisualStudioCode/1.85.2/Microsoft.VisualStudioCode.locale.en-US.yaml".to_string(),
            "manifests/m/Microsoft/VisualStudioCode/1.85.2/Microsoft.VisualStudioCode.yaml".to_string(),
        ];
        let id = "Microsoft.VisualStudioCode";
        let version = find_kind(&paths, id, |kind| kind == &ManifestKind::Version).unwrap();
        assert!(version.ends_with("Microsoft.VisualStudioCode.yaml"));

        let locale = find_kind(&paths, id, |kind| matches!(kind, ManifestKind::Locale(l) if l == "en-US"));
        assert!(locale.is_some());
    }
}
