//! The upstream HTTP client.

use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::instrument;

use crate::error::Result;
use crate::error::UpstreamError;
use crate::github::TreeEntry;
use crate::github::TreeResponse;
use crate::npm::Packument;

/// Deadline for JSON metadata endpoints.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for tarball and file-content downloads.
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(30);

const NPM_REGISTRY: &str = "https://registry.npmjs.org";
const JSR_NPM_REGISTRY: &str = "https://npm.jsr.io";
const CDNJS_API: &str = "https://api.cdnjs.com/libraries";
const CDNJS_CONTENT: &str = "https://cdnjs.cloudflare.com/ajax/libs";
const JSDELIVR_DATA: &str = "https://data.jsdelivr.com/v1/packages/gh";
const GITHUB_API: &str = "https://api.github.com";
const GITHUB_CODELOAD: &str = "https://codeload.github.com";
const GITHUB_RAW: &str = "https://raw.githubusercontent.com";
const WP_PLUGINS_SVN: &str = "https://plugins.svn.wordpress.org";
const WP_THEMES_SVN: &str = "https://themes.svn.wordpress.org";

/// cdnjs library metadata: the fields the gateway asks for.
#[derive(Debug, Clone, Deserialize)]
pub struct CdnjsLibrary {
    /// Published versions.
    #[serde(default)]
    pub versions: Vec<String>,
    /// Default entry file for the library.
    #[serde(default)]
    pub filename: Option<String>,
}

/// cdnjs per-version metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct CdnjsVersion {
    /// Files published at this version.
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsdelivrPackage {
    #[serde(default)]
    versions: Vec<JsdelivrVersion>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsdelivrVersion {
    version: String,
}

/// Typed client over every upstream the gateway talks to.
///
/// Cheap to clone; the inner `reqwest::Client` is pooled.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    github_token: Option<String>,
}

impl UpstreamClient {
    /// Build a client. `github_token` authenticates GitHub API calls when
    /// present, which raises the unauthenticated rate limit considerably.
    pub fn new(github_token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nexus-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Unavailable {
                url: "(client init)".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { http, github_token })
    }

    /// Fetch the npm packument for `name` (scoped names included).
    #[instrument(skip(self))]
    pub async fn npm_packument(&self, name: &str) -> Result<Packument> {
        let url = format!("{NPM_REGISTRY}/{}", encode_package_name(name));
        self.get_json(&url).await
    }

    /// Fetch a JSR package's packument through the npm-compat registry.
    ///
    /// JSR's `@scope/pkg` maps to `@jsr/scope__pkg` on `npm.jsr.io`.
    #[instrument(skip(self))]
    pub async fn jsr_packument(&self, name: &str) -> Result<Packument> {
        let url = format!("{JSR_NPM_REGISTRY}/{}", encode_package_name(&jsr_compat_name(name)));
        self.get_json(&url).await
    }

    /// Download a tarball by its packument-provided URL.
    #[instrument(skip(self))]
    pub async fn tarball(&self, url: &str) -> Result<Bytes> {
        self.get_bytes(url, ARCHIVE_TIMEOUT).await
    }

    /// The canonical npm tarball URL for a published version.
    ///
    /// npm tarballs follow `<registry>/<name>/-/<basename>-<version>.tgz`
    /// where `basename` is the name without its scope.
    pub fn npm_tarball_url(name: &str, version: &str) -> String {
        let basename = name.rsplit_once('/').map(|(_, base)| base).unwrap_or(name);
        format!("{NPM_REGISTRY}/{name}/-/{basename}-{version}.tgz")
    }

    /// Look up the tarball URL for a JSR package version.
    ///
    /// JSR's npm-compat tarball URLs are not constructible, so the
    /// packument's `dist.tarball` is consulted.
    #[instrument(skip(self))]
    pub async fn jsr_tarball_url(&self, name: &str, version: &str) -> Result<String> {
        let packument = self.jsr_packument(name).await?;
        let url = packument
            .versions
            .get(version)
            .map(|v| v.dist.tarball.clone())
            .filter(|url| !url.is_empty());
        url.ok_or_else(|| UpstreamError::NotFound {
            url: format!("{JSR_NPM_REGISTRY}/{name}@{version}"),
        })
    }

    /// Download a GitHub source tarball for any ref (tag, branch, SHA).
    #[instrument(skip(self))]
    pub async fn github_tarball(&self, owner: &str, repo: &str, reference: &str) -> Result<Bytes> {
        let url = format!("{GITHUB_CODELOAD}/{owner}/{repo}/tar.gz/{reference}");
        self.get_bytes(&url, ARCHIVE_TIMEOUT).await
    }

    /// List a GitHub repo's published versions via the jsDelivr data API.
    #[instrument(skip(self))]
    pub async fn github_versions(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let url = format!("{JSDELIVR_DATA}/{owner}/{repo}");
        let package: JsdelivrPackage = self.get_json(&url).await?;
        Ok(package.versions.into_iter().map(|v| v.version).collect())
    }

    /// List a git tree by SHA or ref name, optionally recursively.
    #[instrument(skip(self))]
    pub async fn git_tree(
        &self,
        owner: &str,
        repo: &str,
        sha_or_ref: &str,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>> {
        let mut url = format!("{GITHUB_API}/repos/{owner}/{repo}/git/trees/{sha_or_ref}");
        if recursive {
            url.push_str("?recursive=1");
        }

        let mut request = self.http.get(&url).timeout(METADATA_TIMEOUT);
        if let Some(token) = &self.github_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| transport(&url, e))?;
        let response = check_status(&url, response)?;

        let tree: TreeResponse = response.json().await.map_err(|e| UpstreamError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if tree.truncated {
            debug!(url = %url, "git tree listing truncated by upstream");
        }
        Ok(tree.tree)
    }

    /// Fetch one file from a GitHub repo at a branch path.
    #[instrument(skip(self))]
    pub async fn github_raw(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<Bytes> {
        let url = format!("{GITHUB_RAW}/{owner}/{repo}/{branch}/{path}");
        self.get_bytes(&url, ARCHIVE_TIMEOUT).await
    }

    /// Fetch cdnjs library metadata (version list + default filename).
    #[instrument(skip(self))]
    pub async fn cdnjs_library(&self, library: &str) -> Result<CdnjsLibrary> {
        let url = format!("{CDNJS_API}/{library}?fields=versions,filename");
        self.get_json(&url).await
    }

    /// Fetch the file list of one cdnjs library version.
    #[instrument(skip(self))]
    pub async fn cdnjs_version(&self, library: &str, version: &str) -> Result<CdnjsVersion> {
        let url = format!("{CDNJS_API}/{library}/{version}?fields=files");
        self.get_json(&url).await
    }

    /// Fetch one file of a cdnjs library version.
    #[instrument(skip(self))]
    pub async fn cdnjs_file(&self, library: &str, version: &str, path: &str) -> Result<Bytes> {
        let url = format!("{CDNJS_CONTENT}/{library}/{version}/{path}");
        self.get_bytes(&url, ARCHIVE_TIMEOUT).await
    }

    /// Fetch one file from WordPress plugin SVN.
    ///
    /// `version_path` is `tags/<version>` or `trunk`, straight from the
    /// request URL.
    #[instrument(skip(self))]
    pub async fn wp_plugin_file(&self, slug: &str, version_path: &str, path: &str) -> Result<Bytes> {
        let url = format!("{WP_PLUGINS_SVN}/{slug}/{version_path}/{path}");
        self.get_bytes(&url, ARCHIVE_TIMEOUT).await
    }

    /// Fetch one file from WordPress theme SVN.
    #[instrument(skip(self))]
    pub async fn wp_theme_file(&self, slug: &str, version: &str, path: &str) -> Result<Bytes> {
        let url = format!("{WP_THEMES_SVN}/{slug}/{version}/{path}");
        self.get_bytes(&url, ARCHIVE_TIMEOUT).await
    }

    /// Plain GET for the mirror passthrough.
    ///
    /// No status mapping: the mirror reflects upstream status and body
    /// verbatim, so the raw response is handed back as long as the
    /// transport itself worked.
    pub async fn proxy_get(&self, url: &str) -> Result<reqwest::Response> {
        self.http
            .get(url)
            .timeout(ARCHIVE_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport(url, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        let response = check_status(url, response)?;
        response.json().await.map_err(|e| UpstreamError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Bytes> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        let response = check_status(url, response)?;
        response.bytes().await.map_err(|e| transport(url, e))
    }
}

/// Map a response status: 4xx means the resource does not exist upstream,
/// anything else non-2xx means the upstream is unhealthy.
fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_client_error() {
        Err(UpstreamError::NotFound { url: url.to_string() })
    } else {
        Err(UpstreamError::Unavailable {
            url: url.to_string(),
            message: format!("upstream answered {status}"),
        })
    }
}

fn transport(url: &str, e: reqwest::Error) -> UpstreamError {
    UpstreamError::Unavailable {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Encode a package name for use as one registry path segment.
///
/// Scoped names keep their `@` but the scope separator is encoded, which
/// is the form the npm registry expects.
fn encode_package_name(name: &str) -> String {
    name.replace('/', "%2F")
}

/// Map a JSR `@scope/pkg` name to its npm-compat alias.
fn jsr_compat_name(name: &str) -> String {
    let stripped = name.strip_prefix('@').unwrap_or(name);
    match stripped.split_once('/') {
        Some((scope, pkg)) => format!("@jsr/{scope}__{pkg}"),
        None => format!("@jsr/{stripped}"),
    }
}
