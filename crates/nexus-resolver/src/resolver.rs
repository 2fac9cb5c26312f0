//! The resolver: specifier in, concrete cacheable key out.

use std::collections::BTreeMap;

use tracing::debug;
use tracing::instrument;

use nexus_upstream::UpstreamClient;

use crate::ecosystem::Ecosystem;
use crate::error::ResolveError;
use crate::error::Result;
use crate::error::VersionNotFoundSnafu;
use crate::key::PackageKey;
use crate::key::is_commit_sha;
use crate::version::pick_version;

/// A resolved package coordinate plus its cache policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The concrete key.
    pub key: PackageKey,
    /// Derived from the resolved version string, never from the input.
    pub immutable: bool,
}

impl Resolved {
    fn from_key(key: PackageKey) -> Self {
        let immutable = key.is_immutable();
        Self { key, immutable }
    }
}

/// Canonicalizes `(ecosystem, name, version-spec)` triples against
/// upstream metadata.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: UpstreamClient,
}

impl Resolver {
    /// Build a resolver over the shared upstream client.
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Resolve a version specifier to a concrete [`PackageKey`].
    ///
    /// `spec` may be a concrete version, a semver range, an alias such
    /// as `latest`, a branch name (GitHub), or absent. A literal
    /// complete version passes through without a metadata round-trip;
    /// everything else resolves against the upstream's version set.
    #[instrument(skip(self))]
    pub async fn resolve(&self, ecosystem: Ecosystem, name: &str, spec: Option<&str>) -> Result<Resolved> {
        if let Some(spec) = spec {
            let candidate = PackageKey::new(ecosystem, name, spec);
            if candidate.is_immutable() && !matches!(ecosystem, Ecosystem::Wp | Ecosystem::Winget) {
                return Ok(Resolved::from_key(candidate));
            }
        }

        let resolved = match ecosystem {
            Ecosystem::Npm => {
                let packument = self
                    .client
                    .npm_packument(name)
                    .await
                    .map_err(|e| ResolveError::from_upstream(name, e))?;
                self.from_version_set(ecosystem, name, spec, &packument.version_strings(), &packument.dist_tags)?
            }
            Ecosystem::Jsr => {
                let packument = self
                    .client
                    .jsr_packument(name)
                    .await
                    .map_err(|e| ResolveError::from_upstream(name, e))?;
                self.from_version_set(ecosystem, name, spec, &packument.version_strings(), &packument.dist_tags)?
            }
            Ecosystem::Gh => return self.resolve_github(name, spec).await,
            Ecosystem::Cdnjs => {
                let library = self
                    .client
                    .cdnjs_library(name)
                    .await
                    .map_err(|e| ResolveError::from_upstream(name, e))?;
                self.from_version_set(ecosystem, name, spec, &library.versions, &BTreeMap::new())?
            }
            // WordPress and WinGet carry the concrete version in the URL
            // itself; nothing to consult upstream for.
            Ecosystem::Wp | Ecosystem::Winget => {
                let version = spec.filter(|s| !s.is_empty()).unwrap_or("trunk");
                Resolved::from_key(PackageKey::new(ecosystem, name, version))
            }
        };

        debug!(key = %resolved.key, immutable = resolved.immutable, "resolved");
        Ok(resolved)
    }

    /// GitHub resolution: commit SHAs pass through without a metadata
    /// fetch, tag specifiers resolve against the jsDelivr version list,
    /// and anything left over is treated as a branch name (mutable).
    async fn resolve_github(&self, name: &str, spec: Option<&str>) -> Result<Resolved> {
        if let Some(spec) = spec {
            if is_commit_sha(spec) {
                return Ok(Resolved::from_key(PackageKey::new(Ecosystem::Gh, name, spec)));
            }
        }

        let versions = self
            .client
            .github_versions(github_owner(name), github_repo(name))
            .await
            .map_err(|e| ResolveError::from_upstream(name, e))?;

        if let Some(version) = pick_version(&versions, &BTreeMap::new(), spec) {
            return Ok(Resolved::from_key(PackageKey::new(Ecosystem::Gh, name, version)));
        }

        // The repo exists (the listing succeeded) but the spec matched no
        // published tag: a branch name like `main` or `dev`.
        match spec.filter(|s| !s.is_empty()) {
            Some(branch) => Ok(Resolved::from_key(PackageKey::new(Ecosystem::Gh, name, branch))),
            None => VersionNotFoundSnafu {
                name,
                spec: spec.unwrap_or("latest"),
            }
            .fail(),
        }
    }

    fn from_version_set(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        spec: Option<&str>,
        versions: &[String],
        dist_tags: &BTreeMap<String, String>,
    ) -> Result<Resolved> {
        match pick_version(versions, dist_tags, spec) {
            Some(version) => Ok(Resolved::from_key(PackageKey::new(ecosystem, name, version))),
            None => VersionNotFoundSnafu {
                name,
                spec: spec.unwrap_or("latest"),
            }
            .fail(),
        }
    }
}

fn github_owner(name: &str) -> &str {
    name.split_once('/').map(|(owner, _)| owner).unwrap_or(name)
}

fn github_repo(name: &str) -> &str {
    name.split_once('/').map(|(_, repo)| repo).unwrap_or("")
}
