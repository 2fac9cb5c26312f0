//! WinGet manifest decoding.
//!
//! Manifest YAML arrives schemaless; the fields the registry surface
//! serves are decoded into small typed structs and the rest is dropped
//! at the boundary. A version directory holds up to three manifest
//! shapes, distinguished by filename suffix.

use serde::Deserialize;
use serde::Serialize;

use crate::error::InvalidManifestSnafu;
use crate::error::Result;

/// What role a manifest file plays within its version directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    /// `<id>.yaml` — the primary version manifest.
    Version,
    /// `<id>.installer.yaml`.
    Installer,
    /// `<id>.locale.<locale>.yaml`.
    Locale(String),
}

/// Classify a manifest filename relative to its package identifier.
///
/// Files that do not follow the upstream naming convention yield `None`
/// and are ignored by the registry surface.
pub fn classify_manifest(filename: &str, id: &str) -> Option<ManifestKind> {
    let stem = filename.strip_suffix(".yaml")?;
    if stem == id {
        return Some(ManifestKind::Version);
    }
    let rest = stem.strip_prefix(id)?.strip_prefix('.')?;
    if rest == "installer" {
        return Some(ManifestKind::Installer);
    }
    rest.strip_prefix("locale.").map(|locale| ManifestKind::Locale(locale.to_string()))
}

/// The primary version manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManifest {
    /// Dot-joined publisher and name.
    #[serde(rename = "PackageIdentifier")]
    pub package_identifier: String,
    /// The version this directory describes.
    #[serde(rename = "PackageVersion")]
    pub package_version: String,
    /// Locale of the default locale manifest.
    #[serde(rename = "DefaultLocale", default)]
    pub default_locale: Option<String>,
    /// `version`, `singleton`, ...
    #[serde(rename = "ManifestType", default)]
    pub manifest_type: Option<String>,
    /// Schema version of the manifest itself.
    #[serde(rename = "ManifestVersion", default)]
    pub manifest_version: Option<String>,
}

/// A locale manifest (default or additional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleManifest {
    #[serde(rename = "PackageIdentifier")]
    pub package_identifier: String,
    #[serde(rename = "PackageVersion")]
    pub package_version: String,
    #[serde(rename = "PackageLocale")]
    pub package_locale: String,
    #[serde(rename = "Publisher", default)]
    pub publisher: Option<String>,
    #[serde(rename = "PackageName", default)]
    pub package_name: Option<String>,
    #[serde(rename = "License", default)]
    pub license: Option<String>,
    #[serde(rename = "ShortDescription", default)]
    pub short_description: Option<String>,
    #[serde(rename = "PackageUrl", default)]
    pub package_url: Option<String>,
    #[serde(rename = "PublisherUrl", default)]
    pub publisher_url: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,
}

/// The installer manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerManifest {
    #[serde(rename = "PackageIdentifier")]
    pub package_identifier: String,
    #[serde(rename = "PackageVersion")]
    pub package_version: String,
    /// Fields shared by every installer, hoisted to the manifest root.
    #[serde(rename = "InstallerType", default)]
    pub installer_type: Option<String>,
    #[serde(rename = "Installers", default)]
    pub installers: Vec<Installer>,
}

/// One installer artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installer {
    #[serde(rename = "Architecture", default)]
    pub architecture: Option<String>,
    #[serde(rename = "InstallerType", default)]
    pub installer_type: Option<String>,
    #[serde(rename = "InstallerUrl", default)]
    pub installer_url: Option<String>,
    #[serde(rename = "InstallerSha256", default)]
    pub installer_sha256: Option<String>,
    #[serde(rename = "Scope", default)]
    pub scope: Option<String>,
    #[serde(rename = "InstallerLocale", default)]
    pub installer_locale: Option<String>,
}

/// Decode a version manifest, labeling failures with the source path.
pub fn parse_version_manifest(path: &str, bytes: &[u8]) -> Result<VersionManifest> {
    serde_yaml::from_slice(bytes).map_err(|e| {
        InvalidManifestSnafu {
            path,
            message: e.to_string(),
        }
        .build()
    })
}

/// Decode a locale manifest.
pub fn parse_locale_manifest(path: &str, bytes: &[u8]) -> Result<LocaleManifest> {
    serde_yaml::from_slice(bytes).map_err(|e| {
        InvalidManifestSnafu {
            path,
            message: e.to_string(),
        }
        .build()
    })
}

/// Decode an installer manifest.
pub fn parse_installer_manifest(path: &str, bytes: &[u8]) -> Result<InstallerManifest> {
    serde_yaml::from_slice(bytes).map_err(|e| {
        InvalidManifestSnafu {
            path,
            message: e.to_string(),
        }
        .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_filename_suffixes() {
        let id = "Microsoft.VisualStudioCode";
        assert_eq!(
            classify_manifest("Microsoft.VisualStudioCode.yaml", id),
            Some(ManifestKind::Version),
        );
        assert_eq!(
            classify_manifest("Microsoft.VisualStudioCode.installer.yaml", id),
            Some(ManifestKind::Installer),
        );
        assert_eq!(
            classify_manifest("Microsoft.VisualStudioCode.locale.en-US.yaml", id),
            Some(ManifestKind::Locale("en-US".to_string())),
        );
        assert_eq!(classify_manifest("SomethingElse.yaml", id), None);
        assert_eq!(classify_manifest("Microsoft.VisualStudioCode.json", id), None);
    }

    #[test]
    fn version_manifest_decodes() {
        let yaml = b"PackageIdentifier: Microsoft.VisualStudioCode\nPackageVersion: 1.85.2\nDefaultLocale: en-US\nManifestType: version\nManifestVersion: 1.6.0\n";
        let manifest = parse_version_manifest("manifests/m/x.yaml", yaml).unwrap();
        assert_eq!(manifest.package_identifier, "Microsoft.VisualStudioCode");
        assert_eq!(manifest.default_locale.as_deref(), Some("en-US"));
    }

    #[test]
    fn installer_manifest_decodes_installer_list() {
        let yaml = b"PackageIdentifier: Microsoft.VisualStudioCode\nPackageVersion: 1.85.2\nInstallers:\n- Architecture: x64\n  InstallerUrl: https://example.com/a.exe\n  InstallerSha256: abc\n- Architecture: arm64\n  InstallerUrl: https://example.com/b.exe\n";
        let manifest = parse_installer_manifest("p", yaml).unwrap();
        assert_eq!(manifest.installers.len(), 2);
        assert_eq!(manifest.installers[0].architecture.as_deref(), Some("x64"));
    }

    #[test]
    fn locale_manifest_tolerates_missing_optionals() {
        let yaml = b"PackageIdentifier: A.B\nPackageVersion: 1.0\nPackageLocale: en-US\n";
        let manifest = parse_locale_manifest("p", yaml).unwrap();
        assert_eq!(manifest.package_locale, "en-US");
        assert!(manifest.tags.is_empty());
    }

    #[test]
    fn malformed_yaml_is_an_invalid_manifest() {
        let err = parse_version_manifest("manifests/m/x.yaml", b": not yaml :").unwrap_err();
        assert!(err.to_string().contains("manifests/m/x.yaml"));
    }
}
