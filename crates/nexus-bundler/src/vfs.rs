//! The virtual filesystem the transform resolves against.

use std::collections::BTreeMap;

/// An in-memory view of a package's cached files.
///
/// Paths are root-relative with no leading separator, matching the
/// package manifest. Specifier resolution follows Node-style lookup:
/// the exact path, then `.js` / `.mjs` / `.json` extensions, then the
/// directory's `index.js`.
#[derive(Debug, Clone, Default)]
pub struct VirtualFs {
    files: BTreeMap<String, String>,
}

impl VirtualFs {
    /// An empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(normalize(&path.into()), contents.into());
    }

    /// Read one file by exact path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize(path)).map(String::as_str)
    }

    /// Resolve a relative specifier against the directory of the
    /// importing module.
    ///
    /// `/virtual/<name>/...` specifiers are treated as package-root
    /// absolute after the prefix is dropped.
    pub fn resolve(&self, importer_dir: &str, specifier: &str) -> Option<String> {
        let joined = if let Some(rest) = strip_virtual_prefix(specifier) {
            rest.to_string()
        } else {
            join(importer_dir, specifier)
        };
        self.lookup(&joined)
    }

    fn lookup(&self, path: &str) -> Option<String> {
        let path = normalize(path);
        if self.files.contains_key(&path) {
            return Some(path);
        }
        for ext in [".js", ".mjs", ".json"] {
            let candidate = format!("{path}{ext}");
            if self.files.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        let index = format!("{path}/index.js");
        self.files.contains_key(&index).then_some(index)
    }
}

/// Drop a `/virtual/<name>/` prefix, leaving the package-relative path.
fn strip_virtual_prefix(specifier: &str) -> Option<&str> {
    let rest = specifier.strip_prefix("/virtual/")?;
    rest.split_once('/').map(|(_, path)| path)
}

/// Join a directory and a relative specifier, collapsing `.` and `..`.
fn join(dir: &str, specifier: &str) -> String {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in specifier.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}
