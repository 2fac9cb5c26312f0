//! GitHub git-tree API payload shapes.

use serde::Deserialize;

/// One entry of a git tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the listed tree.
    pub path: String,
    /// Object SHA.
    pub sha: String,
    /// `blob` or `tree`.
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl TreeEntry {
    /// Whether this entry is a sub-tree (directory).
    pub fn is_tree(&self) -> bool {
        self.entry_type == "tree"
    }

    /// Whether this entry is a file blob.
    pub fn is_blob(&self) -> bool {
        self.entry_type == "blob"
    }
}

/// Response body of `GET /repos/{owner}/{repo}/git/trees/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeResponse {
    /// The listed entries.
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// Set by the API when a recursive listing was cut short.
    #[serde(default)]
    pub truncated: bool,
}
