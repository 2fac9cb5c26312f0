//! Gzipped-tar extraction with root-directory stripping.

use std::io::Cursor;
use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::trace;

use crate::error::Result;

/// One regular file pulled out of an upstream archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the stripped package root, no leading separator.
    pub path: String,
    /// Decompressed file contents.
    pub bytes: Bytes,
    /// Size declared in the tar header.
    pub declared_size: u64,
}

/// Extract every regular file from a gzipped tarball, in archive order.
///
/// Upstream tarballs wrap the package in a single synthetic root
/// directory. The root is taken from the first entry that contains a
/// separator and does not begin with `pax_global_header`, and exactly
/// that one leading segment is stripped. Archives with no root directory
/// at all are served as-is. Non-regular entries (directories, symlinks,
/// pax headers) are dropped; symlinks are never followed.
pub fn extract_entries(gzipped: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let decoder = GzDecoder::new(Cursor::new(gzipped));
    let mut archive = tar::Archive::new(decoder);

    let mut root: Option<String> = None;
    let mut entries = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let path = path.trim_start_matches("./").to_string();

        if root.is_none() && !path.starts_with("pax_global_header") {
            if let Some((first, _)) = path.split_once('/') {
                root = Some(first.to_string());
            }
        }

        if !entry.header().entry_type().is_file() {
            trace!(path, "skipping non-regular tar entry");
            continue;
        }

        let declared_size = entry.header().size()?;
        let mut bytes = Vec::with_capacity(declared_size as usize);
        entry.read_to_end(&mut bytes)?;

        let relative = match &root {
            Some(root) => match path.strip_prefix(root.as_str()).and_then(|rest| rest.strip_prefix('/')) {
                Some(rest) => rest.to_string(),
                None => path,
            },
            None => path,
        };
        if relative.is_empty() || relative.starts_with("pax_global_header") {
            continue;
        }

        entries.push(ArchiveEntry {
            path: relative,
            bytes: Bytes::from(bytes),
            declared_size,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    /// Build a gzipped tarball from `(path, contents)` pairs.
    fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        std::io::Write::write_all(&mut encoder, &tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn tarball_with_symlink(files: &[(&str, &[u8])], link: (&str, &str)) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_cksum();
        builder.append_link(&mut header, link.0, link.1).unwrap();
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        std::io::Write::write_all(&mut encoder, &tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn strips_single_root_directory() {
        let archive = tarball(&[
            ("package/package.json", b"{}"),
            ("package/dist/index.js", b"export default 1;"),
        ]);
        let entries = extract_entries(&archive).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["package.json", "dist/index.js"]);
        assert!(entries.iter().all(|e| !e.path.starts_with('/')));
    }

    #[test]
    fn github_style_root_is_stripped() {
        let archive = tarball(&[
            ("core-3.4.0/package.json", b"{}"),
            ("core-3.4.0/src/index.ts", b"export {}"),
        ]);
        let entries = extract_entries(&archive).unwrap();
        assert_eq!(entries[0].path, "package.json");
        assert_eq!(entries[1].path, "src/index.ts");
    }

    #[test]
    fn pax_global_header_does_not_become_the_root() {
        let archive = tarball(&[
            ("pax_global_header", b""),
            ("repo-abc123/readme.md", b"# hi"),
        ]);
        let entries = extract_entries(&archive).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "readme.md");
    }

    #[test]
    fn flat_archive_is_served_as_is() {
        let archive = tarball(&[("index.js", b"1"), ("readme.md", b"2")]);
        let entries = extract_entries(&archive).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["index.js", "readme.md"]);
    }

    #[test]
    fn symlinks_are_dropped() {
        let archive = tarball_with_symlink(
            &[("package/real.js", b"real")],
            ("package/alias.js", "real.js"),
        );
        let entries = extract_entries(&archive).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "real.js");
    }

    #[test]
    fn declared_size_matches_contents() {
        let archive = tarball(&[("package/a.txt", b"four")]);
        let entries = extract_entries(&archive).unwrap();
        assert_eq!(entries[0].declared_size, 4);
        assert_eq!(entries[0].bytes.len(), 4);
    }

    #[test]
    fn extraction_is_deterministic() {
        let archive = tarball(&[
            ("package/a.js", b"a"),
            ("package/b/c.js", b"c"),
        ]);
        let first = extract_entries(&archive).unwrap();
        let second = extract_entries(&archive).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn garbage_input_errors_cleanly() {
        assert!(extract_entries(b"not a tarball").is_err());
    }
}
