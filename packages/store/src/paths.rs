#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the cache directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the default `data/cache/` directory for identity blobs.
#[must_use]
pub fn cache_dir() -> PathBuf {
    project_root().join("data").join("cache")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Maps an identity namespace to a single safe path component.
///
/// User ids come from the server and are not trusted as file names;
/// anything outside `[A-Za-z0-9_-]` becomes `_`, so the result can never
/// be a traversal component or hidden directory.
#[must_use]
pub fn sanitize_namespace(namespace: &str) -> String {
    let mut out: String = namespace
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_passes_plain_ids() {
        assert_eq!(sanitize_namespace("guest"), "guest");
        assert_eq!(sanitize_namespace("u-42"), "u-42");
    }

    #[test]
    fn sanitize_neutralizes_separators() {
        assert_eq!(sanitize_namespace("../../etc"), "______etc");
        assert_eq!(sanitize_namespace("a/b\\c"), "a_b_c");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_namespace(""), "_");
    }
}
