//! Discovery of `.proto` sources under a root directory.

use crate::error::{Result, SchemaError};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default file name pattern for protobuf sources.
pub const DEFAULT_PROTO_PATTERN: &str = "*.proto";

/// Recursively find every regular file under `root` whose file name matches `pattern`.
///
/// Entries are visited in file-name order within each directory, so the result is
/// stable between runs over the same tree. Returned paths are prefixed with `root`.
pub fn find_proto_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = Pattern::new(pattern).map_err(|e| SchemaError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut matches = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            let source = e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected")
            });
            SchemaError::io(path, source)
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if matcher.matches(&entry.file_name().to_string_lossy()) {
            matches.push(entry.into_path());
        }
    }

    tracing::debug!(
        "Found {} files matching '{}' under {}",
        matches.len(),
        pattern,
        root.display()
    );

    Ok(matches)
}
