//! Validation for planned file paths.

use std::fmt;
use std::path::{Component, Path};

/// Why a planned path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    /// Blank, or nothing left after dropping `.` segments.
    Empty,
    /// Rooted, or carries a drive/UNC prefix.
    Absolute,
    /// Contains a `..` segment.
    Traversal,
    /// Ends with a separator, so it names a directory.
    Directory,
}

impl fmt::Display for PathRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "path is empty",
            Self::Absolute => "path must be relative",
            Self::Traversal => "path must not contain `..` segments",
            Self::Directory => "path names a directory, not a file",
        };
        f.write_str(s)
    }
}

/// Validate a planned path and return it in normalized `a/b/c.ext` form.
pub fn normalize_relative_path(raw: &str) -> Result<String, PathRejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathRejection::Empty);
    }
    if trimmed.ends_with('/') || trimmed.ends_with('\\') {
        return Err(PathRejection::Directory);
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(s) => parts.push(s),
                None => return Err(PathRejection::Empty),
            },
            Component::CurDir => {}
            Component::ParentDir => return Err(PathRejection::Traversal),
            Component::RootDir | Component::Prefix(_) => return Err(PathRejection::Absolute),
        }
    }

    if parts.is_empty() {
        return Err(PathRejection::Empty);
    }
    Ok(parts.join("/"))
}

/// Whether normalized `path` lies strictly inside normalized `dir`.
pub fn is_nested_under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}
