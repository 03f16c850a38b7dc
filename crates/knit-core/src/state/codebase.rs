//! Ordered mapping from relative path to generated source text.

use serde::Serialize;

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Generated sources keyed by relative path, in insertion order.
///
/// Iteration follows the order files were inserted, which the generation
/// stage keeps identical to the planned file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Codebase {
    files: Vec<SourceFile>,
}

impl Codebase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file. Returns `false` and leaves the codebase unchanged if
    /// `path` is already present.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> bool {
        let path = path.into();
        if self.get(&path).is_some() {
            return false;
        }
        self.files.push(SourceFile {
            path,
            content: content.into(),
        });
        true
    }

    /// Look up the content generated for `path`.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of content lengths in bytes.
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }
}
