//! Ordered input file sets

use std::path::{Path, PathBuf};

/// The files of one run, in insertion order with repeated paths dropped.
///
/// Paths are compared as given; two spellings of the same file are two
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    paths: Vec<PathBuf>,
}

impl FileSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path; returns `false` if it was already present
    pub fn insert<P: Into<PathBuf>>(&mut self, path: P) -> bool {
        let path = path.into();
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Paths in run order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Iterate over the paths in run order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for FileSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = FileSet::new();
        set.extend(iter);
        set
    }
}

impl<P: Into<PathBuf>> Extend<P> for FileSet {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}
