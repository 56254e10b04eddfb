//! Directory-backed file source.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::FileSource;
use crate::name::normalize_path;

/// A template tree rooted at a directory on disk.
///
/// The directory is walked on every call to [`walk`](FileSource::walk), so
/// files added, removed or edited between loads are picked up. Symlinks are
/// followed.
///
/// A missing root is not an error at construction time; it surfaces as a
/// walk error on the first load.
#[derive(Debug, Clone)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        Some(normalize_path(&relative.to_string_lossy()))
    }
}

impl FileSource for DiskSource {
    fn walk(&self) -> io::Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(relative) = self.relative(entry.path()) {
                files.push(relative);
            }
        }
        Ok(files)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
