//! In-memory file source for embedded templates.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;

use super::FileSource;
use crate::name::normalize_path;

/// Template files held in memory.
///
/// Use this for single-binary deployments where templates are baked in at
/// compile time, or in tests that should not touch the filesystem.
///
/// Paths are normalized on insertion (`\` becomes `/`, leading `./` is
/// dropped), so `"layouts\\main.html"` and `"layouts/main.html"` are the same
/// entry. Inserting an existing path replaces its contents.
///
/// # Example
///
/// ```rust
/// use viewkit::source::{EmbeddedSource, FileSource};
///
/// let source = EmbeddedSource::new()
///     .with_file("index.html", "<h1>{{ Title }}</h1>")
///     .with_file("errors/404.html", "<h1>{{ Error }}</h1>");
///
/// assert_eq!(source.read("errors/404.html").unwrap(), b"<h1>{{ Error }}</h1>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    files: BTreeMap<String, Cow<'static, [u8]>>,
}

impl EmbeddedSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source from `(path, contents)` pairs baked into the binary.
    ///
    /// The contents are borrowed, not copied.
    pub fn from_static(entries: &'static [(&'static str, &'static str)]) -> Self {
        let files = entries
            .iter()
            .map(|(path, contents)| (normalize_path(path), Cow::Borrowed(contents.as_bytes())))
            .collect();
        Self { files }
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files
            .insert(normalize_path(path), Cow::Owned(contents.into()));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the source holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSource for EmbeddedSource {
    fn walk(&self) -> io::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(&normalize_path(path))
            .map(|contents| contents.to_vec())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no embedded file at '{}'", path),
                )
            })
    }

    fn describe(&self) -> String {
        format!("<embedded: {} files>", self.files.len())
    }
}
