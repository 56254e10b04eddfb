//! Where template files come from.
//!
//! The engine never touches the filesystem directly. It asks a [`FileSource`]
//! for the list of files below its root and for the contents of individual
//! files. Two sources ship with the crate:
//!
//! - [`DiskSource`]: a directory on disk, walked recursively on every load.
//!   Edits show up on the next load, which is what reload mode relies on.
//! - [`EmbeddedSource`]: `(path, contents)` pairs held in memory, typically
//!   baked into the binary with `include_str!`. No filesystem access at runtime.
//!
//! Both report paths relative to their root, `/`-separated, so the same tree
//! yields the same logical names regardless of where it lives.
//!
//! # Example
//!
//! ```rust
//! use viewkit::source::{EmbeddedSource, FileSource};
//!
//! static VIEWS: &[(&str, &str)] = &[
//!     ("index.html", "<h1>{{ Title }}</h1>"),
//!     ("layouts/main.html", "<body>{{ yield }}</body>"),
//! ];
//!
//! let source = EmbeddedSource::from_static(VIEWS);
//! assert_eq!(source.walk().unwrap(), vec!["index.html", "layouts/main.html"]);
//! ```

mod disk;
mod embedded;

pub use disk::DiskSource;
pub use embedded::EmbeddedSource;

use std::io;

/// A tree of template files.
///
/// Implementations must be shareable across threads: the engine may load
/// from several threads at once when reload-on-render is enabled.
pub trait FileSource: Send + Sync {
    /// Lists every file below the root, recursively.
    ///
    /// Paths are relative to the root and use `/` as separator. Filtering by
    /// suffix and ordering are the caller's job.
    fn walk(&self) -> io::Result<Vec<String>>;

    /// Reads a file by the relative path returned from [`walk`](Self::walk).
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Short human-readable description, used in log output.
    fn describe(&self) -> String;
}

impl<S: FileSource + ?Sized> FileSource for Box<S> {
    fn walk(&self) -> io::Result<Vec<String>> {
        (**self).walk()
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
