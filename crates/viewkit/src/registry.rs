//! Compiled template registry.
//!
//! A [`Registry`] is the result of one load: every template file under the
//! source, compiled by the backend and keyed by logical name. Registries are
//! immutable once built. A reload compiles a brand new registry and the
//! engine swaps it in as a whole, so a render never observes a mix of old
//! and new templates, and a failed load leaves the previous one in service.
//!
//! # Compilation order
//!
//! Files are compiled in lexicographic order of their relative path. When
//! two entries end up with the same logical name (a file and a sub-template,
//! or two paths that normalize identically) the one compiled last wins, so
//! the outcome is reproducible across machines.

use std::collections::BTreeSet;
use std::io;
use std::time::Instant;

use crate::backend::{Backend, SetOptions, TemplateSet};
use crate::error::ViewError;
use crate::name::logical_name;
use crate::source::FileSource;

/// A template file selected for compilation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateFile {
    /// Path relative to the source root, as reported by the source.
    pub path: String,
    /// Logical name derived from the path.
    pub name: String,
}

/// Lists the files under `source` ending with `suffix`, in compilation order.
pub fn discover(source: &dyn FileSource, suffix: &str) -> io::Result<Vec<TemplateFile>> {
    let mut files: Vec<TemplateFile> = source
        .walk()?
        .into_iter()
        .filter_map(|path| {
            let name = logical_name(&path, suffix)?;
            Some(TemplateFile { path, name })
        })
        .collect();
    files.sort();
    Ok(files)
}

/// An immutable, fully compiled set of templates.
pub struct Registry {
    set: Box<dyn TemplateSet>,
    names: BTreeSet<String>,
    loaded_at: Instant,
}

impl Registry {
    /// Walks `source`, compiles every matching file and returns the result.
    ///
    /// Any walk, read, encoding or syntax failure aborts the whole build.
    /// With `verbose` set, each compiled name is logged at `info` level.
    pub fn build(
        source: &dyn FileSource,
        suffix: &str,
        backend: &dyn Backend,
        options: &SetOptions<'_>,
        verbose: bool,
    ) -> Result<Self, ViewError> {
        let files = discover(source, suffix).map_err(ViewError::Walk)?;
        let mut set = backend.new_set(options)?;
        let mut names = BTreeSet::new();

        for file in files {
            let bytes = source.read(&file.path).map_err(|e| ViewError::Read {
                path: file.path.clone(),
                source: e,
            })?;
            let text = String::from_utf8(bytes).map_err(|e| ViewError::Encoding {
                path: file.path.clone(),
                source: e,
            })?;

            let declared = set.add(&file.name, text)?;

            if verbose {
                tracing::info!(template = %file.name, path = %file.path, "parsed template");
            } else {
                tracing::trace!(template = %file.name, path = %file.path, "parsed template");
            }
            for sub in &declared {
                tracing::trace!(template = %sub, parent = %file.name, "registered sub-template");
            }

            names.insert(file.name);
            names.extend(declared);
        }
        // A later file may have replaced one that declared sub-templates.
        names.retain(|name| set.contains(name));

        Ok(Self {
            set,
            names,
            loaded_at: Instant::now(),
        })
    }

    /// Whether `name` can be rendered.
    pub fn contains(&self, name: &str) -> bool {
        self.set.contains(name)
    }

    /// All renderable names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// When this registry finished compiling.
    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    /// Renders `name` into `out`. See [`TemplateSet::render`].
    pub fn render(
        &self,
        name: &str,
        data: &serde_json::Value,
        embed: Option<&str>,
        out: &mut dyn io::Write,
    ) -> Result<(), ViewError> {
        self.set.render(name, data, embed, out)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}
