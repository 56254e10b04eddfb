//! The view engine.
//!
//! [`Engine`] ties a [`FileSource`], a [`Backend`] and a [`FuncMap`] together.
//! It compiles the whole template tree into a [`Registry`] on
//! [`load`](Engine::load) and renders named templates, optionally wrapped in
//! a layout, with [`render`](Engine::render).
//!
//! # Lifecycle
//!
//! Configure the engine with the `&mut self` setters, then share it (for
//! example behind an `Arc`) and render from as many threads as needed.
//!
//! ```rust,no_run
//! use viewkit::Engine;
//! use serde_json::json;
//!
//! let mut engine = Engine::new("./views", ".html");
//! engine.reload(cfg!(debug_assertions)).debug(true);
//! engine.load()?;
//!
//! let mut out = Vec::new();
//! engine.render(&mut out, "index", &json!({"Title": "Hello, World!"}), Some("layouts/main"))?;
//! # Ok::<(), viewkit::ViewError>(())
//! ```
//!
//! # Reloading
//!
//! With [`reload`](Engine::reload) off (the default) the registry is
//! compiled once and reused, even if files change on disk. With reload on,
//! every render recompiles the tree first, so edits show up immediately at
//! the cost of throughput.
//!
//! Changing helpers, delimiters or the placeholder marks the engine stale:
//! already compiled templates keep working, and the next render loads again.
//! A render on an engine that was never loaded also loads first.
//!
//! # Concurrency
//!
//! The active registry sits behind a read-mostly lock. A render clones the
//! current `Arc<Registry>` and releases the lock before executing anything;
//! a load compiles without holding the lock and only takes it to swap the
//! new registry in. Readers see either the old or the new registry, never a
//! mix. Loads are numbered when they start; a load that finishes after a
//! later-started one has been installed is discarded, so the installed
//! templates never move backwards.
//!
//! # Partial output
//!
//! Lookups happen before execution, so a missing template or layout never
//! writes anything. A direct render streams into the sink: if execution fails
//! midway, whatever was already written stays written. A layout render
//! buffers the inner template, so an inner failure writes nothing.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::backend::{Backend, Delims, JinjaBackend, SetOptions};
use crate::error::ViewError;
use crate::funcs::{FuncMap, Helper};
use crate::registry::Registry;
use crate::source::{DiskSource, FileSource};

/// Default name under which layouts receive the inner template's output.
pub const DEFAULT_PLACEHOLDER: &str = "yield";

/// Compiles and renders a tree of view templates.
pub struct Engine {
    source: Box<dyn FileSource>,
    suffix: String,
    backend: Box<dyn Backend>,
    funcs: FuncMap,
    delims: Option<Delims>,
    placeholder: String,
    strict: bool,
    reload: bool,
    debug: bool,
    registry: RwLock<Installed>,
    /// Number of loads started so far.
    builds: AtomicU64,
    /// Set until the first load and whenever configuration changes.
    stale: AtomicBool,
}

/// The active registry and the number of the load that built it.
#[derive(Default)]
struct Installed {
    generation: u64,
    registry: Option<Arc<Registry>>,
}

impl Engine {
    /// Creates an engine over a directory on disk, using MiniJinja.
    ///
    /// `suffix` selects template files (`".html"`, `".jinja"`, ...) and is
    /// stripped from their logical names.
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self::from_source(DiskSource::new(root), suffix)
    }

    /// Creates an engine over any file source, using MiniJinja.
    pub fn from_source(source: impl FileSource + 'static, suffix: impl Into<String>) -> Self {
        Self::with_backend(source, suffix, JinjaBackend::new())
    }

    /// Creates an engine over any file source with an explicit backend.
    pub fn with_backend(
        source: impl FileSource + 'static,
        suffix: impl Into<String>,
        backend: impl Backend + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            suffix: suffix.into(),
            backend: Box::new(backend),
            funcs: FuncMap::new(),
            delims: None,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            strict: true,
            reload: false,
            debug: false,
            registry: RwLock::new(Installed::default()),
            builds: AtomicU64::new(0),
            stale: AtomicBool::new(true),
        }
    }

    /// Enables or disables reload-on-render.
    pub fn reload(&mut self, enabled: bool) -> &mut Self {
        self.reload = enabled;
        self
    }

    /// Enables or disables logging every compiled template name at `info`.
    pub fn debug(&mut self, enabled: bool) -> &mut Self {
        self.debug = enabled;
        self
    }

    /// Overrides the action delimiters of the backend.
    pub fn delims(&mut self, left: impl Into<String>, right: impl Into<String>) -> &mut Self {
        self.delims = Some(Delims::new(left, right));
        self.invalidate()
    }

    /// Renames the layout placeholder (default `"yield"`).
    pub fn layout_placeholder(&mut self, name: impl Into<String>) -> &mut Self {
        self.placeholder = name.into();
        self.invalidate()
    }

    /// Whether undefined variables are an error (default) or render empty.
    pub fn strict(&mut self, enabled: bool) -> &mut Self {
        self.strict = enabled;
        self.invalidate()
    }

    /// Registers a helper callable from templates.
    ///
    /// An existing helper with the same name is replaced. Templates compiled
    /// before this call do not see the helper until the next load.
    pub fn add_func<H>(&mut self, name: impl Into<String>, helper: H) -> &mut Self
    where
        H: Helper + 'static,
    {
        self.funcs.insert(name, helper);
        self.invalidate()
    }

    /// Registers several helpers at once; entries replace same-named ones.
    pub fn add_func_map(&mut self, funcs: FuncMap) -> &mut Self {
        self.funcs.extend(funcs);
        self.invalidate()
    }

    /// The current helper table.
    pub fn func_map(&self) -> &FuncMap {
        &self.funcs
    }

    /// The configured file suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether reload-on-render is enabled.
    pub fn is_reloading(&self) -> bool {
        self.reload
    }

    fn invalidate(&mut self) -> &mut Self {
        *self.stale.get_mut() = true;
        self
    }

    /// Compiles the whole template tree and installs it.
    ///
    /// On failure the previously installed registry, if any, stays active.
    /// Calling `load` again with unchanged files is harmless.
    pub fn load(&self) -> Result<(), ViewError> {
        self.load_registry().map(|_| ())
    }

    fn load_registry(&self) -> Result<Arc<Registry>, ViewError> {
        let _span = tracing::debug_span!(
            "load",
            source = %self.source.describe(),
            backend = self.backend.name(),
        )
        .entered();

        let generation = self.builds.fetch_add(1, Ordering::AcqRel) + 1;
        let options = SetOptions {
            funcs: &self.funcs,
            delims: self.delims.as_ref(),
            placeholder: &self.placeholder,
            strict: self.strict,
            suffix: &self.suffix,
        };

        let registry = match Registry::build(
            self.source.as_ref(),
            &self.suffix,
            self.backend.as_ref(),
            &options,
            self.debug,
        ) {
            Ok(registry) => Arc::new(registry),
            Err(err) => {
                tracing::warn!(error = %err, "template load failed");
                return Err(err);
            }
        };

        let mut installed = self.registry.write();
        if generation < installed.generation {
            tracing::debug!(generation, "newer templates already installed, discarding build");
            return Ok(installed.registry.clone().unwrap_or(registry));
        }
        installed.generation = generation;
        installed.registry = Some(Arc::clone(&registry));
        self.stale.store(false, Ordering::Release);

        tracing::debug!(templates = registry.len(), generation, "templates loaded");
        Ok(registry)
    }

    /// Returns the registry to render from, loading first if required.
    fn current(&self) -> Result<Arc<Registry>, ViewError> {
        if self.reload || self.stale.load(Ordering::Acquire) {
            return self.load_registry();
        }
        let installed = self.registry.read().registry.clone();
        match installed {
            Some(registry) => Ok(registry),
            None => self.load_registry(),
        }
    }

    /// Names of all renderable templates in the active registry.
    ///
    /// Empty before the first successful load.
    pub fn names(&self) -> Vec<String> {
        self.registry
            .read()
            .registry
            .as_ref()
            .map(|registry| registry.names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether the active registry contains `name`.
    pub fn has_template(&self, name: &str) -> bool {
        self.registry
            .read()
            .registry
            .as_ref()
            .is_some_and(|registry| registry.contains(name))
    }

    /// Renders template `name` with `data` into `out`.
    ///
    /// With `layout` set to a non-empty name, `name` is rendered first and
    /// its output handed to the layout under the placeholder; the layout's
    /// output is what reaches `out`. `Some("")` behaves like `None`.
    ///
    /// Use `&()` as `data` to render without any data.
    ///
    /// # Errors
    ///
    /// - any load error, when a load is due (see the module docs)
    /// - [`ViewError::NotFound`] / [`ViewError::LayoutNotFound`], with
    ///   nothing written
    /// - [`ViewError::Data`] if `data` cannot be serialized
    /// - [`ViewError::Execute`] / [`ViewError::Write`] from execution
    pub fn render<D>(
        &self,
        out: &mut dyn io::Write,
        name: &str,
        data: &D,
        layout: Option<&str>,
    ) -> Result<(), ViewError>
    where
        D: Serialize + ?Sized,
    {
        let registry = self.current()?;
        let layout = layout.filter(|layout| !layout.is_empty());

        if !registry.contains(name) {
            return Err(ViewError::NotFound(name.to_string()));
        }
        if let Some(layout) = layout {
            if !registry.contains(layout) {
                return Err(ViewError::LayoutNotFound(layout.to_string()));
            }
        }

        let data = serde_json::to_value(data)?;
        tracing::trace!(template = name, layout = ?layout, "rendering");

        let Some(layout) = layout else {
            return registry.render(name, &data, None, out);
        };

        let mut inner = Vec::new();
        registry.render(name, &data, None, &mut inner)?;
        let inner = String::from_utf8_lossy(&inner);
        registry.render(layout, &data, Some(&inner), out)
    }

    /// Renders into a `String`. See [`render`](Self::render).
    pub fn render_to_string<D>(
        &self,
        name: &str,
        data: &D,
        layout: Option<&str>,
    ) -> Result<String, ViewError>
    where
        D: Serialize + ?Sized,
    {
        let mut out = Vec::new();
        self.render(&mut out, name, data, layout)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("source", &self.source.describe())
            .field("suffix", &self.suffix)
            .field("backend", &self.backend.name())
            .field("funcs", &self.funcs)
            .field("delims", &self.delims)
            .field("placeholder", &self.placeholder)
            .field("reload", &self.reload)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
