//! Template backend abstraction.
//!
//! This module defines the seam between the engine and a concrete template
//! language. A [`Backend`] creates empty [`TemplateSet`]s; the engine fills a
//! set with every template file on each load, then renders entries out of it.
//!
//! Two backends are provided:
//!
//! - [`JinjaBackend`]: MiniJinja, with full Jinja2 syntax (includes,
//!   inheritance, blocks, macros, filters). The default.
//! - [`SimpleBackend`]: `{variable}` substitution with partials and helper
//!   calls. Much lighter, no loops or conditionals.
//!
//! # Layout content
//!
//! When rendering through a layout, the engine first renders the inner
//! template, then renders the layout with `embed` set to the inner output.
//! The set exposes that text under the placeholder name from
//! [`SetOptions::placeholder`] as already-rendered markup: it must not be
//! escaped a second time.

mod jinja;
mod simple;

pub use jinja::JinjaBackend;
pub use simple::SimpleBackend;

use std::io;

use crate::error::ViewError;
use crate::funcs::FuncMap;

/// A left/right delimiter pair for template actions.
///
/// For [`JinjaBackend`] these replace the variable delimiters (`{{`/`}}`);
/// for [`SimpleBackend`] they replace `{`/`}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delims {
    pub left: String,
    pub right: String,
}

impl Delims {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Settings a backend needs to build a set.
///
/// Everything here is snapshotted when the set is created: helpers added to
/// the engine afterwards do not reach an existing set.
#[derive(Debug, Clone, Copy)]
pub struct SetOptions<'a> {
    /// Helpers callable from template bodies.
    pub funcs: &'a FuncMap,
    /// Delimiter override, `None` for the backend's defaults.
    pub delims: Option<&'a Delims>,
    /// Name under which layouts see the inner template's output.
    pub placeholder: &'a str,
    /// Fail on undefined variables instead of rendering them empty.
    pub strict: bool,
    /// File suffix of the template tree (used to pick an escaping mode).
    pub suffix: &'a str,
}

/// A template language.
pub trait Backend: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &'static str;

    /// Creates an empty set bound to the given options.
    ///
    /// Fails with [`ViewError::Syntax`] if the options cannot be honored.
    fn new_set(&self, options: &SetOptions<'_>) -> Result<Box<dyn TemplateSet>, ViewError>;
}

/// A collection of compiled templates that can reference each other by name.
pub trait TemplateSet: Send + Sync {
    /// Parses and registers a template under `name`.
    ///
    /// Registering an existing name replaces it. Returns the names of any
    /// sub-templates the source declares, which become renderable by name too.
    fn add(&mut self, name: &str, source: String) -> Result<Vec<String>, ViewError>;

    /// Whether `name` resolves to a file template or a declared sub-template.
    fn contains(&self, name: &str) -> bool;

    /// Renders `name` against `data`, writing to `out` as it goes.
    ///
    /// `embed` carries the inner template's output when `name` is rendered
    /// as a layout.
    fn render(
        &self,
        name: &str,
        data: &serde_json::Value,
        embed: Option<&str>,
        out: &mut dyn io::Write,
    ) -> Result<(), ViewError>;
}

/// Whether templates with this suffix produce HTML-like markup.
pub(crate) fn is_markup_suffix(suffix: &str) -> bool {
    let suffix = suffix.to_ascii_lowercase();
    [".html", ".htm", ".xml", ".xhtml", ".svg", ".ace"]
        .iter()
        .any(|ext| suffix.ends_with(ext))
}
