//! # Viewkit - View Templates for Rust
//!
//! `viewkit` renders named view templates from a directory tree (or an
//! in-memory tree), with layouts, partials and user-registered helper
//! functions.
//!
//! ## Quick Start
//!
//! ```rust
//! use viewkit::source::EmbeddedSource;
//! use viewkit::{Engine, HelperError};
//! use serde_json::{json, Value};
//!
//! let source = EmbeddedSource::new()
//!     .with_file("index.html", "<h1>{{ Title | shout }}</h1>")
//!     .with_file("layouts/main.html", "<body>{{ yield }}</body>");
//!
//! let mut engine = Engine::from_source(source, ".html");
//! engine.add_func("shout", |args: &[Value]| -> Result<Value, HelperError> {
//!     let text = args.first().and_then(Value::as_str).unwrap_or_default();
//!     Ok(json!(text.to_uppercase()))
//! });
//! engine.load()?;
//!
//! let html = engine.render_to_string("index", &json!({"Title": "hi"}), Some("layouts/main"))?;
//! assert_eq!(html, "<body><h1>HI</h1></body>");
//! # Ok::<(), viewkit::ViewError>(())
//! ```
//!
//! ## Concepts
//!
//! - Template names: every file ending with the configured suffix is
//!   registered under its path relative to the root, without the suffix and
//!   with `/` separators. `partials/header.html` becomes `partials/header`.
//!   See [`name`].
//! - Sources: templates come from a [`FileSource`]. [`DiskSource`] walks a
//!   directory, [`EmbeddedSource`] serves a map built in code.
//! - Backends: the template language is pluggable through [`Backend`].
//!   [`JinjaBackend`] (MiniJinja) is the default; [`SimpleBackend`] offers
//!   plain `{variable}` substitution.
//! - Layouts: a layout is an ordinary template that prints the inner
//!   template's output through the placeholder, `{{ yield }}` by default.
//! - Helpers: any `Fn(&[Value]) -> Result<Value, HelperError>` can be
//!   registered with [`Engine::add_func`] or [`Engine::add_func_map`].
//!
//! ## Loading and reloading
//!
//! [`Engine::load`] compiles the whole tree at once. Any failure aborts the
//! load and leaves the previously compiled templates in service. With
//! [`Engine::reload`] enabled every render recompiles first, which suits
//! development. See the [`engine`] module docs for the full lifecycle.
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]. Loads open a `load` span at `debug`
//! level; per-template lines go to `trace`, or to `info` when
//! [`Engine::debug`] is on.

pub mod backend;
pub mod engine;
pub mod error;
pub mod funcs;
pub mod name;
pub mod registry;
pub mod source;

pub use backend::{Backend, Delims, JinjaBackend, SimpleBackend, TemplateSet};
pub use engine::{Engine, DEFAULT_PLACEHOLDER};
pub use error::ViewError;
pub use funcs::{FuncMap, Helper, HelperError};
pub use source::{DiskSource, EmbeddedSource, FileSource};

// Re-export for helper implementations.
pub use serde_json::Value;
