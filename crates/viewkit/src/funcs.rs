//! Helper functions callable from template bodies.
//!
//! A helper is anything implementing [`Helper`]: it receives the call's
//! arguments as JSON values and returns a JSON value. Closures with the
//! matching signature implement the trait automatically:
//!
//! ```rust
//! use serde_json::{json, Value};
//! use viewkit::funcs::{FuncMap, HelperError};
//!
//! let mut funcs = FuncMap::new();
//! funcs.insert("isAdmin", |args: &[Value]| -> Result<Value, HelperError> {
//!     Ok(json!(args.first().and_then(Value::as_str) == Some("admin")))
//! });
//! assert!(funcs.contains("isAdmin"));
//! ```
//!
//! Helpers are bound into templates when they are compiled, so a helper added
//! after a load only becomes visible once the next load has run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Error returned by a helper function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HelperError(pub String);

impl HelperError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HelperError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HelperError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// A function that can be called from inside a template.
pub trait Helper: Send + Sync {
    fn call(&self, args: &[Value]) -> Result<Value, HelperError>;
}

impl<F> Helper for F
where
    F: Fn(&[Value]) -> Result<Value, HelperError> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> Result<Value, HelperError> {
        self(args)
    }
}

/// The table of helpers available to templates, keyed by name.
///
/// Inserting a name that already exists replaces the previous helper.
/// Cloning is cheap: helpers are reference counted.
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<String, Arc<dyn Helper>>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a helper.
    pub fn insert<H>(&mut self, name: impl Into<String>, helper: H)
    where
        H: Helper + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(helper));
    }

    /// Adds or replaces an already shared helper.
    pub fn insert_arc(&mut self, name: impl Into<String>, helper: Arc<dyn Helper>) {
        self.funcs.insert(name.into(), helper);
    }

    /// Merges `other` into this table; entries from `other` win.
    pub fn extend(&mut self, other: FuncMap) {
        self.funcs.extend(other.funcs);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Helper>> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Helper names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    /// Iterates over `(name, helper)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Helper>)> {
        self.funcs.iter().map(|(name, helper)| (name.as_str(), helper))
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}
