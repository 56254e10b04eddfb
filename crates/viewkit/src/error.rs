//! Error types for loading and rendering views.
//!
//! Every fallible engine operation returns [`ViewError`]. The variants follow
//! the lifecycle of a view: discovery (`Walk`, `Read`, `Encoding`), compilation
//! (`Compile`), lookup (`NotFound`, `LayoutNotFound`) and execution
//! (`Execute`, `Data`, `Write`). Callers that need to react to a specific
//! cause match on the variant; everything else can just propagate it.

use std::io;

/// Boxed error used to carry backend-specific failure details.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while loading or rendering views.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The file source could not be enumerated.
    #[error("Failed to walk template source: {0}")]
    Walk(#[source] io::Error),

    /// A template file could not be read.
    #[error("Failed to read template file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The backend rejected the configured syntax (e.g. bad delimiters).
    #[error("Invalid template syntax configuration: {0}")]
    Syntax(#[source] BoxError),

    /// A template file is not valid UTF-8.
    #[error("Template file '{path}' is not valid UTF-8")]
    Encoding {
        path: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A template failed to parse.
    #[error("Failed to compile template '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: BoxError,
    },

    /// No template is registered under the requested name.
    #[error("Template '{0}' not found")]
    NotFound(String),

    /// No template is registered under the requested layout name.
    #[error("Layout '{0}' not found")]
    LayoutNotFound(String),

    /// A compiled template failed while running against the data.
    #[error("Failed to render template '{name}': {source}")]
    Execute {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The render data could not be converted into a template context.
    #[error("Failed to serialize render data: {0}")]
    Data(#[from] serde_json::Error),

    /// Writing to the output sink failed.
    #[error("Failed to write rendered output: {0}")]
    Write(#[source] io::Error),
}

impl ViewError {
    /// Create a compile error for the given template name.
    pub fn compile(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Compile {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Create an execution error for the given template name.
    pub fn execute(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execute {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Returns true for the two lookup failures.
    ///
    /// Lookup failures are raised before anything is executed, so the output
    /// sink is guaranteed to be untouched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::LayoutNotFound(_))
    }
}
