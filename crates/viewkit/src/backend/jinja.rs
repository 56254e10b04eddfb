//! MiniJinja backend.
//!
//! Every load builds a fresh [`Environment`] holding all template files under
//! their logical names, so templates can include, import and extend each
//! other by those names:
//!
//! ```jinja
//! {% include "partials/header" %}
//! <h1>{{ Title }}</h1>
//! {% include "partials/footer" %}
//! ```
//!
//! Layouts receive the inner template's output under the placeholder name
//! (`{{ yield }}` by default) as a safe string, so it is never escaped twice.
//!
//! Named blocks (`{% block sidebar %}`) declared in a file are registered as
//! sub-templates and can be rendered on their own by block name. Block tags
//! inside comments or `{% raw %}` sections are ignored. Files and blocks
//! share one namespace: whichever was added last owns a name.
//!
//! Helpers are registered both as global functions and as filters:
//! `{{ upper(name) }}` and `{{ name | upper }}` are equivalent.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use minijinja::syntax::SyntaxConfig;
use minijinja::value::Rest;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior, Value};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{is_markup_suffix, Backend, SetOptions, TemplateSet};
use crate::error::ViewError;
use crate::funcs::Helper;

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{%[-+]?\s*block\s+([A-Za-z_][A-Za-z0-9_]*)").expect("block tag pattern is valid")
});

/// Comments and raw sections, whose contents are never parsed as tags.
static INERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)\{#.*?#\}|\{%[-+]?\s*raw\s*[-+]?%\}.*?\{%[-+]?\s*endraw\s*[-+]?%\}",
    )
    .expect("inert section pattern is valid")
});

/// Names of the blocks `source` declares, in order of appearance.
fn declared_blocks(source: &str) -> Vec<String> {
    let live = INERT.replace_all(source, "");
    let mut blocks: Vec<String> = Vec::new();
    for caps in BLOCK_TAG.captures_iter(&live) {
        let block = &caps[1];
        if !blocks.iter().any(|b| b == block) {
            blocks.push(block.to_string());
        }
    }
    blocks
}

/// The MiniJinja template language.
///
/// # Example
///
/// ```rust
/// use viewkit::backend::JinjaBackend;
/// use viewkit::source::EmbeddedSource;
/// use viewkit::Engine;
///
/// let source = EmbeddedSource::new().with_file("hello.html", "Hello, {{ name }}!");
/// let engine = Engine::with_backend(source, ".html", JinjaBackend::new());
///
/// let output = engine
///     .render_to_string("hello", &serde_json::json!({"name": "World"}), None)
///     .unwrap();
/// assert_eq!(output, "Hello, World!");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaBackend;

impl JinjaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for JinjaBackend {
    fn name(&self) -> &'static str {
        "minijinja"
    }

    fn new_set(&self, options: &SetOptions<'_>) -> Result<Box<dyn TemplateSet>, ViewError> {
        let mut env = Environment::new();

        if options.strict {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(UndefinedBehavior::Lenient);
        }

        // Logical names carry no extension, so the default per-extension
        // escaping would never kick in.
        let escape = if is_markup_suffix(options.suffix) {
            AutoEscape::Html
        } else {
            AutoEscape::None
        };
        env.set_auto_escape_callback(move |_name| escape.clone());

        if let Some(delims) = options.delims {
            let syntax = SyntaxConfig::builder()
                .variable_delimiters(delims.left.clone(), delims.right.clone())
                .build()
                .map_err(|e| ViewError::Syntax(e.into()))?;
            env.set_syntax(syntax);
        }

        for (name, helper) in options.funcs.iter() {
            register_helper(&mut env, name, Arc::clone(helper));
        }

        Ok(Box::new(JinjaSet {
            env,
            targets: HashMap::new(),
            owned: HashMap::new(),
            placeholder: options.placeholder.to_string(),
        }))
    }
}

fn register_helper(env: &mut Environment<'static>, name: &str, helper: Arc<dyn Helper>) {
    let filter = Arc::clone(&helper);
    let filter_name = name.to_string();
    env.add_filter(name.to_string(), move |args: Rest<Value>| {
        call_helper(&filter_name, filter.as_ref(), &args)
    });

    let function_name = name.to_string();
    env.add_function(name.to_string(), move |args: Rest<Value>| {
        call_helper(&function_name, helper.as_ref(), &args)
    });
}

/// Bridges MiniJinja values to the JSON-based helper interface.
fn call_helper(name: &str, helper: &dyn Helper, args: &[Value]) -> Result<Value, Error> {
    let args = args
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::new(
                ErrorKind::BadSerialization,
                format!("cannot pass arguments to helper '{}'", name),
            )
            .with_source(e)
        })?;

    let result = helper.call(&args).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("helper '{}' failed", name),
        )
        .with_source(e)
    })?;

    Ok(Value::from_serialize(&result))
}

/// What a registered name renders.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File,
    /// A block, evaluated inside the named file template.
    Block(String),
}

struct JinjaSet {
    env: Environment<'static>,
    targets: HashMap<String, Target>,
    /// File template to the blocks it registered.
    owned: HashMap<String, Vec<String>>,
    placeholder: String,
}

impl JinjaSet {
    fn context(&self, data: &serde_json::Value, embed: Option<&str>) -> Value {
        let Some(embed) = embed else {
            return Value::from_serialize(data);
        };

        let mut ctx: BTreeMap<String, Value> = match data {
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
                .collect(),
            _ => BTreeMap::new(),
        };
        ctx.insert(
            self.placeholder.clone(),
            Value::from_safe_string(embed.to_string()),
        );
        Value::from(ctx)
    }
}

impl TemplateSet for JinjaSet {
    fn add(&mut self, name: &str, source: String) -> Result<Vec<String>, ViewError> {
        let mut blocks = declared_blocks(&source);
        blocks.retain(|block| block != name);

        self.env
            .add_template_owned(name.to_string(), source)
            .map_err(|e| ViewError::compile(name, e))?;

        // Blocks from an earlier version of this file are gone.
        for block in self.owned.remove(name).unwrap_or_default() {
            if self.targets.get(&block) == Some(&Target::Block(name.to_string())) {
                self.targets.remove(&block);
            }
        }

        self.targets.insert(name.to_string(), Target::File);
        for block in &blocks {
            self.targets
                .insert(block.clone(), Target::Block(name.to_string()));
        }
        self.owned.insert(name.to_string(), blocks.clone());
        Ok(blocks)
    }

    fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    fn render(
        &self,
        name: &str,
        data: &serde_json::Value,
        embed: Option<&str>,
        mut out: &mut dyn io::Write,
    ) -> Result<(), ViewError> {
        let ctx = self.context(data, embed);

        let owner = match self.targets.get(name) {
            Some(Target::File) => {
                let tmpl = self
                    .env
                    .get_template(name)
                    .map_err(|e| ViewError::execute(name, e))?;
                tmpl.render_captured_to(ctx, &mut out)
                    .map_err(|e| ViewError::execute(name, e))?;
                return Ok(());
            }
            Some(Target::Block(owner)) => owner,
            None => return Err(ViewError::NotFound(name.to_string())),
        };

        let tmpl = self
            .env
            .get_template(owner)
            .map_err(|e| ViewError::execute(name, e))?;
        let mut captured = tmpl
            .render_captured_to(ctx, io::sink())
            .map_err(|e| ViewError::execute(name, e))?;
        captured
            .with_state_mut(|state| state.render_block_to_write(name, &mut out))
            .map_err(|e| ViewError::execute(name, e))
    }
}
