//! Lightweight substitution backend.
//!
//! [`SimpleBackend`] compiles templates into a flat list of nodes using
//! `{...}` tags. It is much lighter than MiniJinja and suited to plain-text
//! views that only need substitution.
//!
//! # Syntax
//!
//! - `{name}` - variable substitution
//! - `{user.name}`, `{items.0}` - dotted paths into objects and arrays
//! - `{> partials/header}` - render another template in place, same data
//! - `{upper name}`, `{join items ", "}` - call a helper; arguments are
//!   paths, `"quoted"` strings or numbers
//! - `{define sidebar}...{end}` - declare a named sub-template; the body is
//!   not rendered in place
//! - `{{` and `}}` - literal `{` and `}`
//!
//! A single word naming a registered helper is a call with no arguments.
//! Output is never escaped.
//!
//! # Limitations
//!
//! No loops, conditionals, filters or inheritance. Use
//! [`JinjaBackend`](super::JinjaBackend) for those.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use serde_json::Value;

use super::{Backend, Delims, SetOptions, TemplateSet};
use crate::error::ViewError;
use crate::funcs::Helper;

const MAX_PARTIAL_DEPTH: usize = 32;

/// The `{variable}` template language.
///
/// # Example
///
/// ```rust
/// use viewkit::backend::SimpleBackend;
/// use viewkit::source::EmbeddedSource;
/// use viewkit::Engine;
///
/// let source = EmbeddedSource::new()
///     .with_file("greeting.txt", "Hello, {name}! Contact: {user.email}");
/// let engine = Engine::with_backend(source, ".txt", SimpleBackend::new());
///
/// let data = serde_json::json!({"name": "World", "user": {"email": "test@example.com"}});
/// let output = engine.render_to_string("greeting", &data, None).unwrap();
/// assert_eq!(output, "Hello, World! Contact: test@example.com");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleBackend;

impl SimpleBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SimpleBackend {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn new_set(&self, options: &SetOptions<'_>) -> Result<Box<dyn TemplateSet>, ViewError> {
        let delims = options
            .delims
            .cloned()
            .unwrap_or_else(|| Delims::new("{", "}"));
        if delims.left.is_empty() || delims.right.is_empty() {
            return Err(ViewError::Syntax("delimiters must not be empty".into()));
        }

        let helpers = options
            .funcs
            .iter()
            .map(|(name, helper)| (name.to_string(), Arc::clone(helper)))
            .collect();

        Ok(Box::new(SimpleSet {
            templates: HashMap::new(),
            sections: HashMap::new(),
            helpers,
            delims,
            placeholder: options.placeholder.to_string(),
            strict: options.strict,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Path(String),
    Literal(Value),
}

#[derive(Clone)]
enum Node {
    Text(String),
    Var(String),
    Partial(String),
    Call {
        name: String,
        helper: Arc<dyn Helper>,
        args: Vec<Arg>,
    },
}

struct SimpleSet {
    templates: HashMap<String, Vec<Node>>,
    /// `{define}` section name to the file that declared it.
    sections: HashMap<String, String>,
    helpers: HashMap<String, Arc<dyn Helper>>,
    delims: Delims,
    placeholder: String,
    strict: bool,
}

/// Output of parsing one file: its body plus any `{define}` sections.
struct Parsed {
    body: Vec<Node>,
    defines: Vec<(String, Vec<Node>)>,
}

impl SimpleSet {
    fn parse(&self, source: &str) -> Result<Parsed, String> {
        let Delims { left, right } = &self.delims;
        let escaped_left = format!("{}{}", left, left);
        let escaped_right = format!("{}{}", right, right);

        let mut body = Vec::new();
        let mut defines = Vec::new();
        // Open `{define}` section: its name and the nodes collected so far.
        let mut section: Option<(String, Vec<Node>)> = None;
        let mut text = String::new();
        let mut rest = source;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix(escaped_left.as_str()) {
                text.push_str(left);
                rest = after;
            } else if let Some(after) = rest.strip_prefix(escaped_right.as_str()) {
                text.push_str(right);
                rest = after;
            } else if let Some(after) = rest.strip_prefix(left.as_str()) {
                let end = after
                    .find(right.as_str())
                    .ok_or_else(|| format!("unclosed tag: {}{}", left, after.trim_end()))?;
                let tag = after[..end].trim();
                rest = &after[end + right.len()..];

                let nodes = match section.as_mut() {
                    Some((_, nodes)) => nodes,
                    None => &mut body,
                };
                if !text.is_empty() {
                    nodes.push(Node::Text(std::mem::take(&mut text)));
                }

                if let Some(name) = tag.strip_prefix("define ") {
                    if let Some((open, _)) = &section {
                        return Err(format!("nested define '{}' inside '{}'", name.trim(), open));
                    }
                    section = Some((name.trim().to_string(), Vec::new()));
                } else if tag == "end" {
                    let closed = section
                        .take()
                        .ok_or_else(|| "'end' without matching 'define'".to_string())?;
                    defines.push(closed);
                } else {
                    nodes.push(self.parse_tag(tag)?);
                }
            } else {
                let ch = rest.chars().next().unwrap_or_default();
                text.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }

        if let Some((name, _)) = section {
            return Err(format!("define '{}' is never closed", name));
        }
        if !text.is_empty() {
            body.push(Node::Text(text));
        }
        Ok(Parsed { body, defines })
    }

    fn parse_tag(&self, tag: &str) -> Result<Node, String> {
        if tag.is_empty() {
            return Err("empty tag".to_string());
        }
        if let Some(name) = tag.strip_prefix('>') {
            let name = name.trim();
            if name.is_empty() {
                return Err("partial tag without a template name".to_string());
            }
            return Ok(Node::Partial(name.to_string()));
        }

        let words = split_words(tag)?;
        let (first, args) = words
            .split_first()
            .ok_or_else(|| "empty tag".to_string())?;

        if let Some(helper) = self.helpers.get(first.as_str()) {
            let args = args.iter().map(|word| parse_arg(word)).collect();
            return Ok(Node::Call {
                name: first.clone(),
                helper: Arc::clone(helper),
                args,
            });
        }
        if !args.is_empty() {
            return Err(format!("unknown function '{}'", first));
        }
        Ok(Node::Var(first.clone()))
    }

    fn render_nodes(
        &self,
        name: &str,
        nodes: &[Node],
        data: &Value,
        out: &mut dyn io::Write,
        depth: usize,
    ) -> Result<(), ViewError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.write_all(text.as_bytes()).map_err(ViewError::Write)?,
                Node::Var(path) => {
                    let value = self.lookup(name, data, path)?;
                    out.write_all(format_value(&value).as_bytes())
                        .map_err(ViewError::Write)?;
                }
                Node::Partial(partial) => {
                    if depth >= MAX_PARTIAL_DEPTH {
                        return Err(ViewError::execute(
                            name,
                            format!("partial nesting deeper than {} levels", MAX_PARTIAL_DEPTH),
                        ));
                    }
                    let nodes = self.templates.get(partial).ok_or_else(|| {
                        ViewError::execute(name, format!("partial '{}' not found", partial))
                    })?;
                    self.render_nodes(partial, nodes, data, out, depth + 1)?;
                }
                Node::Call {
                    name: func,
                    helper,
                    args,
                } => {
                    let values = args
                        .iter()
                        .map(|arg| match arg {
                            Arg::Literal(value) => Ok(value.clone()),
                            Arg::Path(path) => self.lookup(name, data, path),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    let result = helper.call(&values).map_err(|e| {
                        ViewError::execute(name, format!("helper '{}' failed: {}", func, e))
                    })?;
                    out.write_all(format_value(&result).as_bytes())
                        .map_err(ViewError::Write)?;
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str, data: &Value, path: &str) -> Result<Value, ViewError> {
        match resolve_path(data, path) {
            Some(value) => Ok(value.clone()),
            None if self.strict => Err(ViewError::execute(
                name,
                format!("undefined variable '{}'", path),
            )),
            None => Ok(Value::Null),
        }
    }
}

impl TemplateSet for SimpleSet {
    fn add(&mut self, name: &str, source: String) -> Result<Vec<String>, ViewError> {
        let parsed = self
            .parse(&source)
            .map_err(|message| ViewError::compile(name, message))?;

        // Sections this file declared on a previous add are gone.
        let stale: Vec<String> = self
            .sections
            .iter()
            .filter(|(_, owner)| owner.as_str() == name)
            .map(|(section, _)| section.clone())
            .collect();
        for section in stale {
            self.sections.remove(&section);
            self.templates.remove(&section);
        }

        self.sections.remove(name);
        self.templates.insert(name.to_string(), parsed.body);

        let mut declared = Vec::with_capacity(parsed.defines.len());
        for (define, nodes) in parsed.defines {
            if define == name {
                continue;
            }
            self.sections.insert(define.clone(), name.to_string());
            self.templates.insert(define.clone(), nodes);
            declared.push(define);
        }
        Ok(declared)
    }

    fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    fn render(
        &self,
        name: &str,
        data: &Value,
        embed: Option<&str>,
        out: &mut dyn io::Write,
    ) -> Result<(), ViewError> {
        let nodes = self
            .templates
            .get(name)
            .ok_or_else(|| ViewError::NotFound(name.to_string()))?;

        match embed {
            None => self.render_nodes(name, nodes, data, out, 0),
            Some(embed) => {
                let mut data = match data {
                    Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                };
                data.insert(self.placeholder.clone(), Value::String(embed.to_string()));
                self.render_nodes(name, nodes, &Value::Object(data), out, 0)
            }
        }
    }
}

/// Splits a tag into words, keeping `"quoted strings"` intact.
fn split_words(tag: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut chars = tag.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let mut word = String::new();
        if ch == '"' {
            word.push(chars.next().unwrap_or('"'));
            let mut closed = false;
            while let Some(inner) = chars.next() {
                word.push(inner);
                if inner == '\\' {
                    if let Some(escaped) = chars.next() {
                        word.push(escaped);
                    }
                } else if inner == '"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(format!("unterminated string in tag: {}", tag));
            }
        } else {
            while let Some(&inner) = chars.peek() {
                if inner.is_whitespace() {
                    break;
                }
                word.push(inner);
                chars.next();
            }
        }
        words.push(word);
    }
    Ok(words)
}

fn parse_arg(word: &str) -> Arg {
    if word.starts_with('"') {
        if let Ok(value) = serde_json::from_str::<Value>(word) {
            return Arg::Literal(value);
        }
    }
    if let Ok(value) = word.parse::<serde_json::Number>() {
        return Arg::Literal(Value::Number(value));
    }
    match word {
        "true" => Arg::Literal(Value::Bool(true)),
        "false" => Arg::Literal(Value::Bool(false)),
        "null" => Arg::Literal(Value::Null),
        _ => Arg::Path(word.to_string()),
    }
}

/// Follows `path` (`user.name`, `items.0`) through objects and arrays.
fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |node, segment| match node {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Text written for a substituted value: strings verbatim, `null` as
/// nothing, anything else in its JSON form.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
