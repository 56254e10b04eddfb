//! Integration tests for the MiniJinja-backed engine.
//!
//! These render the fixture tree under `tests/fixtures/views` from disk, the
//! way an application would, and check output after collapsing whitespace.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use viewkit::source::EmbeddedSource;
use viewkit::{Engine, FuncMap, HelperError, ViewError};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/views")
}

/// Joins lines with their surrounding whitespace removed.
fn trim(output: &str) -> String {
    output.lines().map(str::trim).collect()
}

fn is_admin(args: &[Value]) -> Result<Value, HelperError> {
    let user = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| HelperError::new("isAdmin expects a user name"))?;
    Ok(json!(user == "admin"))
}

fn engine() -> Engine {
    let mut engine = Engine::new(fixtures(), ".html");
    engine.add_func("isAdmin", is_admin);
    engine.load().unwrap();
    engine
}

fn render(engine: &Engine, name: &str, data: Value, layout: Option<&str>) -> String {
    trim(&engine.render_to_string(name, &data, layout).unwrap())
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn load_registers_every_template() {
    let engine = engine();
    let names = engine.names();

    for expected in [
        "admin",
        "errors/404",
        "extended",
        "index",
        "layouts/main",
        "layouts/nested/main",
        "partials/footer",
        "partials/header",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {}", expected);
    }
    assert!(!engine.has_template("README"));
}

#[test]
fn load_is_idempotent() {
    let engine = engine();
    let before = engine.names();
    engine.load().unwrap();
    engine.load().unwrap();
    assert_eq!(engine.names(), before);
}

#[test]
fn load_fails_for_missing_root() {
    let engine = Engine::new("./does/not/exist", ".html");
    let err = engine.load().unwrap_err();
    assert!(matches!(err, ViewError::Walk(_)));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn render_with_partials() {
    let engine = engine();
    let output = render(&engine, "index", json!({"Title": "Hello, World!"}), None);
    assert_eq!(
        output,
        "<h2>Header</h2><h1>Hello, World!</h1><h2>Footer</h2>"
    );
}

#[test]
fn render_nested_name() {
    let engine = engine();
    let output = render(&engine, "errors/404", json!({"Title": "Hello, World!"}), None);
    assert_eq!(output, "<h1>Hello, World!</h1>");
}

#[test]
fn render_with_struct_data() {
    #[derive(Serialize)]
    struct Page {
        #[serde(rename = "Title")]
        title: String,
    }

    let engine = engine();
    let page = Page {
        title: "From a struct".to_string(),
    };
    let output = trim(&engine.render_to_string("errors/404", &page, None).unwrap());
    assert_eq!(output, "<h1>From a struct</h1>");
}

#[test]
fn render_escapes_html_data() {
    let engine = engine();
    let output = render(&engine, "escaped", json!({"Body": "<b>bold</b>"}), None);
    assert!(output.contains("&lt;b&gt;"));
    assert!(!output.contains("<b>"));
}

#[test]
fn render_template_inheritance() {
    let engine = engine();
    let output = render(&engine, "extended", json!({"Title": "Child"}), None);
    assert_eq!(output, "<html><body><h1>Child</h1></body></html>");
}

#[test]
fn render_helper_function() {
    let engine = engine();

    let output = render(&engine, "admin", json!({"User": "admin"}), None);
    assert_eq!(output, "<h1>Hello, Admin!</h1>");

    let output = render(&engine, "admin", json!({"User": "guest"}), None);
    assert_eq!(output, "<h1>Access denied!</h1>");
}

#[test]
fn render_missing_template_writes_nothing() {
    let engine = engine();
    let mut out = Vec::new();

    let err = engine
        .render(&mut out, "nope", &json!({}), None)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(out.is_empty());
}

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn render_with_layout() {
    let engine = engine();
    let output = render(
        &engine,
        "index",
        json!({"Title": "Hello, World!"}),
        Some("layouts/main"),
    );
    assert_eq!(
        output,
        "<!DOCTYPE html><html><head><title>Main</title></head><body>\
         <h2>Header</h2><h1>Hello, World!</h1><h2>Footer</h2></body></html>"
    );
}

#[test]
fn render_with_empty_layout() {
    let engine = engine();
    let output = render(&engine, "index", json!({"Title": "Hello, World!"}), Some(""));
    assert_eq!(
        output,
        "<h2>Header</h2><h1>Hello, World!</h1><h2>Footer</h2>"
    );
}

#[test]
fn render_with_nested_layout() {
    let engine = engine();
    let output = render(
        &engine,
        "errors/404",
        json!({"Title": "Hello, World!"}),
        Some("layouts/nested/main"),
    );
    assert_eq!(
        output,
        "<!DOCTYPE html><html><head><title>Main</title></head><body>\
         <h2>Header</h2><h1>Hello, World!</h1><h2>Footer</h2></body></html>"
    );
}

#[test]
fn render_with_missing_layout_writes_nothing() {
    let engine = engine();
    let mut out = Vec::new();

    let err = engine
        .render(&mut out, "index", &json!({"Title": "x"}), Some("layouts/none"))
        .unwrap_err();
    assert!(matches!(err, ViewError::LayoutNotFound(ref name) if name == "layouts/none"));
    assert!(err.is_not_found());
    assert!(out.is_empty());
}

#[test]
fn render_layout_multiple_times() {
    let engine = engine();
    for _ in 0..3 {
        let output = render(
            &engine,
            "errors/404",
            json!({"Title": "Again"}),
            Some("layouts/main"),
        );
        assert_eq!(
            output,
            "<!DOCTYPE html><html><head><title>Main</title></head><body><h1>Again</h1></body></html>"
        );
    }
}

// ============================================================================
// Helpers
// ============================================================================

#[test]
fn add_func_map_registers_all() {
    let mut funcs = FuncMap::new();
    funcs.insert("isAdmin", is_admin);
    funcs.insert("upper", |args: &[Value]| -> Result<Value, HelperError> {
        Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase()))
    });

    let mut engine = Engine::new(fixtures(), ".html");
    engine.add_func_map(funcs);

    assert!(engine.func_map().contains("isAdmin"));
    assert!(engine.func_map().contains("upper"));
    assert_eq!(engine.func_map().len(), 2);

    let output = render(&engine, "admin", json!({"User": "admin"}), None);
    assert_eq!(output, "<h1>Hello, Admin!</h1>");
}

#[test]
fn add_func_replaces_existing() {
    let source = EmbeddedSource::new().with_file("greet.html", "{{ greet() }}");
    let mut engine = Engine::from_source(source, ".html");

    engine.add_func("greet", |_: &[Value]| -> Result<Value, HelperError> { Ok(json!("one")) });
    engine.add_func("greet", |_: &[Value]| -> Result<Value, HelperError> { Ok(json!("two")) });

    assert_eq!(engine.func_map().len(), 1);
    assert_eq!(engine.render_to_string("greet", &(), None).unwrap(), "two");
}

#[test]
fn helper_error_fails_render() {
    let engine = engine();
    let err = engine
        .render_to_string("admin", &json!({"User": 42}), None)
        .unwrap_err();
    assert!(matches!(err, ViewError::Execute { ref name, .. } if name == "admin"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn custom_delimiters() {
    let source = EmbeddedSource::new().with_file("page.html", "<p>[[ Title ]] {{ kept }}</p>");
    let mut engine = Engine::from_source(source, ".html");
    engine.delims("[[", "]]");

    let output = engine
        .render_to_string("page", &json!({"Title": "Hi"}), None)
        .unwrap();
    assert_eq!(output, "<p>Hi {{ kept }}</p>");
}

#[test]
fn lenient_mode_renders_undefined_as_empty() {
    let source = EmbeddedSource::new().with_file("page.html", "<p>{{ missing }}</p>");
    let mut engine = Engine::from_source(source, ".html");

    assert!(engine.render_to_string("page", &json!({}), None).is_err());

    engine.strict(false);
    assert_eq!(
        engine.render_to_string("page", &json!({}), None).unwrap(),
        "<p></p>"
    );
}

#[test]
fn embedded_source_with_layout() {
    static VIEWS: &[(&str, &str)] = &[
        ("index.html", "<h1>{{ Title }}</h1>"),
        ("layouts/main.html", "<body>{{ yield }}</body>"),
    ];

    let engine = Engine::from_source(EmbeddedSource::from_static(VIEWS), ".html");
    let output = engine
        .render_to_string("index", &json!({"Title": "Embedded"}), Some("layouts/main"))
        .unwrap();
    assert_eq!(output, "<body><h1>Embedded</h1></body>");
}

// ============================================================================
// Reloading
// ============================================================================

fn write_view(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn reload_disabled_keeps_cached_templates() {
    let dir = TempDir::new().unwrap();
    write_view(&dir, "page.html", "version one");

    let engine = Engine::new(dir.path(), ".html");
    engine.load().unwrap();

    write_view(&dir, "page.html", "version two");
    assert_eq!(engine.render_to_string("page", &(), None).unwrap(), "version one");
}

#[test]
fn reload_enabled_sees_edits_and_new_files() {
    let dir = TempDir::new().unwrap();
    write_view(&dir, "page.html", "version one");

    let mut engine = Engine::new(dir.path(), ".html");
    engine.reload(true);
    engine.load().unwrap();

    write_view(&dir, "page.html", "version two");
    write_view(&dir, "extra/new.html", "brand new");

    assert_eq!(engine.render_to_string("page", &(), None).unwrap(), "version two");
    assert_eq!(engine.render_to_string("extra/new", &(), None).unwrap(), "brand new");
}

#[test]
fn reload_with_syntax_error_keeps_previous_templates() {
    let dir = TempDir::new().unwrap();
    write_view(&dir, "page.html", "fine");

    let mut engine = Engine::new(dir.path(), ".html");
    engine.load().unwrap();

    write_view(&dir, "page.html", "{% for %}");
    engine.reload(true);
    let err = engine.render_to_string("page", &(), None).unwrap_err();
    assert!(matches!(err, ViewError::Compile { ref name, .. } if name == "page"));

    engine.reload(false);
    assert_eq!(engine.render_to_string("page", &(), None).unwrap(), "fine");
}
