//! Integration tests for the `{variable}` backend over plain-text views.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use viewkit::{Engine, HelperError, SimpleBackend, ViewError};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mail")
}

fn engine() -> Engine {
    let mut engine = Engine::with_backend(
        viewkit::DiskSource::new(fixtures()),
        ".txt",
        SimpleBackend::new(),
    );
    engine.load().unwrap();
    engine
}

fn data() -> Value {
    json!({"name": "Ana", "team": "Ops", "subject": "Welcome aboard"})
}

#[test]
fn names_include_defined_sections() {
    let engine = engine();
    assert_eq!(
        engine.names(),
        vec![
            "blocks",
            "farewell",
            "greeting",
            "layouts/envelope",
            "partials/signature",
            "welcome",
        ]
    );
}

#[test]
fn render_with_partial() {
    let engine = engine();
    let output = engine.render_to_string("welcome", &data(), None).unwrap();
    assert_eq!(output, "Hi Ana,\n\nWelcome to Ops.\n-- \nOps\n");
}

#[test]
fn render_with_layout() {
    let engine = engine();
    let output = engine
        .render_to_string("welcome", &data(), Some("layouts/envelope"))
        .unwrap();
    assert_eq!(
        output,
        "Subject: Welcome aboard\n\nHi Ana,\n\nWelcome to Ops.\n-- \nOps\n"
    );
}

#[test]
fn render_defined_section_by_name() {
    let engine = engine();
    assert_eq!(
        engine.render_to_string("greeting", &data(), None).unwrap(),
        "Hello, Ana!"
    );
    assert_eq!(
        engine.render_to_string("farewell", &data(), None).unwrap(),
        "Bye, Ana."
    );
    // The defining file renders nothing of its own.
    assert_eq!(engine.render_to_string("blocks", &data(), None).unwrap(), "");
}

#[test]
fn strict_undefined_is_an_error() {
    let engine = engine();
    let err = engine
        .render_to_string("welcome", &json!({"name": "Ana"}), None)
        .unwrap_err();
    assert!(matches!(err, ViewError::Execute { ref name, .. } if name == "welcome"));
}

#[test]
fn helper_applies_in_simple_views() {
    let source = viewkit::EmbeddedSource::new().with_file("shout.txt", "{upper name}!");
    let mut engine = Engine::with_backend(source, ".txt", SimpleBackend::new());
    engine.add_func("upper", |args: &[Value]| -> Result<Value, HelperError> {
        Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase()))
    });

    assert_eq!(
        engine.render_to_string("shout", &data(), None).unwrap(),
        "ANA!"
    );
}
