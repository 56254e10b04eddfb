//! Logical template names.
//!
//! Templates are looked up by their path relative to the template root, with
//! the suffix removed and separators normalized to `/`:
//!
//! | File path (relative)        | Suffix  | Logical name   |
//! |-----------------------------|---------|----------------|
//! | `index.html`                | `.html` | `index`        |
//! | `errors/404.html`           | `.html` | `errors/404`   |
//! | `layouts\main.html`         | `.html` | `layouts/main` |
//! | `./partials/header.html`    | `.html` | `partials/header` |
//!
//! The mapping ignores host conventions: a Windows-style path and a
//! Unix-style path to the same file produce the same name.

/// Normalizes a relative path to `/`-separated segments.
///
/// Backslashes become forward slashes, `.` and empty segments are dropped.
pub fn normalize_path(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Derives the logical name of a template file.
///
/// Returns `None` if the path does not end with `suffix`, or if nothing is
/// left once the suffix is removed (a file literally named `.html`).
///
/// # Example
///
/// ```rust
/// use viewkit::name::logical_name;
///
/// assert_eq!(logical_name("errors/404.html", ".html").as_deref(), Some("errors/404"));
/// assert_eq!(logical_name("layouts\\main.html", ".html").as_deref(), Some("layouts/main"));
/// assert_eq!(logical_name("readme.md", ".html"), None);
/// ```
pub fn logical_name(path: &str, suffix: &str) -> Option<String> {
    let normalized = normalize_path(path);
    let base = normalized.strip_suffix(suffix)?;
    if base.is_empty() || base.ends_with('/') {
        return None;
    }
    Some(base.to_string())
}
