//! Placeholder substitution for body and document templates.
//!
//! Templates may reference named fields as `{{ field }}`. Nothing else is
//! interpreted: there are no expressions, filters or control-flow tags, and
//! any other brace syntax is kept as literal text. A field that is not in the
//! mapping renders as an empty string.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

/// Field mapping a template is rendered against.
pub type Fields<'a> = HashMap<&'a str, String>;

/// Renders `template` against `fields`.
///
/// Substitution is a single pass over the template text: values are inserted
/// verbatim and never scanned for placeholders themselves.
pub fn render(template: &str, fields: &Fields<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            fields.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Names of all fields a template refers to, in order of first appearance.
pub fn referenced_fields(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
