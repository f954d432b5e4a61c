//! String utility functions.
//!
//! Helpers used when turning field names into labels, filling message
//! templates, and producing markup.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Turns a field name into a human-readable phrase.
///
/// Underscores, hyphens and camel-case boundaries become spaces and the
/// result is lowercased.
///
/// # Examples
///
/// ```
/// use formkit_core::utils::text::humanize;
///
/// assert_eq!(humanize("first_name"), "first name");
/// assert_eq!(humanize("password_confirmation"), "password confirmation");
/// assert_eq!(humanize("dateOfBirth"), "date of birth");
/// ```
pub fn humanize(name: &str) -> String {
    static CAMEL: OnceLock<Regex> = OnceLock::new();
    let camel = CAMEL.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

    let spaced = camel.replace_all(name, "$1 $2");
    spaced
        .replace(['_', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Capitalizes the first character of a string.
///
/// # Examples
///
/// ```
/// use formkit_core::utils::text::capfirst;
///
/// assert_eq!(capfirst("hello"), "Hello");
/// assert_eq!(capfirst(""), "");
/// assert_eq!(capfirst("HELLO"), "HELLO");
/// ```
pub fn capfirst(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |c| {
        let mut result = c.to_uppercase().to_string();
        result.extend(chars);
        result
    })
}

/// Builds a default label from a field name: `"first_name"` → `"First name"`.
pub fn label_from_name(name: &str) -> String {
    capfirst(&humanize(name))
}

/// Replaces `{{ key }}` placeholders in a message template.
///
/// Whitespace inside the braces is optional. Unknown placeholders are left
/// untouched so that a missing parameter is visible rather than silently
/// dropped.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use formkit_core::utils::text::interpolate;
///
/// let mut params = BTreeMap::new();
/// params.insert("field".to_string(), "age".to_string());
/// params.insert("min".to_string(), "18".to_string());
/// assert_eq!(
///     interpolate("The {{ field }} must be at least {{min}}.", &params),
///     "The age must be at least 18."
/// );
/// assert_eq!(interpolate("{{ unknown }}", &params), "{{ unknown }}");
/// ```
pub fn interpolate(template: &str, params: &BTreeMap<String, String>) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder =
        PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid regex"));

    placeholder
        .replace_all(template, |caps: &regex::Captures<'_>| {
            params
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Escapes the five HTML-significant characters.
///
/// # Examples
///
/// ```
/// use formkit_core::utils::text::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">O'Neil & co</a>"#),
///            "&lt;a href=&quot;x&quot;&gt;O&#x27;Neil &amp; co&lt;/a&gt;");
/// ```
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
