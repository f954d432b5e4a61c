//! Form errors.
//!
//! A [`FormError`] is one message attached to a node of a form tree. Errors
//! carry a severity level; only [`Severity::Error`] blocks validity.
//! An [`ErrorList`] is the ordered collection a form node owns, with
//! filtering and conversion to flat (`"address.city"`) or nested maps.

use std::collections::BTreeMap;

use formkit_core::utils::text::interpolate;
use formkit_core::Value;
use formkit_validation::{Severity, Violation, FORM_LEVEL_KEY};

/// A single error attached to a form node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FormError {
    /// The interpolated message.
    pub message: String,
    /// The message template with `{{ placeholder }}` tokens.
    pub template: String,
    /// The severity level.
    pub level: Severity,
    /// The dotted path of the field, `None` for form-level errors.
    pub path: Option<String>,
    /// The interpolation parameters.
    pub parameters: BTreeMap<String, String>,
    /// A description of the underlying cause, if any.
    pub cause: Option<String>,
    /// The path of the form node that owns this error.
    pub origin: Option<String>,
}

impl FormError {
    /// Creates a blocking, form-level error with a literal message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            template: message.clone(),
            message,
            level: Severity::Error,
            path: None,
            parameters: BTreeMap::new(),
            cause: None,
            origin: None,
        }
    }

    /// Creates an error from a template, interpolating `parameters`.
    pub fn from_template(template: impl Into<String>, parameters: BTreeMap<String, String>) -> Self {
        let template = template.into();
        Self {
            message: interpolate(&template, &parameters),
            template,
            parameters,
            ..Self::new(String::new())
        }
    }

    /// Sets the field path. An empty path means form-level.
    #[must_use]
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = (!path.is_empty()).then_some(path);
        self
    }

    /// Sets the severity level.
    #[must_use]
    pub const fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Records the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Records the owning node.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns `true` if this error blocks validity.
    pub const fn is_blocking(&self) -> bool {
        self.level.is_blocking()
    }

    /// Returns the key used in flat maps: the path, or `__all__`.
    pub fn key(&self) -> &str {
        self.path.as_deref().unwrap_or(FORM_LEVEL_KEY)
    }
}

impl From<Violation> for FormError {
    fn from(violation: Violation) -> Self {
        Self {
            message: violation.message,
            template: violation.template,
            level: violation.severity,
            path: (!violation.path.is_empty()).then_some(violation.path),
            parameters: violation.parameters,
            cause: violation.code,
            origin: None,
        }
    }
}

/// An ordered collection of [`FormError`]s.
///
/// # Examples
///
/// ```
/// use formkit_forms::errors::{ErrorList, FormError};
///
/// let mut errors = ErrorList::new();
/// errors.push(FormError::new("Passwords do not match."));
/// errors.push(FormError::new("Unknown city.").at_path("address.city"));
///
/// let flat = errors.to_flat_map();
/// assert_eq!(flat["__all__"], ["Passwords do not match."]);
/// assert_eq!(flat["address.city"], ["Unknown city."]);
/// assert_eq!(errors.for_path("address", true).len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ErrorList {
    errors: Vec<FormError>,
}

impl ErrorList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn push(&mut self, error: FormError) {
        self.errors.push(error);
    }

    /// Returns the errors in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, FormError> {
        self.errors.iter()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Removes every error.
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Returns `true` if any error blocks validity.
    pub fn has_blocking(&self) -> bool {
        self.errors.iter().any(FormError::is_blocking)
    }

    /// Returns the errors with the given level.
    pub fn by_level(&self, level: Severity) -> Self {
        self.filtered(|e| e.level == level)
    }

    /// Returns the blocking errors.
    pub fn blocking(&self) -> Self {
        self.filtered(FormError::is_blocking)
    }

    /// Returns the errors at `path`. With `deep`, errors below it too.
    ///
    /// The empty path addresses form-level errors (or everything, with `deep`).
    pub fn for_path(&self, path: &str, deep: bool) -> Self {
        self.filtered(|e| {
            let own = e.path.as_deref().unwrap_or("");
            if own == path {
                return true;
            }
            deep && (path.is_empty()
                || own
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.')))
        })
    }

    /// Returns the messages in order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// Groups messages by path. Form-level messages use `__all__`.
    pub fn to_flat_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.key().to_string())
                .or_default()
                .push(error.message.clone());
        }
        map
    }

    /// Groups messages into a nested tree (see [`unflatten`]).
    pub fn to_tree(&self) -> Value {
        unflatten(&self.to_flat_map())
    }

    fn filtered(&self, keep: impl Fn(&FormError) -> bool) -> Self {
        Self {
            errors: self.errors.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }
}

impl Extend<FormError> for ErrorList {
    fn extend<T: IntoIterator<Item = FormError>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

impl FromIterator<FormError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = FormError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ErrorList {
    type Item = FormError;
    type IntoIter = std::vec::IntoIter<FormError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FormError;
    type IntoIter = std::slice::Iter<'a, FormError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

// ============================================================
// Flatten / unflatten
// ============================================================

fn is_message_list(value: &Value) -> bool {
    value
        .as_list()
        .is_some_and(|items| items.iter().all(|item| matches!(item, Value::String(_))))
}

fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::List(items) => items.iter().map(Value::to_view_string).collect(),
        _ => Vec::new(),
    }
}

/// Flattens a nested error tree into dotted paths.
///
/// A list of strings (or a single string) is terminal: it holds the
/// messages of that path and is never descended into. Messages stored under
/// an `__all__` key belong to the enclosing path.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_forms::errors::flatten;
///
/// let tree = Value::from(serde_json::json!({
///     "address": {"city": ["Required."], "zip": ["Too short.", "Digits only."]},
/// }));
/// let flat = flatten(&tree);
/// assert_eq!(flat["address.zip"].len(), 2);
/// ```
pub fn flatten(tree: &Value) -> BTreeMap<String, Vec<String>> {
    let mut flat = BTreeMap::new();
    flatten_into(tree, "", &mut flat);
    flat
}

fn flatten_into(node: &Value, prefix: &str, flat: &mut BTreeMap<String, Vec<String>>) {
    if matches!(node, Value::String(_)) || is_message_list(node) {
        let key = if prefix.is_empty() { FORM_LEVEL_KEY } else { prefix };
        flat.entry(key.to_string())
            .or_default()
            .extend(messages_of(node));
        return;
    }
    let Value::Map(children) = node else {
        return;
    };
    for (key, child) in children {
        let path = if key == FORM_LEVEL_KEY {
            prefix.to_string()
        } else if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten_into(child, &path, flat);
    }
}

/// Expands dotted paths into a nested error tree.
///
/// When a path has both its own messages and nested paths, its own messages
/// move under an `__all__` key so both survive. `flatten(&unflatten(x))`
/// returns `x`.
pub fn unflatten(flat: &BTreeMap<String, Vec<String>>) -> Value {
    let mut tree = Value::Map(BTreeMap::new());
    // Deeper paths first so a parent's own messages can detect children.
    let mut entries: Vec<(&String, &Vec<String>)> = flat.iter().collect();
    entries.sort_by_key(|(path, _)| std::cmp::Reverse(path.matches('.').count()));

    for (path, messages) in entries {
        let list = Value::List(messages.iter().cloned().map(Value::String).collect());
        if path == FORM_LEVEL_KEY {
            insert_messages(&mut tree, list);
            continue;
        }
        let mut node = &mut tree;
        for segment in path.split('.') {
            match *node {
                Value::Map(_) => {}
                Value::Null => *node = Value::Map(BTreeMap::new()),
                _ => {
                    let own = std::mem::take(node);
                    *node = Value::map([(FORM_LEVEL_KEY, own)]);
                }
            }
            let Value::Map(map) = node else {
                break;
            };
            node = map.entry(segment.to_string()).or_default();
        }
        insert_messages(node, list);
    }
    tree
}

fn insert_messages(node: &mut Value, list: Value) {
    match node {
        Value::Map(map) => {
            map.insert(FORM_LEVEL_KEY.to_string(), list);
        }
        other => *other = list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.iter().map(|s| (*s).to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_form_error_from_violation() {
        let violation = Violation {
            path: "age".into(),
            template: "The {{ field }} must be at least {{ min }}.".into(),
            message: "The age must be at least 18.".into(),
            parameters: BTreeMap::from([("min".to_string(), "18".to_string())]),
            code: Some("min".into()),
            severity: Severity::Warning,
            invalid_value: Value::from(15),
        };
        let error = FormError::from(violation);
        assert_eq!(error.key(), "age");
        assert_eq!(error.level, Severity::Warning);
        assert!(!error.is_blocking());
        assert_eq!(error.parameters["min"], "18");
    }

    #[test]
    fn test_from_template() {
        let params = BTreeMap::from([("max".to_string(), "5".to_string())]);
        let error = FormError::from_template("No more than {{ max }}.", params).at_path("");
        assert_eq!(error.message, "No more than 5.");
        assert_eq!(error.path, None);
        assert_eq!(error.key(), "__all__");
    }

    #[test]
    fn test_filters() {
        let list: ErrorList = [
            FormError::new("a").at_path("address"),
            FormError::new("b").at_path("address.city"),
            FormError::new("c").at_path("addressee"),
            FormError::new("d").with_level(Severity::Info),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.for_path("address", false).messages(), ["a"]);
        assert_eq!(list.for_path("address", true).messages(), ["a", "b"]);
        assert_eq!(list.for_path("", false).messages(), ["d"]);
        assert_eq!(list.for_path("", true).len(), 4);
        assert_eq!(list.by_level(Severity::Info).messages(), ["d"]);
        assert_eq!(list.blocking().len(), 3);
        assert!(list.has_blocking());
    }

    #[test]
    fn test_flatten_nested_tree() {
        let tree = Value::from(json!({
            "__all__": ["Form broken."],
            "email": ["Invalid."],
            "address": {"city": ["Required."], "__all__": ["Incomplete."]}
        }));
        assert_eq!(
            flatten(&tree),
            flat(&[
                ("__all__", &["Form broken."]),
                ("address", &["Incomplete."]),
                ("address.city", &["Required."]),
                ("email", &["Invalid."]),
            ])
        );
    }

    #[test]
    fn test_string_list_is_terminal() {
        // A list of strings is never descended into by index.
        let tree = Value::from(json!({"tags": ["Too many.", "Duplicate."]}));
        assert_eq!(
            flatten(&tree),
            flat(&[("tags", &["Too many.", "Duplicate."])])
        );
    }

    #[test]
    fn test_unflatten() {
        let tree = unflatten(&flat(&[
            ("email", &["Invalid."]),
            ("address.city", &["Required."]),
        ]));
        assert_eq!(
            tree.to_json(),
            json!({"email": ["Invalid."], "address": {"city": ["Required."]}})
        );
    }

    #[test]
    fn test_unflatten_parent_and_child_messages() {
        let input = flat(&[
            ("__all__", &["Form broken."]),
            ("address", &["Incomplete."]),
            ("address.city", &["Required."]),
        ]);
        let tree = unflatten(&input);
        assert_eq!(
            tree.to_json(),
            json!({
                "__all__": ["Form broken."],
                "address": {"__all__": ["Incomplete."], "city": ["Required."]}
            })
        );
        assert_eq!(flatten(&tree), input);
    }

    #[test]
    fn test_error_list_to_tree() {
        let mut list = ErrorList::new();
        list.push(FormError::new("Bad zip.").at_path("address.zip"));
        list.push(FormError::new("Also bad.").at_path("address.zip"));
        assert_eq!(
            list.to_tree().to_json(),
            json!({"address": {"zip": ["Bad zip.", "Also bad."]}})
        );
    }

    #[test]
    fn test_unflatten_deep_paths_have_no_form_level_key() {
        let input = flat(&[
            ("profile.address.city", &["Required."]),
            ("profile.address.zip", &["Too short."]),
            ("profile.name", &["Required."]),
        ]);
        let tree = unflatten(&input);
        assert_eq!(
            tree.to_json(),
            json!({
                "profile": {
                    "address": {"city": ["Required."], "zip": ["Too short."]},
                    "name": ["Required."]
                }
            })
        );
        assert!(tree.get("profile").and_then(|p| p.get("__all__")).is_none());
        assert_eq!(flatten(&tree), input);
    }
}
