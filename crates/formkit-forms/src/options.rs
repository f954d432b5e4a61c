//! Option resolution for field types.
//!
//! An [`OptionsResolver`] declares which configuration keys a field type
//! understands, their defaults, the structural types and values they accept,
//! and optional normalizers. [`OptionsResolver::resolve`] turns raw caller
//! input into a complete, validated option map or fails with an
//! [`OptionsError`]. Resolution happens while a form is being built and
//! never during submission.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use formkit_core::{OptionsError, Value};

/// A resolved (or raw) option map.
pub type Options = BTreeMap<String, Value>;

/// A normalizer receives the options resolved so far and the key's value,
/// and returns the value to store.
pub type Normalizer = Arc<dyn Fn(&Options, Value) -> Result<Value, String> + Send + Sync>;

/// Declares and enforces an option schema.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_forms::options::{Options, OptionsResolver};
///
/// let mut resolver = OptionsResolver::new();
/// resolver
///     .set_default("label", Value::Null)
///     .set_default("trim", true)
///     .set_required(["choices"])
///     .set_allowed_types("label", ["null", "string"])
///     .set_allowed_types("choices", ["map"]);
///
/// let mut input = Options::new();
/// input.insert("choices".into(), Value::map([("a", "A")]));
/// let resolved = resolver.resolve(&input).unwrap();
/// assert_eq!(resolved["trim"], Value::Bool(true));
///
/// assert!(resolver.resolve(&Options::new()).is_err());
/// ```
#[derive(Clone, Default)]
pub struct OptionsResolver {
    defined: BTreeSet<String>,
    defaults: BTreeMap<String, Value>,
    required: BTreeSet<String>,
    allowed_types: BTreeMap<String, Vec<String>>,
    allowed_values: BTreeMap<String, Vec<Value>>,
    normalizers: BTreeMap<String, Normalizer>,
    allow_extra: bool,
}

impl fmt::Debug for OptionsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsResolver")
            .field("defined", &self.defined)
            .field("defaults", &self.defaults)
            .field("required", &self.required)
            .field("allowed_types", &self.allowed_types)
            .field("allowed_values", &self.allowed_values)
            .field("normalizers", &self.normalizers.keys().collect::<Vec<_>>())
            .field("allow_extra", &self.allow_extra)
            .finish()
    }
}

impl OptionsResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines an option with a default value. A later call for the same key
    /// replaces the default.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        self.defined.insert(key.clone());
        self.defaults.insert(key, value.into());
        self
    }

    /// Defines several options with default values.
    pub fn set_defaults<I, K, V>(&mut self, defaults: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in defaults {
            self.set_default(key, value);
        }
        self
    }

    /// Marks options as required. A required option with a default is
    /// always satisfied.
    pub fn set_required<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        for key in keys {
            let key = key.into();
            self.defined.insert(key.clone());
            self.required.insert(key);
        }
        self
    }

    /// Defines options that are known but optional and have no default.
    pub fn set_defined<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.defined.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Replaces the allowed type tags of an option, defining it if needed.
    ///
    /// Tags: `any`, `null`, `bool`, `int`, `float`, `number`, `string`,
    /// `array`, `map`, `iterable`, `date`, `datetime`, `time`, `scalar`, and
    /// `T[]` for a list whose elements all match `T`.
    pub fn set_allowed_types<I, T>(&mut self, key: impl Into<String>, types: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let key = key.into();
        self.defined.insert(key.clone());
        self.allowed_types
            .insert(key, types.into_iter().map(Into::into).collect());
        self
    }

    /// Adds allowed type tags to an option.
    pub fn add_allowed_types<I, T>(&mut self, key: impl Into<String>, types: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let key = key.into();
        self.defined.insert(key.clone());
        self.allowed_types
            .entry(key)
            .or_default()
            .extend(types.into_iter().map(Into::into));
        self
    }

    /// Replaces the enumeration of values an option accepts.
    pub fn set_allowed_values<I, V>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let key = key.into();
        self.defined.insert(key.clone());
        self.allowed_values
            .insert(key, values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds values to an option's enumeration.
    pub fn add_allowed_values<I, V>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let key = key.into();
        self.defined.insert(key.clone());
        self.allowed_values
            .entry(key)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets the normalizer of an option, replacing any previous one.
    pub fn set_normalizer<F>(&mut self, key: impl Into<String>, normalizer: F) -> &mut Self
    where
        F: Fn(&Options, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let key = key.into();
        self.defined.insert(key.clone());
        self.normalizers.insert(key, Arc::new(normalizer));
        self
    }

    /// Permits keys that were never defined. They pass through unchecked.
    pub fn set_allow_extra_options(&mut self, allow: bool) -> &mut Self {
        self.allow_extra = allow;
        self
    }

    /// Returns `true` if the option is known.
    pub fn is_defined(&self, key: &str) -> bool {
        self.defined.contains(key)
    }

    /// Returns `true` if the option must be provided.
    pub fn is_required(&self, key: &str) -> bool {
        self.required.contains(key)
    }

    /// Returns `true` if the option has a default value.
    pub fn has_default(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// Returns every defined option name, sorted.
    pub fn defined_options(&self) -> Vec<&str> {
        self.defined.iter().map(String::as_str).collect()
    }

    /// Resolves `input` against the schema.
    ///
    /// Input is merged over the defaults (input wins). The result contains
    /// every option with a default plus every provided option.
    ///
    /// # Errors
    ///
    /// - [`OptionsError::Undefined`] if `input` holds unknown keys and extra
    ///   options are not allowed.
    /// - [`OptionsError::Missing`] if a required option is absent.
    /// - [`OptionsError::InvalidType`] / [`OptionsError::InvalidValue`] if a
    ///   value breaks its declared types or enumeration.
    /// - [`OptionsError::Normalization`] if a normalizer rejects a value.
    pub fn resolve(&self, input: &Options) -> Result<Options, OptionsError> {
        if !self.allow_extra {
            let unknown: Vec<String> = input
                .keys()
                .filter(|key| !self.defined.contains(*key))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(OptionsError::Undefined {
                    keys: unknown,
                    known: self.defined.iter().cloned().collect(),
                });
            }
        }

        let mut resolved = self.defaults.clone();
        resolved.extend(input.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(key) = self.required.iter().find(|key| !resolved.contains_key(*key)) {
            return Err(OptionsError::Missing { key: key.clone() });
        }

        for (key, value) in &resolved {
            self.check_type(key, value)?;
            self.check_value(key, value)?;
        }

        for (key, normalizer) in &self.normalizers {
            let Some(value) = resolved.remove(key) else {
                continue;
            };
            let normalized = normalizer(&resolved, value).map_err(|message| {
                OptionsError::Normalization {
                    key: key.clone(),
                    message,
                }
            })?;
            resolved.insert(key.clone(), normalized);
        }

        Ok(resolved)
    }

    fn check_type(&self, key: &str, value: &Value) -> Result<(), OptionsError> {
        let Some(types) = self.allowed_types.get(key) else {
            return Ok(());
        };
        if types.iter().any(|tag| matches_type(value, tag)) {
            return Ok(());
        }
        Err(OptionsError::InvalidType {
            key: key.to_string(),
            expected: types.clone(),
            actual: describe_type(value),
        })
    }

    fn check_value(&self, key: &str, value: &Value) -> Result<(), OptionsError> {
        let Some(allowed) = self.allowed_values.get(key) else {
            return Ok(());
        };
        if allowed.contains(value) {
            return Ok(());
        }
        Err(OptionsError::InvalidValue {
            key: key.to_string(),
            value: display_value(value),
            allowed: allowed.iter().map(display_value).collect(),
        })
    }
}

/// Returns `true` if `value` structurally matches the type tag.
pub fn matches_type(value: &Value, tag: &str) -> bool {
    if let Some(inner) = tag.strip_suffix("[]") {
        return value
            .as_list()
            .is_some_and(|items| items.iter().all(|item| matches_type(item, inner)));
    }
    match tag {
        "any" | "mixed" => true,
        "null" => value.is_null(),
        "bool" | "boolean" => matches!(value, Value::Bool(_)),
        "int" | "integer" => matches!(value, Value::Int(_)),
        "float" => matches!(value, Value::Float(_)),
        "number" | "numeric" => value.is_number(),
        "iterable" => matches!(value, Value::List(_) | Value::Map(_)),
        "scalar" => value.is_scalar() && !value.is_null(),
        other => value.type_name() == other,
    }
}

/// Describes a value's type, including a typed-array tag for uniform lists.
fn describe_type(value: &Value) -> String {
    match value.as_list() {
        Some([first, rest @ ..]) if rest.iter().all(|v| v.type_name() == first.type_name()) => {
            format!("{}[]", first.type_name())
        }
        _ => value.type_name().to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

/// Anything usable as raw field options: `()`, an [`Options`] map, a
/// [`Value::Map`], a JSON object, or a list of key-value pairs.
pub trait IntoOptions {
    /// Performs the conversion. Non-map values yield no options.
    fn into_options(self) -> Options;
}

impl IntoOptions for () {
    fn into_options(self) -> Options {
        Options::new()
    }
}

impl IntoOptions for Options {
    fn into_options(self) -> Options {
        self
    }
}

impl IntoOptions for Value {
    fn into_options(self) -> Options {
        match self {
            Self::Map(map) => map,
            _ => Options::new(),
        }
    }
}

impl IntoOptions for serde_json::Value {
    fn into_options(self) -> Options {
        Value::from(self).into_options()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> IntoOptions for [(K, V); N] {
    fn into_options(self) -> Options {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K: Into<String>, V: Into<Value>> IntoOptions for Vec<(K, V)> {
    fn into_options(self) -> Options {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}
