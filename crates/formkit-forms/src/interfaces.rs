//! Collaborator interfaces.
//!
//! Forms talk to the outside world through these narrow traits: template
//! rendering, themes, data providers for choice lists and edit-mode data,
//! CSRF token storage, and translation. Reference implementations live in
//! [`crate::render`], [`crate::csrf`] and [`crate::providers`].

use std::collections::{BTreeMap, HashMap};

use formkit_core::utils::text::interpolate;
use formkit_core::{FormkitResult, Value};

/// Renders a template with a context.
pub trait Renderer: Send + Sync {
    /// Renders `template_id` with `context` (a [`Value::Map`]).
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::RenderError`](formkit_core::FormkitError::RenderError)
    /// if the template is missing or fails.
    fn render(&self, template_id: &str, context: &Value) -> FormkitResult<String>;

    /// Returns `true` if the template exists.
    fn exists(&self, template_id: &str) -> bool;
}

/// Maps block prefixes to template identifiers and CSS classes.
pub trait Theme: Send + Sync {
    /// The theme name.
    fn name(&self) -> &str;

    /// Returns the template for a block prefix (`"email"`, `"choice"`, ...).
    fn template_for(&self, block_prefix: &str) -> Option<String>;

    /// Returns CSS classes for an input type.
    fn css_classes(&self, _input_type: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Sort direction for [`DataProvider::find_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Read access to records used for edit-mode data and choice lists.
///
/// Records are [`Value::Map`]s keyed by column name.
pub trait DataProvider: Send + Sync {
    /// Returns the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::ProviderError`](formkit_core::FormkitError::ProviderError)
    /// if the lookup fails.
    fn find_by_id(&self, id: &Value) -> FormkitResult<Option<Value>>;

    /// Returns records whose columns equal every entry of `criteria`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_by(
        &self,
        criteria: &BTreeMap<String, Value>,
        order_by: &[(String, SortOrder)],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> FormkitResult<Vec<Value>>;

    /// Returns `(key, label)` pairs for the matching records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_options(
        &self,
        key_column: &str,
        label_column: &str,
        criteria: &BTreeMap<String, Value>,
    ) -> FormkitResult<Vec<(String, String)>> {
        let rows = self.find_by(criteria, &[], None, None)?;
        Ok(rows_to_options(&rows, key_column, label_column))
    }
}

/// Extracts `(key, label)` pairs from records, skipping records without a key.
pub fn rows_to_options(rows: &[Value], key_column: &str, label_column: &str) -> Vec<(String, String)> {
    rows.iter()
        .filter_map(|row| {
            let key = row.get(key_column)?.to_view_string();
            let label = row
                .get(label_column)
                .map_or_else(|| key.clone(), Value::to_view_string);
            Some((key, label))
        })
        .collect()
}

/// Issues and checks CSRF tokens.
pub trait CsrfTokenProvider: Send + Sync {
    /// Returns a token for the form, reusing a live one if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is misconfigured.
    fn generate_token(&self, form_id: &str) -> FormkitResult<String>;

    /// Returns `true` if `token` is the live token for the form.
    fn is_token_valid(&self, form_id: &str, token: &str) -> bool;
}

/// Translates labels and messages.
pub trait Translator: Send + Sync {
    /// Translates `key`, interpolating `{{ name }}` parameters.
    ///
    /// Implementations return the interpolated key itself when no
    /// translation exists.
    fn trans(&self, key: &str, params: &BTreeMap<String, String>, locale: Option<&str>) -> String;
}

/// An in-memory [`Translator`] backed by per-locale message catalogs.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use formkit_forms::interfaces::{CatalogTranslator, Translator};
///
/// let mut translator = CatalogTranslator::new("en");
/// translator.add("de", "Email", "E-Mail");
///
/// let none = BTreeMap::new();
/// assert_eq!(translator.trans("Email", &none, Some("de")), "E-Mail");
/// assert_eq!(translator.trans("Email", &none, None), "Email");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogTranslator {
    default_locale: String,
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl CatalogTranslator {
    /// Creates an empty translator.
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            catalogs: HashMap::new(),
        }
    }

    /// Adds one translation.
    pub fn add(
        &mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        self.catalogs
            .entry(locale.into())
            .or_default()
            .insert(key.into(), message.into());
        self
    }

    /// Adds a whole catalog for a locale.
    pub fn add_catalog<I, K, V>(&mut self, locale: impl Into<String>, messages: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.catalogs
            .entry(locale.into())
            .or_default()
            .extend(messages.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

impl Translator for CatalogTranslator {
    fn trans(&self, key: &str, params: &BTreeMap<String, String>, locale: Option<&str>) -> String {
        let locale = locale.unwrap_or(&self.default_locale);
        let template = self
            .catalogs
            .get(locale)
            .and_then(|catalog| catalog.get(key))
            .map_or(key, String::as_str);
        interpolate(template, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translator_interpolates_fallback() {
        let translator = CatalogTranslator::new("en");
        let mut params = BTreeMap::new();
        params.insert("min".to_string(), "3".to_string());
        assert_eq!(
            translator.trans("At least {{ min }}.", &params, None),
            "At least 3."
        );
    }

    #[test]
    fn test_translator_catalog() {
        let mut translator = CatalogTranslator::new("fr");
        translator.add_catalog("fr", [("Save", "Enregistrer"), ("Name", "Nom")]);
        let none = BTreeMap::new();
        assert_eq!(translator.trans("Save", &none, None), "Enregistrer");
        assert_eq!(translator.trans("Save", &none, Some("en")), "Save");
    }

    #[test]
    fn test_rows_to_options() {
        let rows = vec![
            Value::map([("id", Value::from(1)), ("name", Value::from("Admin"))]),
            Value::map([("id", Value::from(2))]),
            Value::map([("name", Value::from("orphan"))]),
        ];
        assert_eq!(
            rows_to_options(&rows, "id", "name"),
            [("1".to_string(), "Admin".to_string()), ("2".to_string(), "2".to_string())]
        );
    }
}
