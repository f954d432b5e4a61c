//! Choice types and the data sources that feed them.

use std::collections::BTreeMap;

use formkit_core::{FormkitError, FormkitResult, Value};
use formkit_validation::constraints::Choice;
use formkit_validation::Rule;

use super::{FieldBuilder, FieldType};
use crate::builder::BuildContext;
use crate::interfaces::{rows_to_options, DataProvider, SortOrder};
use crate::options::{Options, OptionsResolver};
use crate::transformers::ChoicesToValuesTransformer;

/// Reads `(value, label)` pairs from a `choices` option.
///
/// Accepts a map of value to label (iterated in key order), a list of
/// scalars (label equals value), a list of `[value, label]` pairs, or a list
/// of `{"value", "label"}` maps.
pub fn choice_pairs(choices: &Value) -> Vec<(String, String)> {
    match choices {
        Value::Map(map) => map
            .iter()
            .map(|(value, label)| (value.clone(), label.to_view_string()))
            .collect(),
        Value::List(items) => items.iter().filter_map(choice_pair).collect(),
        _ => Vec::new(),
    }
}

fn choice_pair(item: &Value) -> Option<(String, String)> {
    match item {
        Value::Map(entry) => {
            let value = entry.get("value")?.to_view_string();
            let label = entry
                .get("label")
                .map_or_else(|| value.clone(), Value::to_view_string);
            Some((value, label))
        }
        Value::List(pair) => match pair.as_slice() {
            [value] => Some((value.to_view_string(), value.to_view_string())),
            [value, label, ..] => Some((value.to_view_string(), label.to_view_string())),
            [] => None,
        },
        Value::Null => None,
        scalar => Some((scalar.to_view_string(), scalar.to_view_string())),
    }
}

/// Encodes pairs as the canonical, order-preserving `choices` option.
pub fn choices_to_value(pairs: &[(String, String)]) -> Value {
    Value::List(
        pairs
            .iter()
            .map(|(value, label)| {
                Value::map([("value", Value::from(value.as_str())), ("label", Value::from(label.as_str()))])
            })
            .collect(),
    )
}

/// A choice among fixed options.
///
/// Options: `choices`, `multiple`, `expanded` and `placeholder`. A rule
/// restricting the value to the choice keys is attached automatically.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceType;

impl FieldType for ChoiceType {
    fn name(&self) -> &str {
        "choice"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("choices", Value::List(Vec::new()))
            .set_allowed_types("choices", ["iterable"])
            .set_normalizer("choices", |_, choices| {
                Ok(choices_to_value(&choice_pairs(&choices)))
            })
            .set_default("multiple", false)
            .set_allowed_types("multiple", ["bool"])
            .set_default("expanded", false)
            .set_allowed_types("expanded", ["bool"])
            .set_default("placeholder", Value::Null)
            .set_allowed_types("placeholder", ["null", "string"]);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        let keys: Vec<String> = options
            .get("choices")
            .map(choice_pairs)
            .unwrap_or_default()
            .into_iter()
            .map(|(value, _)| value)
            .collect();
        let multiple = options.get("multiple").and_then(Value::as_bool).unwrap_or(false);

        if multiple {
            builder.add_transformer(ChoicesToValuesTransformer::new(keys.iter().cloned()));
        }
        if !builder.has_rule("in") {
            builder.add_rule(Rule::new(Choice::one_of(keys)));
        }
        Ok(())
    }
}

/// A drop-down list. Never expanded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectType;

impl FieldType for SelectType {
    fn name(&self) -> &str {
        "select"
    }

    fn parent(&self) -> Option<&str> {
        Some("choice")
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver.set_allowed_values("expanded", [false]);
    }
}

/// A group of radio buttons. Always expanded, never multiple.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadioType;

impl FieldType for RadioType {
    fn name(&self) -> &str {
        "radio"
    }

    fn parent(&self) -> Option<&str> {
        Some("choice")
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("expanded", true)
            .set_allowed_values("expanded", [true])
            .set_allowed_values("multiple", [false]);
    }
}

/// Where a choice field gets its options from.
#[derive(Debug, Clone)]
pub enum DataSourceKind {
    /// Literal `(value, label)` pairs.
    KeyLabel(Vec<(String, String)>),
    /// Records already in memory.
    Rows {
        /// The records, each a [`Value::Map`].
        rows: Vec<Value>,
        /// The column holding the choice value.
        key_column: String,
        /// The column holding the label.
        label_column: String,
    },
    /// Records returned by the configured [`DataProvider`]'s `get_options`.
    Provider {
        /// Column equality filters.
        criteria: BTreeMap<String, Value>,
        /// The column holding the choice value.
        key_column: String,
        /// The column holding the label.
        label_column: String,
    },
    /// A sorted, paginated [`DataProvider::find_by`] query.
    Query {
        /// Column equality filters.
        criteria: BTreeMap<String, Value>,
        /// Sort columns, applied in order.
        order_by: Vec<(String, SortOrder)>,
        /// Maximum number of records.
        limit: Option<usize>,
        /// Number of records to skip.
        offset: Option<usize>,
        /// The column holding the choice value.
        key_column: String,
        /// The column holding the label.
        label_column: String,
    },
}

impl DataSourceKind {
    /// Literal pairs.
    pub fn key_label<I, K, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        Self::KeyLabel(pairs.into_iter().map(|(k, l)| (k.into(), l.into())).collect())
    }

    /// In-memory records.
    pub fn rows(rows: Vec<Value>, key_column: impl Into<String>, label_column: impl Into<String>) -> Self {
        Self::Rows {
            rows,
            key_column: key_column.into(),
            label_column: label_column.into(),
        }
    }

    /// All provider records.
    pub fn provider(key_column: impl Into<String>, label_column: impl Into<String>) -> Self {
        Self::Provider {
            criteria: BTreeMap::new(),
            key_column: key_column.into(),
            label_column: label_column.into(),
        }
    }

    /// A provider query with no filters, ordering or pagination yet.
    pub fn query(key_column: impl Into<String>, label_column: impl Into<String>) -> Self {
        Self::Query {
            criteria: BTreeMap::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            key_column: key_column.into(),
            label_column: label_column.into(),
        }
    }

    /// Adds an equality filter. Ignored by literal and in-memory sources.
    #[must_use]
    pub fn with_criterion(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::Provider { criteria, .. } | Self::Query { criteria, .. } = &mut self {
            criteria.insert(column.into(), value.into());
        }
        self
    }

    /// Adds a sort column. Only queries are sorted.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        if let Self::Query { order_by, .. } = &mut self {
            order_by.push((column.into(), order));
        }
        self
    }

    /// Sets pagination. Only queries are paginated.
    #[must_use]
    pub fn paginate(mut self, limit: Option<usize>, offset: Option<usize>) -> Self {
        if let Self::Query {
            limit: l,
            offset: o,
            ..
        } = &mut self
        {
            *l = limit;
            *o = offset;
        }
        self
    }

    /// Loads the `(value, label)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::ConfigurationError`] if the source needs a
    /// provider and none is given, or the provider's error.
    pub fn load(&self, provider: Option<&dyn DataProvider>) -> FormkitResult<Vec<(String, String)>> {
        let require = || {
            provider.ok_or_else(|| {
                FormkitError::ConfigurationError(
                    "choices backed by a data provider need one to be configured".to_string(),
                )
            })
        };
        match self {
            Self::KeyLabel(pairs) => Ok(pairs.clone()),
            Self::Rows {
                rows,
                key_column,
                label_column,
            } => Ok(rows_to_options(rows, key_column, label_column)),
            Self::Provider {
                criteria,
                key_column,
                label_column,
            } => require()?.get_options(key_column, label_column, criteria),
            Self::Query {
                criteria,
                order_by,
                limit,
                offset,
                key_column,
                label_column,
            } => {
                let rows = require()?.find_by(criteria, order_by, *limit, *offset)?;
                Ok(rows_to_options(&rows, key_column, label_column))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_pairs_shapes() {
        let from_map = Value::map([("b", "Bee"), ("a", "Ay")]);
        assert_eq!(
            choice_pairs(&from_map),
            [("a".to_string(), "Ay".to_string()), ("b".to_string(), "Bee".to_string())]
        );

        let from_list = Value::List(vec![
            Value::from("x"),
            Value::List(vec![Value::from(2), Value::from("Two")]),
            Value::map([("value", "z"), ("label", "Zed")]),
        ]);
        assert_eq!(
            choice_pairs(&from_list),
            [
                ("x".to_string(), "x".to_string()),
                ("2".to_string(), "Two".to_string()),
                ("z".to_string(), "Zed".to_string()),
            ]
        );
    }

    #[test]
    fn test_choices_to_value_preserves_order() {
        let pairs = vec![
            ("user".to_string(), "User".to_string()),
            ("admin".to_string(), "Admin".to_string()),
        ];
        assert_eq!(choice_pairs(&choices_to_value(&pairs)), pairs);
    }

    #[test]
    fn test_rows_source() {
        let source = DataSourceKind::rows(
            vec![Value::map([("id", Value::from(7)), ("name", Value::from("Seven"))])],
            "id",
            "name",
        );
        assert_eq!(source.load(None).unwrap(), [("7".to_string(), "Seven".to_string())]);
    }

    #[test]
    fn test_provider_source_requires_provider() {
        let err = DataSourceKind::provider("id", "name").load(None).unwrap_err();
        assert!(matches!(err, FormkitError::ConfigurationError(_)));
    }

    #[test]
    fn test_criteria_ignored_for_literals() {
        let source = DataSourceKind::key_label([("a", "A")]).with_criterion("active", true);
        assert!(matches!(source, DataSourceKind::KeyLabel(ref pairs) if pairs.len() == 1));
    }
}
