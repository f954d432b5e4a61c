//! An in-memory [`DataProvider`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use formkit_core::{FormkitError, FormkitResult, Value};

use crate::interfaces::{DataProvider, SortOrder};

/// Serves records held in memory.
///
/// Criteria match on equality. Scalars compare by their display string, so
/// `Int(3)` matches `"3"` as submitted from a form.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use formkit_core::Value;
/// use formkit_forms::interfaces::DataProvider;
/// use formkit_forms::providers::MemoryDataProvider;
///
/// let provider = MemoryDataProvider::new("id").with_rows([
///     Value::map([("id", Value::from(1)), ("name", Value::from("Ada"))]),
///     Value::map([("id", Value::from(2)), ("name", Value::from("Grace"))]),
/// ]);
///
/// let record = provider.find_by_id(&Value::from("2")).unwrap().unwrap();
/// assert_eq!(record.get("name"), Some(&Value::from("Grace")));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryDataProvider {
    id_column: String,
    rows: Vec<Value>,
}

impl MemoryDataProvider {
    /// Creates an empty provider keyed by `id_column`.
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            rows: Vec::new(),
        }
    }

    /// Adds records.
    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Value>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Adds one record.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::ProviderError`] if the record is not a map.
    pub fn insert(&mut self, row: Value) -> FormkitResult<()> {
        if row.as_map().is_none() {
            return Err(FormkitError::ProviderError(format!(
                "records must be maps, got {}",
                row.type_name()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// The number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl DataProvider for MemoryDataProvider {
    fn find_by_id(&self, id: &Value) -> FormkitResult<Option<Value>> {
        Ok(self
            .rows
            .iter()
            .find(|row| row.get(&self.id_column).is_some_and(|value| loosely_equal(value, id)))
            .cloned())
    }

    fn find_by(
        &self,
        criteria: &BTreeMap<String, Value>,
        order_by: &[(String, SortOrder)],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> FormkitResult<Vec<Value>> {
        let mut rows: Vec<&Value> = self
            .rows
            .iter()
            .filter(|row| {
                criteria.iter().all(|(column, expected)| {
                    row.get(column).is_some_and(|value| loosely_equal(value, expected))
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            order_by
                .iter()
                .map(|(column, order)| {
                    let ordering = compare(a.get(column), b.get(column));
                    match order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        Ok(rows
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b
        || (!matches!(a, Value::List(_) | Value::Map(_))
            && !matches!(b, Value::List(_) | Value::Map(_))
            && a.to_view_string() == b.to_view_string())
}

/// Missing values sort first, numbers numerically, everything else by text.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.to_view_string().cmp(&b.to_view_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> MemoryDataProvider {
        let row = |id: i64, name: &str, role: &str| {
            Value::map([
                ("id", Value::from(id)),
                ("name", Value::from(name)),
                ("role", Value::from(role)),
            ])
        };
        MemoryDataProvider::new("id").with_rows([
            row(3, "Carol", "admin"),
            row(1, "Alice", "user"),
            row(10, "Bob", "admin"),
            row(2, "Dave", "user"),
        ])
    }

    fn names(rows: &[Value]) -> Vec<String> {
        rows.iter()
            .filter_map(|r| r.get("name").map(Value::to_view_string))
            .collect()
    }

    #[test]
    fn test_find_by_id() {
        let provider = users();
        assert!(provider.find_by_id(&Value::from(10)).unwrap().is_some());
        assert!(provider.find_by_id(&Value::from("1")).unwrap().is_some());
        assert!(provider.find_by_id(&Value::from(99)).unwrap().is_none());
    }

    #[test]
    fn test_find_by_orders_numerically() {
        let provider = users();
        let rows = provider
            .find_by(&BTreeMap::new(), &[("id".to_string(), SortOrder::Asc)], None, None)
            .unwrap();
        assert_eq!(names(&rows), ["Alice", "Dave", "Carol", "Bob"]);
    }

    #[test]
    fn test_find_by_criteria_and_pagination() {
        let provider = users();
        let mut criteria = BTreeMap::new();
        criteria.insert("role".to_string(), Value::from("user"));
        let rows = provider
            .find_by(&criteria, &[("name".to_string(), SortOrder::Desc)], Some(1), None)
            .unwrap();
        assert_eq!(names(&rows), ["Dave"]);

        let rows = provider
            .find_by(&BTreeMap::new(), &[("id".to_string(), SortOrder::Asc)], Some(2), Some(1))
            .unwrap();
        assert_eq!(names(&rows), ["Dave", "Carol"]);
    }

    #[test]
    fn test_get_options() {
        let provider = users();
        let mut criteria = BTreeMap::new();
        criteria.insert("role".to_string(), Value::from("admin"));
        assert_eq!(
            provider.get_options("id", "name", &criteria).unwrap(),
            [
                ("3".to_string(), "Carol".to_string()),
                ("10".to_string(), "Bob".to_string())
            ]
        );
    }

    #[test]
    fn test_insert_rejects_non_maps() {
        let mut provider = MemoryDataProvider::new("id");
        assert!(provider.insert(Value::from("nope")).is_err());
        provider.insert(Value::map([("id", Value::from(1))])).unwrap();
        assert_eq!(provider.len(), 1);
    }
}
