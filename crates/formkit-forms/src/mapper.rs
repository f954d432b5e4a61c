//! Mapping between data bags and form trees.
//!
//! [`PropertyPath`] addresses a value inside nested maps and lists using
//! dotted (`address.city`) or bracketed (`address[city]`, `items[0]`)
//! notation. A [`DataMapper`] distributes a compound form's data over its
//! children and gathers it back.

use std::collections::BTreeMap;
use std::fmt;

use formkit_core::{FormkitResult, Value};

use crate::form::Form;

/// A parsed path into nested data.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_forms::mapper::PropertyPath;
///
/// let mut data = Value::Null;
/// PropertyPath::new("user[address].city").set_value(&mut data, Value::from("Oslo"));
/// assert_eq!(
///     PropertyPath::new("user.address.city").get_value(&data),
///     Some(&Value::from("Oslo"))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parses a dotted or bracketed path. Empty segments are ignored.
    pub fn new(path: &str) -> Self {
        let segments = path
            .split(['.', '['])
            .map(|segment| segment.trim_end_matches(']'))
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the empty path, which addresses the root.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the last segment.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns the path without its last segment.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Returns this path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Reads the value at this path.
    pub fn get_value<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(data, |current, segment| match current {
                Value::Map(map) => map.get(segment),
                Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Writes a value at this path, creating intermediate maps.
    ///
    /// Existing list elements are replaced in place; any other non-map value
    /// along the way is replaced by a map.
    pub fn set_value(&self, data: &mut Value, value: Value) {
        let Some((last, init)) = self.segments.split_last() else {
            *data = value;
            return;
        };
        let mut current = data;
        for segment in init {
            current = slot(current, segment);
        }
        *slot(current, last) = value;
    }
}

fn slot<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let list_index = match &*node {
        Value::List(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    if list_index.is_none() && !matches!(node, Value::Map(_)) {
        *node = Value::Map(BTreeMap::new());
    }
    match (node, list_index) {
        (Value::List(items), Some(index)) => &mut items[index],
        (Value::Map(map), _) => map.entry(segment.to_string()).or_default(),
        (other, _) => other,
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Distributes data over a compound form's children and gathers it back.
pub trait DataMapper: Send + Sync + fmt::Debug {
    /// Sets each mapped child's data from `data`. Children whose path is
    /// absent from `data` keep their current data.
    ///
    /// # Errors
    ///
    /// Returns an error if a child rejects its data.
    fn map_data_to_forms(&self, data: &Value, children: &mut [Form]) -> FormkitResult<()>;

    /// Writes each mapped child's data into `data`.
    fn map_forms_to_data(&self, children: &[Form], data: &mut Value);
}

/// The default [`DataMapper`]: each child reads and writes the path given by
/// its `property_path` option, or its own name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyPathMapper;

impl PropertyPathMapper {
    fn path_of(child: &Form) -> PropertyPath {
        child
            .descriptor()
            .option("property_path")
            .and_then(Value::as_str)
            .map_or_else(|| PropertyPath::new(child.name()), PropertyPath::new)
    }
}

impl DataMapper for PropertyPathMapper {
    fn map_data_to_forms(&self, data: &Value, children: &mut [Form]) -> FormkitResult<()> {
        for child in children.iter_mut().filter(|c| c.is_mapped()) {
            if let Some(value) = Self::path_of(child).get_value(data) {
                child.set_data(value.clone())?;
            }
        }
        Ok(())
    }

    fn map_forms_to_data(&self, children: &[Form], data: &mut Value) {
        if !matches!(data, Value::Map(_)) {
            *data = Value::Map(BTreeMap::new());
        }
        for child in children.iter().filter(|c| c.is_mapped()) {
            Self::path_of(child).set_value(data, child.get_data());
        }
    }
}
