//! Data transformers.
//!
//! A [`DataTransformer`] converts a field's value between its model
//! representation (numbers, booleans, dates, lists) and its view
//! representation (the strings an HTML form submits and displays).
//! `transform` goes model to view; `reverse_transform` goes view to model.
//!
//! Every transformer passes [`Value::Null`] through untouched in both
//! directions.
//!
//! Transformers are stacked in a [`TransformerChain`]. Both directions walk
//! the chain in declared order: each transformer consumes the output of the
//! one declared before it.

use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;

use formkit_core::settings::utc;
use formkit_core::utils::dates::{
    has_date_component, has_offset_component, has_time_component, parse_lenient, to_strftime,
};
use formkit_core::{BoxError, FormSettings, TransformationError, Value};

/// Converts a value between its model and view representations.
pub trait DataTransformer: Send + Sync + fmt::Debug {
    /// A short name used in error reports.
    fn name(&self) -> &str;

    /// Converts a model value into its view representation.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformationError`] if the value has the wrong shape.
    fn transform(&self, value: &Value) -> Result<Value, TransformationError>;

    /// Converts a submitted view value into its model representation.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformationError`] if the value cannot be parsed.
    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError>;
}

/// An ordered stack of transformers applied in declared order.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_forms::transformers::{CallbackTransformer, TransformerChain};
///
/// let mut chain = TransformerChain::new();
/// chain.push(CallbackTransformer::map(
///     |v| Value::from(v.to_view_string().to_uppercase()),
///     |v| Value::from(v.to_view_string().to_lowercase()),
/// ));
/// chain.push(CallbackTransformer::map(
///     |v| Value::from(format!("PREFIX_{}", v.to_view_string())),
///     |v| Value::from(v.to_view_string().trim_start_matches("PREFIX_").to_string()),
/// ));
///
/// assert_eq!(chain.transform(&Value::from("example")).unwrap(), Value::from("PREFIX_EXAMPLE"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransformerChain {
    transformers: Vec<Arc<dyn DataTransformer>>,
}

impl TransformerChain {
    /// Creates an empty chain. An empty chain returns values unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transformer.
    pub fn push(&mut self, transformer: impl DataTransformer + 'static) {
        self.transformers.push(Arc::new(transformer));
    }

    /// Appends a shared transformer.
    pub fn push_arc(&mut self, transformer: Arc<dyn DataTransformer>) {
        self.transformers.push(transformer);
    }

    /// Removes every transformer.
    pub fn clear(&mut self) {
        self.transformers.clear();
    }

    /// Returns the transformer names in declared order.
    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Returns the number of transformers.
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Returns `true` if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Applies every `transform` in declared order.
    ///
    /// # Errors
    ///
    /// Returns the first failure, annotated with the transformer's name.
    pub fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        self.transformers.iter().try_fold(value.clone(), |acc, t| {
            if acc.is_null() {
                return Ok(acc);
            }
            t.transform(&acc).map_err(|e| e.in_transformer(t.name()))
        })
    }

    /// Applies every `reverse_transform` in declared order.
    ///
    /// # Errors
    ///
    /// Returns the first failure, annotated with the transformer's name.
    pub fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        self.transformers.iter().try_fold(value.clone(), |acc, t| {
            if acc.is_null() {
                return Ok(acc);
            }
            t.reverse_transform(&acc)
                .map_err(|e| e.in_transformer(t.name()))
        })
    }
}

fn unexpected(value: &Value, expected: &str) -> TransformationError {
    TransformationError::new(
        value.to_view_string(),
        format!("Expected {expected}, got {}.", value.type_name()),
    )
}

// ============================================================
// Dates
// ============================================================

/// Formats dates as strings and parses them back.
///
/// The format may use single-letter tokens (`Y-m-d H:i:s`) or `strftime`
/// specifiers. Model values live in the input timezone, view strings in the
/// output timezone.
///
/// For formats without a time component `reverse_transform` yields a
/// [`Value::Date`], for formats without a date component a [`Value::Time`]
/// (wall-clock, no timezone conversion), otherwise a [`Value::DateTime`] in
/// the input timezone.
#[derive(Debug, Clone)]
pub struct DateTimeToStringTransformer {
    format: String,
    strftime: String,
    input_tz: FixedOffset,
    output_tz: FixedOffset,
}

impl DateTimeToStringTransformer {
    /// Creates a transformer for `format` with both timezones in UTC.
    pub fn new(format: impl Into<String>) -> Self {
        let format = format.into();
        let strftime = to_strftime(&format);
        Self {
            format,
            strftime,
            input_tz: utc(),
            output_tz: utc(),
        }
    }

    /// Sets the model (`input`) and view (`output`) timezones.
    #[must_use]
    pub fn with_timezones(mut self, input: FixedOffset, output: FixedOffset) -> Self {
        self.input_tz = input;
        self.output_tz = output;
        self
    }

    /// Returns the format as given.
    pub fn format(&self) -> &str {
        &self.format
    }

    fn to_datetime(&self, value: &Value) -> Result<DateTime<FixedOffset>, TransformationError> {
        let naive = match value {
            Value::DateTime(dt) => return Ok(*dt),
            Value::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            Value::String(s) => parse_lenient(s).ok_or_else(|| unexpected(value, "a date"))?,
            other => return Err(unexpected(other, "a date")),
        };
        self.input_tz
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| TransformationError::new(value.to_view_string(), "Ambiguous local time."))
    }

    fn parse(&self, text: &str) -> Result<Value, chrono::ParseError> {
        if has_offset_component(&self.strftime) {
            let dt = DateTime::parse_from_str(text, &self.strftime)?;
            return Ok(Value::DateTime(dt.with_timezone(&self.input_tz)));
        }
        if !has_date_component(&self.strftime) && has_time_component(&self.strftime) {
            return NaiveTime::parse_from_str(text, &self.strftime).map(Value::Time);
        }
        if has_time_component(&self.strftime) {
            let naive = NaiveDateTime::parse_from_str(text, &self.strftime)?;
            let viewed = naive
                .and_local_timezone(self.output_tz)
                .single()
                .unwrap_or_else(|| naive.and_utc().fixed_offset());
            return Ok(Value::DateTime(viewed.with_timezone(&self.input_tz)));
        }
        NaiveDate::parse_from_str(text, &self.strftime).map(Value::Date)
    }
}

impl DataTransformer for DateTimeToStringTransformer {
    fn name(&self) -> &str {
        "datetime_to_string"
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mut out = String::new();
        let written = match value {
            Value::Time(t) => write!(out, "{}", t.format(&self.strftime)),
            _ => {
                let dt = self.to_datetime(value)?.with_timezone(&self.output_tz);
                write!(out, "{}", dt.format(&self.strftime))
            }
        };
        written.map_err(|_| {
            TransformationError::new(
                value.to_view_string(),
                format!("Invalid date format \"{}\".", self.format),
            )
        })?;
        Ok(Value::String(out))
    }

    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) => Ok(value.clone()),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => self.parse(s.trim()).map_err(|e| {
                TransformationError::new(
                    s.clone(),
                    format!("Unable to parse \"{s}\" with format \"{}\": {e}.", self.format),
                )
                .with_source(e)
            }),
            other => Err(unexpected(other, "a string")),
        }
    }
}

// ============================================================
// Lists
// ============================================================

/// Joins a list into a delimited string and splits it back.
#[derive(Debug, Clone)]
pub struct StringToArrayTransformer {
    delimiter: String,
    trim: bool,
    remove_empty: bool,
}

impl StringToArrayTransformer {
    /// Creates a transformer that trims entries and drops empty ones.
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            trim: true,
            remove_empty: true,
        }
    }

    /// Sets whether entries are trimmed.
    #[must_use]
    pub const fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Sets whether empty entries are dropped.
    #[must_use]
    pub const fn with_remove_empty(mut self, remove_empty: bool) -> Self {
        self.remove_empty = remove_empty;
        self
    }

    fn clean<'a>(&self, parts: impl Iterator<Item = &'a str>) -> Vec<String> {
        parts
            .map(|p| if self.trim { p.trim() } else { p })
            .filter(|p| !(self.remove_empty && p.is_empty()))
            .map(str::to_string)
            .collect()
    }
}

impl DataTransformer for StringToArrayTransformer {
    fn name(&self) -> &str {
        "string_to_array"
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::List(items) => {
                let strings: Vec<String> = items.iter().map(Value::to_view_string).collect();
                let parts = self.clean(strings.iter().map(String::as_str));
                Ok(Value::String(parts.join(&self.delimiter)))
            }
            other => Err(unexpected(other, "an array")),
        }
    }

    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if self.delimiter.is_empty() => {
                Ok(Value::List(vec![Value::String(s.clone())]))
            }
            Value::String(s) => Ok(Value::List(
                self.clean(s.split(self.delimiter.as_str()))
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            )),
            other => Err(unexpected(other, "a string")),
        }
    }
}

// ============================================================
// Numbers
// ============================================================

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("valid regex"))
}

/// Formats numbers with a fixed precision and localized separators.
///
/// Reverse transformation is lossy: values are rounded to `precision` when
/// rounding is enabled.
#[derive(Debug, Clone)]
pub struct NumberToLocalizedStringTransformer {
    precision: u32,
    decimal_separator: String,
    thousands_separator: String,
    round: bool,
}

impl NumberToLocalizedStringTransformer {
    /// Creates a transformer with rounding enabled.
    pub fn new(
        precision: u32,
        decimal_separator: impl Into<String>,
        thousands_separator: impl Into<String>,
    ) -> Self {
        Self {
            precision,
            decimal_separator: decimal_separator.into(),
            thousands_separator: thousands_separator.into(),
            round: true,
        }
    }

    /// Creates a transformer from the configured separators and precision.
    pub fn from_settings(settings: &FormSettings) -> Self {
        Self::new(
            settings.number_precision,
            settings.decimal_separator.clone(),
            settings.thousands_separator.clone(),
        )
    }

    /// Sets whether parsed values are rounded to the precision.
    #[must_use]
    pub const fn with_rounding(mut self, round: bool) -> Self {
        self.round = round;
        self
    }

    /// Returns the configured precision.
    pub const fn precision(&self) -> u32 {
        self.precision
    }

    fn format(&self, n: f64) -> String {
        let n = round_to(n, self.precision);
        let fixed = format!("{:.*}", self.precision as usize, n.abs());
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

        let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3);
        for (i, c) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push_str(&self.thousands_separator);
            }
            grouped.push(c);
        }

        let negative = n < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&grouped);
        if !frac_part.is_empty() {
            out.push_str(&self.decimal_separator);
            out.push_str(frac_part);
        }
        out
    }

    fn parse(&self, text: &str) -> Result<f64, TransformationError> {
        let mut normalized = text.trim().to_string();
        if !self.thousands_separator.is_empty() {
            normalized = normalized.replace(&self.thousands_separator, "");
        }
        if self.decimal_separator != "." {
            normalized = normalized.replace(&self.decimal_separator, ".");
        }
        if !numeric_re().is_match(&normalized) {
            return Err(TransformationError::new(text, "The value is not a valid number."));
        }
        let n: f64 = normalized.parse().map_err(|e| {
            TransformationError::new(text, "The value is not a valid number.").with_source(e)
        })?;
        let n = if self.round { round_to(n, self.precision) } else { n };
        if !n.is_finite() {
            return Err(TransformationError::new(text, "The number is too large."));
        }
        Ok(n)
    }
}

/// Rounds half away from zero. Values too large to scale are returned as is.
fn round_to(n: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    let scaled = n * factor;
    if factor.is_finite() && scaled.is_finite() {
        scaled.round() / factor
    } else {
        n
    }
}

impl DataTransformer for NumberToLocalizedStringTransformer {
    fn name(&self) -> &str {
        "number_to_localized_string"
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(_) | Value::Float(_) => {
                let n = value.as_f64().unwrap_or_default();
                Ok(Value::String(self.format(n)))
            }
            other => Err(unexpected(other, "a number")),
        }
    }

    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => self.parse(s).map(Value::Float),
            Value::Int(_) | Value::Float(_) => {
                let n = value.as_f64().unwrap_or_default();
                Ok(Value::Float(if self.round { round_to(n, self.precision) } else { n }))
            }
            other => Err(unexpected(other, "a string")),
        }
    }
}

/// Formats integers and parses them back strictly.
///
/// Fractional input such as `"12.5"` is rejected rather than rounded.
#[derive(Debug, Clone)]
pub struct IntegerToStringTransformer {
    inner: NumberToLocalizedStringTransformer,
}

impl IntegerToStringTransformer {
    /// Creates an integer transformer without grouping.
    pub fn new() -> Self {
        Self::with_grouping("")
    }

    /// Creates an integer transformer grouping thousands with `separator`.
    pub fn with_grouping(separator: impl Into<String>) -> Self {
        Self {
            inner: NumberToLocalizedStringTransformer::new(0, ".", separator).with_rounding(false),
        }
    }
}

impl Default for IntegerToStringTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl DataTransformer for IntegerToStringTransformer {
    fn name(&self) -> &str {
        "integer_to_string"
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        self.inner.transform(value)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        if matches!(value, Value::Int(_)) {
            return Ok(value.clone());
        }
        let parsed = self.inner.reverse_transform(value)?;
        let Some(n) = parsed.as_f64() else {
            return Ok(Value::Null);
        };
        if n.fract() != 0.0 || n.abs() >= 9.2e18 {
            return Err(TransformationError::new(
                value.to_view_string(),
                "The value is not a valid integer.",
            ));
        }
        Ok(Value::Int(n as i64))
    }
}

// ============================================================
// Booleans
// ============================================================

const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];
const FALSY: [&str; 4] = ["0", "false", "no", "off"];

/// Maps booleans to configurable strings.
///
/// Reverse transformation is tolerant: besides the configured strings it
/// accepts `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off` (any case),
/// the integers 1 and 0, and booleans. Empty input is null.
#[derive(Debug, Clone)]
pub struct BooleanToStringTransformer {
    true_value: String,
    false_value: String,
}

impl BooleanToStringTransformer {
    /// Creates a transformer with custom true/false strings.
    pub fn new(true_value: impl Into<String>, false_value: impl Into<String>) -> Self {
        Self {
            true_value: true_value.into(),
            false_value: false_value.into(),
        }
    }

    fn parse(&self, text: &str) -> Option<bool> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(&self.true_value) {
            return Some(true);
        }
        if text.eq_ignore_ascii_case(&self.false_value) {
            return Some(false);
        }
        let lower = text.to_ascii_lowercase();
        if TRUTHY.contains(&lower.as_str()) {
            Some(true)
        } else if FALSY.contains(&lower.as_str()) {
            Some(false)
        } else {
            None
        }
    }
}

impl Default for BooleanToStringTransformer {
    fn default() -> Self {
        Self::new("1", "0")
    }
}

impl DataTransformer for BooleanToStringTransformer {
    fn name(&self) -> &str {
        "boolean_to_string"
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(true) => Ok(Value::String(self.true_value.clone())),
            Value::Bool(false) => Ok(Value::String(self.false_value.clone())),
            other => Err(unexpected(other, "a boolean")),
        }
    }

    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => self.parse(s).map(Value::Bool).ok_or_else(|| {
                TransformationError::new(
                    s.clone(),
                    format!(
                        "Expected \"{}\" or \"{}\" (or a common boolean spelling).",
                        self.true_value, self.false_value
                    ),
                )
            }),
            other => Err(unexpected(other, "a boolean string")),
        }
    }
}

// ============================================================
// Choices
// ============================================================

/// Converts between a list of submitted choice keys and the model list,
/// rejecting keys that are not known choices.
#[derive(Debug, Clone)]
pub struct ChoicesToValuesTransformer {
    choices: Vec<String>,
}

impl ChoicesToValuesTransformer {
    /// Creates a transformer over the given choice keys.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl DataTransformer for ChoicesToValuesTransformer {
    fn name(&self) -> &str {
        "choices_to_values"
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|v| Value::String(v.to_view_string()))
                    .collect(),
            )),
            other => Err(unexpected(other, "an array")),
        }
    }

    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        let items = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) if s.is_empty() => return Ok(Value::List(Vec::new())),
            Value::List(items) => items,
            other => return Err(unexpected(other, "an array")),
        };
        items
            .iter()
            .map(|item| {
                let key = item.to_view_string();
                if self.choices.contains(&key) {
                    Ok(Value::String(key))
                } else {
                    Err(TransformationError::new(
                        key.clone(),
                        format!("The choice \"{key}\" does not exist."),
                    ))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }
}

// ============================================================
// Callbacks
// ============================================================

/// A fallible conversion function used by [`CallbackTransformer`].
pub type TransformFn = dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync;

/// Wraps two arbitrary functions.
///
/// Errors returned by the functions, and panics raised inside them, are
/// converted into [`TransformationError`]s carrying the original cause.
#[derive(Clone)]
pub struct CallbackTransformer {
    name: String,
    forward: Arc<TransformFn>,
    reverse: Arc<TransformFn>,
}

impl fmt::Debug for CallbackTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTransformer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CallbackTransformer {
    /// Creates a transformer from two fallible functions.
    pub fn new<F, R>(forward: F, reverse: R) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
        R: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: "callback".to_string(),
            forward: Arc::new(forward),
            reverse: Arc::new(reverse),
        }
    }

    /// Creates a transformer from two infallible functions.
    pub fn map<F, R>(forward: F, reverse: R) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::new(move |v| Ok(forward(v)), move |v| Ok(reverse(v)))
    }

    /// Names this transformer in error reports.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn call(func: &TransformFn, value: &Value) -> Result<Value, TransformationError> {
        match panic::catch_unwind(AssertUnwindSafe(|| func(value))) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(cause)) => Err(TransformationError::new(
                value.to_view_string(),
                cause.to_string(),
            )
            .with_source(cause)),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "callback panicked".to_string());
                Err(TransformationError::new(value.to_view_string(), message))
            }
        }
    }
}

impl DataTransformer for CallbackTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, value: &Value) -> Result<Value, TransformationError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Self::call(self.forward.as_ref(), value)
    }

    fn reverse_transform(&self, value: &Value) -> Result<Value, TransformationError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Self::call(self.reverse.as_ref(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // ── Dates ──

    #[test]
    fn test_date_transform() {
        let t = DateTimeToStringTransformer::new("Y-m-d");
        let date = NaiveDate::from_ymd_opt(1990, 5, 15).unwrap();
        assert_eq!(t.transform(&Value::Date(date)).unwrap(), Value::from("1990-05-15"));
    }

    #[test]
    fn test_date_reverse_transform() {
        let t = DateTimeToStringTransformer::new("Y-m-d");
        let parsed = t.reverse_transform(&Value::from("1995-08-20")).unwrap();
        assert_eq!(parsed, Value::Date(NaiveDate::from_ymd_opt(1995, 8, 20).unwrap()));
    }

    #[test]
    fn test_date_reverse_transform_failure_mentions_format() {
        let t = DateTimeToStringTransformer::new("d/m/Y");
        let err = t.reverse_transform(&Value::from("1995-08-20")).unwrap_err();
        assert!(err.message.contains("d/m/Y"));
        assert_eq!(err.value, "1995-08-20");
    }

    #[test]
    fn test_datetime_timezones() {
        let berlin = FixedOffset::east_opt(2 * 3600).unwrap();
        let t = DateTimeToStringTransformer::new("Y-m-d H:i").with_timezones(utc(), berlin);
        let model = utc().with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();

        let view = t.transform(&Value::DateTime(model)).unwrap();
        assert_eq!(view, Value::from("2024-06-01 12:30"));

        let back = t.reverse_transform(&view).unwrap();
        assert_eq!(back, Value::DateTime(model));
        assert_eq!(back.to_json(), serde_json::json!("2024-06-01T10:30:00+00:00"));
    }

    #[test]
    fn test_datetime_strftime_format() {
        let t = DateTimeToStringTransformer::new("%d.%m.%Y");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(t.transform(&Value::Date(date)).unwrap(), Value::from("29.02.2024"));
    }

    #[test]
    fn test_time_only_format_round_trip() {
        let t = DateTimeToStringTransformer::new("H:i");
        let model = utc().with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        let view = t.transform(&Value::DateTime(model)).unwrap();
        assert_eq!(view, Value::from("10:30"));

        let back = t.reverse_transform(&view).unwrap();
        let expected = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        assert_eq!(back, Value::Time(expected));
        assert_eq!(t.transform(&back).unwrap(), view);
    }

    #[test]
    fn test_time_value_with_twelve_hour_format() {
        let t = DateTimeToStringTransformer::new("h:i A");
        let time = Value::Time(NaiveTime::from_hms_opt(21, 5, 0).unwrap());
        let view = t.transform(&time).unwrap();
        assert_eq!(view, Value::from("09:05 PM"));
        assert_eq!(t.reverse_transform(&view).unwrap(), time);
    }

    #[test]
    fn test_time_value_rejected_by_date_format() {
        let t = DateTimeToStringTransformer::new("Y-m-d");
        let time = Value::Time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert!(t.transform(&time).is_err());
    }

    #[test]
    fn test_date_null_and_empty() {
        let t = DateTimeToStringTransformer::new("Y-m-d");
        assert_eq!(t.transform(&Value::Null).unwrap(), Value::Null);
        assert_eq!(t.reverse_transform(&Value::from("  ")).unwrap(), Value::Null);
        assert!(t.transform(&Value::from(12)).is_err());
    }

    // ── Lists ──

    #[test]
    fn test_string_to_array() {
        let t = StringToArrayTransformer::new(", ");
        let model = Value::from(vec!["php", "symfony", "laravel"]);
        assert_eq!(t.transform(&model).unwrap(), Value::from("php, symfony, laravel"));
        assert_eq!(
            t.reverse_transform(&Value::from("javascript, react, nodejs")).unwrap(),
            Value::from(vec!["javascript", "react", "nodejs"])
        );
    }

    #[test]
    fn test_string_to_array_trims_and_drops_empty() {
        let t = StringToArrayTransformer::new(",");
        assert_eq!(
            t.reverse_transform(&Value::from(" a,, b ,")).unwrap(),
            Value::from(vec!["a", "b"])
        );
        let keep = StringToArrayTransformer::new(",").with_trim(false).with_remove_empty(false);
        assert_eq!(
            keep.reverse_transform(&Value::from(" a,,b")).unwrap(),
            Value::from(vec![" a", "", "b"])
        );
    }

    // ── Numbers ──

    #[test]
    fn test_number_localized() {
        let t = NumberToLocalizedStringTransformer::new(2, ".", ",");
        assert_eq!(t.transform(&Value::from(75000.50)).unwrap(), Value::from("75,000.50"));
        assert_eq!(
            t.reverse_transform(&Value::from("85,000.00")).unwrap(),
            Value::Float(85000.0)
        );
    }

    #[test]
    fn test_number_european_separators() {
        let t = NumberToLocalizedStringTransformer::new(2, ",", ".");
        assert_eq!(t.transform(&Value::from(1234567.891)).unwrap(), Value::from("1.234.567,89"));
        assert_eq!(
            t.reverse_transform(&Value::from("1.234,5")).unwrap(),
            Value::Float(1234.5)
        );
    }

    #[test]
    fn test_number_negative_and_small() {
        let t = NumberToLocalizedStringTransformer::new(1, ".", ",");
        assert_eq!(t.transform(&Value::from(-1234.26)).unwrap(), Value::from("-1,234.3"));
        assert_eq!(t.transform(&Value::from(-0.01)).unwrap(), Value::from("0.0"));
        assert_eq!(t.transform(&Value::from(999)).unwrap(), Value::from("999.0"));
    }

    #[test]
    fn test_number_rounds_on_reverse() {
        let t = NumberToLocalizedStringTransformer::new(2, ".", ",");
        assert_eq!(t.reverse_transform(&Value::from("3.14159")).unwrap(), Value::Float(3.14));
        let exact = NumberToLocalizedStringTransformer::new(2, ".", ",").with_rounding(false);
        assert_eq!(
            exact.reverse_transform(&Value::from("3.14159")).unwrap(),
            Value::Float(3.14159)
        );
    }

    #[test]
    fn test_number_rejects_garbage() {
        let t = NumberToLocalizedStringTransformer::new(2, ".", ",");
        for bad in ["abc", "1.2.3", "12e5", "--1"] {
            assert!(t.reverse_transform(&Value::from(bad)).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_number_round_trip_at_precision() {
        let t = NumberToLocalizedStringTransformer::new(2, ".", ",");
        for n in [0.0, 1.5, 1234.56, -98765.43] {
            let view = t.transform(&Value::from(n)).unwrap();
            assert_eq!(t.reverse_transform(&view).unwrap(), Value::Float(n));
        }
    }

    #[test]
    fn test_number_ties_round_the_same_both_ways() {
        let whole = NumberToLocalizedStringTransformer::new(0, ".", ",");
        assert_eq!(whole.transform(&Value::from(2.5)).unwrap(), Value::from("3"));
        assert_eq!(whole.transform(&Value::from(-2.5)).unwrap(), Value::from("-3"));
        assert_eq!(whole.reverse_transform(&Value::from(2.5)).unwrap(), Value::Float(3.0));
        assert_eq!(whole.reverse_transform(&Value::from("2.5")).unwrap(), Value::Float(3.0));

        let cents = NumberToLocalizedStringTransformer::new(2, ".", ",");
        assert_eq!(cents.transform(&Value::from(0.125)).unwrap(), Value::from("0.13"));
        assert_eq!(cents.reverse_transform(&Value::from("0.125")).unwrap(), Value::Float(0.13));

        let view = cents.transform(&Value::from(0.125)).unwrap();
        assert_eq!(
            cents.reverse_transform(&view).unwrap(),
            cents.reverse_transform(&Value::from(0.125)).unwrap()
        );
    }

    #[test]
    fn test_number_huge_values_stay_finite() {
        let t = NumberToLocalizedStringTransformer::new(2, ".", "");
        let huge = "1".repeat(308);
        match t.reverse_transform(&Value::from(huge.as_str())).unwrap() {
            Value::Float(n) => assert!(n.is_finite()),
            other => panic!("expected a float, got {other:?}"),
        }
        assert!(t.reverse_transform(&Value::from("9".repeat(400).as_str())).is_err());

        let view = t.transform(&Value::Float(f64::MAX)).unwrap();
        assert!(!view.to_view_string().contains("inf"));
    }

    #[test]
    fn test_integer_strict() {
        let t = IntegerToStringTransformer::new();
        assert_eq!(t.reverse_transform(&Value::from("42")).unwrap(), Value::Int(42));
        assert_eq!(t.reverse_transform(&Value::from(" -7 ")).unwrap(), Value::Int(-7));
        assert!(t.reverse_transform(&Value::from("12.5")).is_err());
        assert_eq!(t.transform(&Value::from(1500)).unwrap(), Value::from("1500"));
        let grouped = IntegerToStringTransformer::with_grouping(",");
        assert_eq!(grouped.transform(&Value::from(1500)).unwrap(), Value::from("1,500"));
    }

    // ── Booleans ──

    #[test]
    fn test_boolean_custom_strings() {
        let t = BooleanToStringTransformer::new("yes", "no");
        assert_eq!(t.transform(&Value::Bool(true)).unwrap(), Value::from("yes"));
        assert_eq!(t.reverse_transform(&Value::from("yes")).unwrap(), Value::Bool(true));
        let err = t.reverse_transform(&Value::from("maybe")).unwrap_err();
        assert_eq!(err.value, "maybe");
        assert!(err.message.contains("\"yes\""));
    }

    #[test]
    fn test_boolean_tolerant_reverse() {
        let t = BooleanToStringTransformer::default();
        for truthy in ["1", "true", "YES", "on"] {
            assert_eq!(t.reverse_transform(&Value::from(truthy)).unwrap(), Value::Bool(true));
        }
        for falsy in ["0", "False", "no", "off"] {
            assert_eq!(t.reverse_transform(&Value::from(falsy)).unwrap(), Value::Bool(false));
        }
        assert_eq!(t.reverse_transform(&Value::from(1)).unwrap(), Value::Bool(true));
        assert_eq!(t.reverse_transform(&Value::from("")).unwrap(), Value::Null);
        assert!(t.reverse_transform(&Value::from(2)).is_err());
    }

    // ── Choices ──

    #[test]
    fn test_choices_to_values() {
        let t = ChoicesToValuesTransformer::new(["red", "green", "1"]);
        let submitted = Value::List(vec![Value::from("red"), Value::from(1)]);
        assert_eq!(
            t.reverse_transform(&submitted).unwrap(),
            Value::from(vec!["red", "1"])
        );
        let err = t.reverse_transform(&Value::from(vec!["blue"])).unwrap_err();
        assert!(err.message.contains("blue"));
        assert!(t.reverse_transform(&Value::from("red")).is_err());
    }

    // ── Callbacks and chains ──

    #[test]
    fn test_callback_error_is_wrapped() {
        let t = CallbackTransformer::new(
            |v| Ok(v.clone()),
            |_| Err("lookup failed".into()),
        )
        .with_name("lookup");
        let err = t.reverse_transform(&Value::from("x")).unwrap_err();
        assert_eq!(err.message, "lookup failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_callback_panic_is_wrapped() {
        let t = CallbackTransformer::map(|_| panic!("boom"), |v| v.clone());
        let err = t.transform(&Value::from("x")).unwrap_err();
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_callback_skips_null() {
        let t = CallbackTransformer::map(|_| Value::from("never"), |_| Value::from("never"));
        assert_eq!(t.transform(&Value::Null).unwrap(), Value::Null);
    }

    fn upper_then_prefix() -> TransformerChain {
        let mut chain = TransformerChain::new();
        chain.push(
            CallbackTransformer::map(
                |v| Value::from(v.to_view_string().to_uppercase()),
                |v| Value::from(v.to_view_string().to_lowercase()),
            )
            .with_name("case"),
        );
        chain.push(
            CallbackTransformer::map(
                |v| Value::from(format!("PREFIX_{}", v.to_view_string())),
                |v| {
                    let s = v.to_view_string();
                    Value::from(s.strip_prefix("PREFIX_").unwrap_or(&s).to_string())
                },
            )
            .with_name("prefix"),
        );
        chain
    }

    #[test]
    fn test_chain_transform_in_declared_order() {
        let chain = upper_then_prefix();
        assert_eq!(chain.names(), ["case", "prefix"]);
        assert_eq!(
            chain.transform(&Value::from("example")).unwrap(),
            Value::from("PREFIX_EXAMPLE")
        );
    }

    #[test]
    fn test_chain_reverse_in_declared_order() {
        // The case transformer runs first, so the prefix is lowercased before
        // the prefix transformer sees it.
        let chain = upper_then_prefix();
        assert_eq!(
            chain.reverse_transform(&Value::from("PREFIX_EXAMPLE")).unwrap(),
            Value::from("prefix_example")
        );
    }

    #[test]
    fn test_chain_annotates_failing_transformer() {
        let mut chain = TransformerChain::new();
        chain.push(StringToArrayTransformer::new(","));
        chain.push(ChoicesToValuesTransformer::new(["a"]));
        let err = chain.reverse_transform(&Value::from("a,b")).unwrap_err();
        assert_eq!(err.transformer.as_deref(), Some("choices_to_values"));
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = TransformerChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.reverse_transform(&Value::from(3)).unwrap(), Value::Int(3));
    }
}
