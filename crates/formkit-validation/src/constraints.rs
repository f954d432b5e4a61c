//! Built-in constraints.
//!
//! Every constraint other than [`Required`] accepts empty input (null, an
//! empty string, an empty list) without reporting anything, so that a field
//! can carry format rules and still be optional.
//!
//! Rule-string names map onto these types as follows:
//!
//! | Rule | Constraint |
//! |---|---|
//! | `required` | [`Required`] |
//! | `nullable` | [`Nullable`] |
//! | `string`, `integer`, `numeric`, `boolean`, `array` | [`TypeCheck`] |
//! | `min`, `max`, `between`, `size` | [`Size`] |
//! | `regex` | [`Pattern`] |
//! | `in`, `not_in` | [`Choice`] |
//! | `email`, `url`, `ip`, `ipv4`, `ipv6`, `alpha`, `alpha_num`, `alpha_dash`, `uuid`, `json` | [`Format`] |
//! | `digits`, `digits_between` | [`Digits`] |
//! | `date` | [`Date`] |
//! | `date_format` | [`DateFormat`] |
//! | `after`, `before`, `after_or_equal`, `before_or_equal` | [`DateCompare`] |
//! | `confirmed`, `same`, `different` | [`FieldMatch`] |

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use formkit_core::utils::dates::{parse_lenient, to_strftime};
use formkit_core::Value;

use crate::constraint::Constraint;
use crate::context::ExecutionContext;
use crate::messages;

// ============================================================
// Helpers
// ============================================================

/// Returns the textual form of a scalar value, or `None` for compound values.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(value.to_view_string()),
        _ => None,
    }
}

/// Converts a value to a number when it is numeric or a numeric string.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Converts a date-like value to a naive local date-time.
fn as_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        Value::DateTime(dt) => Some(dt.naive_local()),
        Value::String(s) => parse_lenient(s),
        _ => None,
    }
}

/// Formats a bound without a trailing `.0` for whole numbers.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ============================================================
// Presence
// ============================================================

/// The value must be present: not null, not a blank string, not an empty
/// list or map.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl Constraint for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        let missing = match value {
            Value::String(s) => s.trim().is_empty(),
            other => other.is_empty(),
        };
        if missing {
            context.build_violation(messages::REQUIRED).add_violation();
        }
    }
}

/// Marks a field whose empty value skips all of its other rules.
///
/// The constraint itself never reports anything; field rule sets check for
/// it before running.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nullable;

impl Constraint for Nullable {
    fn name(&self) -> &str {
        "nullable"
    }

    fn validate(&self, _value: &Value, _context: &mut ExecutionContext<'_>) {}
}

// ============================================================
// Types
// ============================================================

/// The structural kinds checked by [`TypeCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A string.
    String,
    /// An integer, or a string holding one.
    Integer,
    /// A number, or a string holding one.
    Numeric,
    /// A boolean, `0`/`1`, or `"true"`/`"false"`/`"0"`/`"1"`.
    Boolean,
    /// A list.
    Array,
}

impl TypeKind {
    const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    const fn template(self) -> &'static str {
        match self {
            Self::String => messages::STRING,
            Self::Integer => messages::INTEGER,
            Self::Numeric => messages::NUMERIC,
            Self::Boolean => messages::BOOLEAN,
            Self::Array => messages::ARRAY,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => matches!(value, Value::String(_)),
            Self::Integer => match value {
                Value::Int(_) => true,
                Value::Float(f) => f.fract() == 0.0,
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            Self::Numeric => as_number(value).is_some(),
            Self::Boolean => match value {
                Value::Bool(_) => true,
                Value::Int(i) => *i == 0 || *i == 1,
                Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
                _ => false,
            },
            Self::Array => matches!(value, Value::List(_)),
        }
    }
}

/// The value must have the given structural type.
#[derive(Debug, Clone, Copy)]
pub struct TypeCheck {
    kind: TypeKind,
}

impl TypeCheck {
    /// Creates a type check for `kind`.
    pub const fn new(kind: TypeKind) -> Self {
        Self { kind }
    }
}

impl Constraint for TypeCheck {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() || self.kind.accepts(value) {
            return;
        }
        context
            .build_violation(self.kind.template())
            .set_invalid_value(value.clone())
            .add_violation();
    }
}

// ============================================================
// Size
// ============================================================

/// The bound checked by a [`Size`] constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeBound {
    /// At least `n`.
    Min(f64),
    /// At most `n`.
    Max(f64),
    /// Between `min` and `max`, inclusive.
    Between(f64, f64),
    /// Exactly `n`.
    Exactly(f64),
}

enum Measure {
    Number(f64),
    Length(usize),
    Items(usize),
}

impl Measure {
    #[allow(clippy::cast_precision_loss)]
    fn amount(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Length(n) | Self::Items(n) => *n as f64,
        }
    }
}

/// Compares the size of a value against a bound.
///
/// The size of a number is its value, the size of a string its character
/// count, and the size of a list its length. A string is measured as a
/// number when the constraint is `numeric` (its field also carries an
/// `integer` or `numeric` rule).
#[derive(Debug, Clone, Copy)]
pub struct Size {
    bound: SizeBound,
    numeric: bool,
}

impl Size {
    /// Creates a size constraint.
    pub const fn new(bound: SizeBound) -> Self {
        Self {
            bound,
            numeric: false,
        }
    }

    /// Measures strings as numbers.
    #[must_use]
    pub const fn numeric(mut self, numeric: bool) -> Self {
        self.numeric = numeric;
        self
    }

    fn measure(&self, value: &Value) -> Option<Measure> {
        match value {
            Value::Int(_) | Value::Float(_) => as_number(value).map(Measure::Number),
            Value::String(s) if self.numeric => as_number(value)
                .map(Measure::Number)
                .or(Some(Measure::Length(s.chars().count()))),
            Value::String(s) => Some(Measure::Length(s.chars().count())),
            Value::List(items) => Some(Measure::Items(items.len())),
            Value::Map(m) => Some(Measure::Items(m.len())),
            _ => None,
        }
    }
}

impl Constraint for Size {
    fn name(&self) -> &str {
        match self.bound {
            SizeBound::Min(_) => "min",
            SizeBound::Max(_) => "max",
            SizeBound::Between(..) => "between",
            SizeBound::Exactly(_) => "size",
        }
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let Some(measure) = self.measure(value) else {
            return;
        };
        let amount = measure.amount();

        let (ok, templates) = match self.bound {
            SizeBound::Min(min) => (
                amount >= min,
                [messages::MIN_NUMERIC, messages::MIN_STRING, messages::MIN_ARRAY],
            ),
            SizeBound::Max(max) => (
                amount <= max,
                [messages::MAX_NUMERIC, messages::MAX_STRING, messages::MAX_ARRAY],
            ),
            SizeBound::Between(min, max) => (
                amount >= min && amount <= max,
                [
                    messages::BETWEEN_NUMERIC,
                    messages::BETWEEN_STRING,
                    messages::BETWEEN_ARRAY,
                ],
            ),
            SizeBound::Exactly(size) => (
                (amount - size).abs() < f64::EPSILON,
                [messages::SIZE_NUMERIC, messages::SIZE_STRING, messages::SIZE_ARRAY],
            ),
        };
        if ok {
            return;
        }

        let template = match measure {
            Measure::Number(_) => templates[0],
            Measure::Length(_) => templates[1],
            Measure::Items(_) => templates[2],
        };
        let builder = context
            .build_violation(template)
            .set_invalid_value(value.clone());
        let builder = match self.bound {
            SizeBound::Min(min) => builder.set_parameter("min", format_number(min)),
            SizeBound::Max(max) => builder.set_parameter("max", format_number(max)),
            SizeBound::Between(min, max) => builder
                .set_parameter("min", format_number(min))
                .set_parameter("max", format_number(max)),
            SizeBound::Exactly(size) => builder.set_parameter("size", format_number(size)),
        };
        builder.add_violation();
    }
}

// ============================================================
// Pattern and membership
// ============================================================

/// The value's text must match a regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    message: Option<String>,
}

impl Pattern {
    /// Creates a pattern constraint from a compiled regex.
    pub const fn new(regex: Regex) -> Self {
        Self {
            regex,
            message: None,
        }
    }

    /// Uses `message` instead of the default template.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Constraint for Pattern {
    fn name(&self) -> &str {
        "regex"
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let matched = scalar_text(value).is_some_and(|text| self.regex.is_match(&text));
        if !matched {
            let template = self.message.as_deref().unwrap_or(messages::REGEX);
            context
                .build_violation(template)
                .set_parameter("pattern", self.regex.as_str())
                .set_invalid_value(value.clone())
                .add_violation();
        }
    }
}

/// The value must (or must not) be one of an enumerated set.
///
/// Scalars are compared by their view string, so `in:1,2` accepts both
/// `1` and `"1"`. Every element of a list must satisfy the check.
#[derive(Debug, Clone)]
pub struct Choice {
    values: Vec<String>,
    negate: bool,
}

impl Choice {
    /// The value must be one of `values`.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            negate: false,
        }
    }

    /// The value must not be any of `values`.
    pub fn none_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            negate: true,
            ..Self::one_of(values)
        }
    }

    /// Returns the enumerated values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn allows(&self, item: &Value) -> bool {
        let found = scalar_text(item).is_some_and(|text| self.values.contains(&text));
        found != self.negate
    }
}

impl Constraint for Choice {
    fn name(&self) -> &str {
        if self.negate {
            "not_in"
        } else {
            "in"
        }
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let ok = match value {
            Value::List(items) => items.iter().all(|item| self.allows(item)),
            other => self.allows(other),
        };
        if !ok {
            let template = if self.negate {
                messages::NOT_IN
            } else {
                messages::IN
            };
            context
                .build_violation(template)
                .set_parameter("choices", self.values.join(", "))
                .set_invalid_value(value.clone())
                .add_violation();
        }
    }
}

// ============================================================
// Formats
// ============================================================

/// Text formats checked by the [`Format`] constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// An email address.
    Email,
    /// An absolute URL with a host.
    Url,
    /// An IPv4 or IPv6 address.
    Ip,
    /// An IPv4 address.
    Ipv4,
    /// An IPv6 address.
    Ipv6,
    /// Letters only.
    Alpha,
    /// Letters and digits.
    AlphaNum,
    /// Letters, digits, dashes and underscores.
    AlphaDash,
    /// A UUID in any standard textual form.
    Uuid,
    /// A JSON document.
    Json,
}

impl FormatKind {
    /// Returns the rule name of this format.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Ip => "ip",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Alpha => "alpha",
            Self::AlphaNum => "alpha_num",
            Self::AlphaDash => "alpha_dash",
            Self::Uuid => "uuid",
            Self::Json => "json",
        }
    }

    const fn template(self) -> &'static str {
        match self {
            Self::Email => messages::EMAIL,
            Self::Url => messages::URL,
            Self::Ip => messages::IP,
            Self::Ipv4 => messages::IPV4,
            Self::Ipv6 => messages::IPV6,
            Self::Alpha => messages::ALPHA,
            Self::AlphaNum => messages::ALPHA_NUM,
            Self::AlphaDash => messages::ALPHA_DASH,
            Self::Uuid => messages::UUID,
            Self::Json => messages::JSON,
        }
    }

    /// Returns `true` if `text` is in this format.
    pub fn matches(self, text: &str) -> bool {
        match self {
            Self::Email => email_regex().is_match(text),
            Self::Url => url::Url::parse(text).is_ok_and(|u| u.has_host()),
            Self::Ip => text.parse::<IpAddr>().is_ok(),
            Self::Ipv4 => text.parse::<Ipv4Addr>().is_ok(),
            Self::Ipv6 => text.parse::<Ipv6Addr>().is_ok(),
            Self::Alpha => text.chars().all(char::is_alphabetic),
            Self::AlphaNum => text.chars().all(char::is_alphanumeric),
            Self::AlphaDash => text
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_'),
            Self::Uuid => uuid::Uuid::parse_str(text).is_ok(),
            Self::Json => serde_json::from_str::<serde_json::Value>(text).is_ok(),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
    })
}

/// The value's text must be in a given format.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    kind: FormatKind,
}

impl Format {
    /// Creates a format constraint.
    pub const fn new(kind: FormatKind) -> Self {
        Self { kind }
    }
}

impl Constraint for Format {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let ok = scalar_text(value).is_some_and(|text| self.kind.matches(&text));
        if !ok {
            context
                .build_violation(self.kind.template())
                .set_invalid_value(value.clone())
                .add_violation();
        }
    }
}

/// The value must consist of ASCII digits, with a digit count in range.
#[derive(Debug, Clone, Copy)]
pub struct Digits {
    min: usize,
    max: usize,
}

impl Digits {
    /// Exactly `n` digits.
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    /// Between `min` and `max` digits, inclusive.
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Constraint for Digits {
    fn name(&self) -> &str {
        if self.min == self.max {
            "digits"
        } else {
            "digits_between"
        }
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let ok = scalar_text(value).is_some_and(|text| {
            text.chars().all(|c| c.is_ascii_digit())
                && (self.min..=self.max).contains(&text.len())
        });
        if ok {
            return;
        }
        let builder = if self.min == self.max {
            context
                .build_violation(messages::DIGITS)
                .set_parameter("digits", self.min)
        } else {
            context
                .build_violation(messages::DIGITS_BETWEEN)
                .set_parameter("min", self.min)
                .set_parameter("max", self.max)
        };
        builder.set_invalid_value(value.clone()).add_violation();
    }
}

// ============================================================
// Dates
// ============================================================

/// The value must be a date, a date-time, or a string parsable as one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Date;

impl Constraint for Date {
    fn name(&self) -> &str {
        "date"
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() || as_datetime(value).is_some() {
            return;
        }
        context
            .build_violation(messages::DATE)
            .set_invalid_value(value.clone())
            .add_violation();
    }
}

/// The value must be a string in a given date format.
///
/// The format may use single-letter tokens (`d/m/Y`) or `strftime` specifiers.
#[derive(Debug, Clone)]
pub struct DateFormat {
    format: String,
    strftime: String,
}

impl DateFormat {
    /// Creates a date-format constraint.
    pub fn new(format: impl Into<String>) -> Self {
        let format = format.into();
        let strftime = to_strftime(&format);
        Self { format, strftime }
    }

    fn parses(&self, text: &str) -> bool {
        let f = self.strftime.as_str();
        NaiveDateTime::parse_from_str(text, f).is_ok()
            || NaiveDate::parse_from_str(text, f).is_ok()
            || NaiveTime::parse_from_str(text, f).is_ok()
            || DateTime::parse_from_str(text, f).is_ok()
    }
}

impl Constraint for DateFormat {
    fn name(&self) -> &str {
        "date_format"
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let ok = match value {
            Value::String(s) => self.parses(s),
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) => true,
            _ => false,
        };
        if !ok {
            context
                .build_violation(messages::DATE_FORMAT)
                .set_parameter("format", &self.format)
                .set_invalid_value(value.clone())
                .add_violation();
        }
    }
}

/// How a [`DateCompare`] constraint compares against its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// Strictly after.
    After,
    /// After or equal.
    AfterOrEqual,
    /// Strictly before.
    Before,
    /// Before or equal.
    BeforeOrEqual,
}

/// The value must be a date after or before a reference.
///
/// The reference is `now`, `today`, `tomorrow`, `yesterday`, a date string,
/// or the path of another field in the data bag. Relative references are
/// taken from the context's clock. When the reference cannot be resolved
/// (e.g. the other field is missing) nothing is reported.
#[derive(Debug, Clone)]
pub struct DateCompare {
    order: DateOrder,
    reference: String,
}

impl DateCompare {
    /// Creates a date comparison.
    pub fn new(order: DateOrder, reference: impl Into<String>) -> Self {
        Self {
            order,
            reference: reference.into(),
        }
    }

    fn resolve(&self, context: &ExecutionContext<'_>) -> Option<NaiveDateTime> {
        let now = context.now().naive_local();
        let today = now.date().and_time(NaiveTime::MIN);
        match self.reference.as_str() {
            "now" => Some(now),
            "today" => Some(today),
            "tomorrow" => today.checked_add_days(Days::new(1)),
            "yesterday" => today.checked_sub_days(Days::new(1)),
            other => {
                parse_lenient(other).or_else(|| context.value_at(other).and_then(as_datetime))
            }
        }
    }
}

impl Constraint for DateCompare {
    fn name(&self) -> &str {
        match self.order {
            DateOrder::After => "after",
            DateOrder::AfterOrEqual => "after_or_equal",
            DateOrder::Before => "before",
            DateOrder::BeforeOrEqual => "before_or_equal",
        }
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let Some(reference) = self.resolve(context) else {
            return;
        };
        let ok = as_datetime(value).is_some_and(|date| match self.order {
            DateOrder::After => date > reference,
            DateOrder::AfterOrEqual => date >= reference,
            DateOrder::Before => date < reference,
            DateOrder::BeforeOrEqual => date <= reference,
        });
        if ok {
            return;
        }
        let template = match self.order {
            DateOrder::After => messages::AFTER,
            DateOrder::AfterOrEqual => messages::AFTER_OR_EQUAL,
            DateOrder::Before => messages::BEFORE,
            DateOrder::BeforeOrEqual => messages::BEFORE_OR_EQUAL,
        };
        context
            .build_violation(template)
            .set_parameter("date", &self.reference)
            .set_invalid_value(value.clone())
            .add_violation();
    }
}

// ============================================================
// Cross-field
// ============================================================

/// How a [`FieldMatch`] constraint relates two fields.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchMode {
    Confirmed,
    Same(String),
    Different(String),
}

/// Compares the value against another field in the data bag.
#[derive(Debug, Clone)]
pub struct FieldMatch {
    mode: MatchMode,
}

impl FieldMatch {
    /// The field `<name>_confirmation` must hold the same value.
    pub const fn confirmed() -> Self {
        Self {
            mode: MatchMode::Confirmed,
        }
    }

    /// The field at `other` must hold the same value.
    pub fn same(other: impl Into<String>) -> Self {
        Self {
            mode: MatchMode::Same(other.into()),
        }
    }

    /// The field at `other` must hold a different value.
    pub fn different(other: impl Into<String>) -> Self {
        Self {
            mode: MatchMode::Different(other.into()),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b || (a.is_scalar() && b.is_scalar() && a.to_view_string() == b.to_view_string())
}

impl Constraint for FieldMatch {
    fn name(&self) -> &str {
        match self.mode {
            MatchMode::Confirmed => "confirmed",
            MatchMode::Same(_) => "same",
            MatchMode::Different(_) => "different",
        }
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        if value.is_empty() {
            return;
        }
        let other_path = match &self.mode {
            MatchMode::Confirmed => format!("{}_confirmation", context.path()),
            MatchMode::Same(other) | MatchMode::Different(other) => other.clone(),
        };
        let equal = context
            .value_at(&other_path)
            .is_some_and(|other| values_equal(value, other));

        let (ok, template) = match self.mode {
            MatchMode::Confirmed => (equal, messages::CONFIRMED),
            MatchMode::Same(_) => (equal, messages::SAME),
            MatchMode::Different(_) => (!equal, messages::DIFFERENT),
        };
        if !ok {
            let other_name = context.display_name(&other_path);
            context
                .build_violation(template)
                .set_parameter("other", other_name)
                .add_violation();
        }
    }
}

/// The signature of a [`Callback`] constraint's function.
pub type CallbackFn = dyn Fn(&Value, &mut ExecutionContext<'_>) + Send + Sync;

/// Arbitrary validation logic.
///
/// The function receives the field's value and the context, through which it
/// can read the whole data bag and report violations at any path. Registered
/// at the form level it receives the whole data bag as its value.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_validation::constraints::Callback;
/// use formkit_validation::{Constraint, ExecutionContext};
///
/// let shipping = Callback::new("shipping_address", |data, ctx| {
///     let ships = data.get("ship").and_then(Value::as_bool).unwrap_or(false);
///     if ships && data.get("address").map_or(true, Value::is_empty) {
///         ctx.build_violation("An address is required for shipping.")
///             .at_path("address")
///             .add_violation();
///     }
/// });
///
/// let data = Value::map([("ship", true)]);
/// let mut ctx = ExecutionContext::new(&data);
/// shipping.validate(&data, &mut ctx);
/// assert_eq!(ctx.violations()[0].path, "address");
/// ```
#[derive(Clone)]
pub struct Callback {
    name: String,
    func: Arc<CallbackFn>,
}

impl Callback {
    /// Creates a callback constraint.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &mut ExecutionContext<'_>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Constraint for Callback {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        (self.func)(value, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Violation;
    use chrono::{FixedOffset, TimeZone};

    fn run(constraint: &dyn Constraint, value: Value) -> Vec<Violation> {
        run_with(constraint, value, &Value::Null)
    }

    fn run_with(constraint: &dyn Constraint, value: Value, data: &Value) -> Vec<Violation> {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .unwrap();
        let mut ctx = ExecutionContext::new(data).with_now(now);
        ctx.set_path("field_name");
        ctx.enter_rule(constraint.name(), crate::Severity::Error);
        constraint.validate(&value, &mut ctx);
        ctx.into_violations()
    }

    fn messages_of(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.message.as_str()).collect()
    }

    #[test]
    fn test_required() {
        assert_eq!(
            messages_of(&run(&Required, Value::Null)),
            ["The field name field is required."]
        );
        assert_eq!(run(&Required, Value::from("   ")).len(), 1);
        assert_eq!(run(&Required, Value::List(vec![])).len(), 1);
        assert!(run(&Required, Value::from(0)).is_empty());
        assert!(run(&Required, Value::from(false)).is_empty());
    }

    #[test]
    fn test_optional_rules_skip_empty() {
        let constraints: Vec<Box<dyn Constraint>> = vec![
            Box::new(TypeCheck::new(TypeKind::Integer)),
            Box::new(Size::new(SizeBound::Min(3.0))),
            Box::new(Format::new(FormatKind::Email)),
            Box::new(Choice::one_of(["a"])),
            Box::new(Digits::exactly(4)),
            Box::new(Date),
            Box::new(DateCompare::new(DateOrder::After, "today")),
            Box::new(FieldMatch::confirmed()),
        ];
        for c in &constraints {
            assert!(run(c.as_ref(), Value::Null).is_empty(), "{}", c.name());
            assert!(run(c.as_ref(), Value::from("")).is_empty(), "{}", c.name());
        }
    }

    #[test]
    fn test_type_checks() {
        let integer = TypeCheck::new(TypeKind::Integer);
        assert!(run(&integer, Value::from(5)).is_empty());
        assert!(run(&integer, Value::from("42")).is_empty());
        assert!(run(&integer, Value::from(3.0)).is_empty());
        assert_eq!(
            messages_of(&run(&integer, Value::from("4.5"))),
            ["The field name must be an integer."]
        );

        let numeric = TypeCheck::new(TypeKind::Numeric);
        assert!(run(&numeric, Value::from("4.5")).is_empty());
        assert_eq!(run(&numeric, Value::from("abc")).len(), 1);

        let boolean = TypeCheck::new(TypeKind::Boolean);
        assert!(run(&boolean, Value::from("1")).is_empty());
        assert!(run(&boolean, Value::from(false)).is_empty());
        assert_eq!(run(&boolean, Value::from("yes")).len(), 1);

        let array = TypeCheck::new(TypeKind::Array);
        assert!(run(&array, Value::from(vec!["a"])).is_empty());
        assert_eq!(run(&array, Value::from("a")).len(), 1);

        let string = TypeCheck::new(TypeKind::String);
        assert_eq!(run(&string, Value::from(1)).len(), 1);
    }

    #[test]
    fn test_size_string_length() {
        let min = Size::new(SizeBound::Min(8.0));
        assert!(run(&min, Value::from("longenough")).is_empty());
        assert_eq!(
            messages_of(&run(&min, Value::from("short"))),
            ["The field name must be at least 8 characters."]
        );
        // Characters, not bytes.
        let max = Size::new(SizeBound::Max(3.0));
        assert!(run(&max, Value::from("äöü")).is_empty());
    }

    #[test]
    fn test_size_numeric() {
        let between = Size::new(SizeBound::Between(18.0, 100.0));
        assert!(run(&between, Value::from(18)).is_empty());
        assert_eq!(
            messages_of(&run(&between, Value::from(15))),
            ["The field name must be between 18 and 100."]
        );
        // A numeric string is measured by length unless the field is numeric.
        assert_eq!(
            messages_of(&run(&between, Value::from("15"))),
            ["The field name must be between 18 and 100 characters."]
        );
        let numeric = between.numeric(true);
        assert_eq!(
            messages_of(&run(&numeric, Value::from("15"))),
            ["The field name must be between 18 and 100."]
        );
        assert!(run(&numeric, Value::from("50")).is_empty());
    }

    #[test]
    fn test_size_list_and_exact() {
        let max = Size::new(SizeBound::Max(2.0));
        assert_eq!(
            messages_of(&run(&max, Value::from(vec!["a", "b", "c"]))),
            ["The field name may not have more than 2 items."]
        );
        let size = Size::new(SizeBound::Exactly(2.5));
        assert_eq!(
            messages_of(&run(&size, Value::from(2))),
            ["The field name must be 2.5."]
        );
        assert!(run(&size, Value::from(2.5)).is_empty());
    }

    #[test]
    fn test_pattern() {
        let pattern = Pattern::new(Regex::new(r"^[A-Z]{3}$").unwrap());
        assert!(run(&pattern, Value::from("ABC")).is_empty());
        assert_eq!(
            messages_of(&run(&pattern, Value::from("abc"))),
            ["The field name format is invalid."]
        );
        let custom = pattern.with_message("Use three capitals for {{ field }}.");
        assert_eq!(
            messages_of(&run(&custom, Value::from("x"))),
            ["Use three capitals for field name."]
        );
    }

    #[test]
    fn test_choice() {
        let role = Choice::one_of(["user", "admin"]);
        assert!(run(&role, Value::from("admin")).is_empty());
        assert_eq!(
            messages_of(&run(&role, Value::from("superadmin"))),
            ["The selected field name is invalid."]
        );
        assert!(run(&role, Value::from(vec!["user", "admin"])).is_empty());
        assert_eq!(run(&role, Value::from(vec!["user", "root"])).len(), 1);

        let numbers = Choice::one_of(["1", "2"]);
        assert!(run(&numbers, Value::from(2)).is_empty());

        let banned = Choice::none_of(["root"]);
        assert_eq!(banned.name(), "not_in");
        assert_eq!(run(&banned, Value::from("root")).len(), 1);
        assert!(run(&banned, Value::from("ann")).is_empty());
    }

    #[test]
    fn test_formats() {
        assert!(FormatKind::Email.matches("ann@example.com"));
        assert!(!FormatKind::Email.matches("ann@"));
        assert!(FormatKind::Url.matches("https://example.com/a?b=c"));
        assert!(!FormatKind::Url.matches("example.com"));
        assert!(FormatKind::Ip.matches("::1"));
        assert!(FormatKind::Ipv4.matches("192.168.0.1"));
        assert!(!FormatKind::Ipv4.matches("::1"));
        assert!(FormatKind::Ipv6.matches("fe80::1"));
        assert!(FormatKind::Alpha.matches("Zoë"));
        assert!(!FormatKind::Alpha.matches("abc1"));
        assert!(FormatKind::AlphaNum.matches("abc123"));
        assert!(!FormatKind::AlphaNum.matches("john_doe"));
        assert!(FormatKind::AlphaDash.matches("john_doe-2"));
        assert!(FormatKind::Uuid.matches("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(FormatKind::Json.matches(r#"{"a": [1, 2]}"#));
        assert!(!FormatKind::Json.matches("{a:"));
    }

    #[test]
    fn test_format_constraint_rejects_lists() {
        let email = Format::new(FormatKind::Email);
        assert_eq!(
            messages_of(&run(&email, Value::from(vec!["ann@example.com"]))),
            ["The field name must be a valid email address."]
        );
        let alpha_num = Format::new(FormatKind::AlphaNum);
        assert!(run(&alpha_num, Value::from(123)).is_empty());
    }

    #[test]
    fn test_digits() {
        let pin = Digits::exactly(4);
        assert!(run(&pin, Value::from("0042")).is_empty());
        assert_eq!(
            messages_of(&run(&pin, Value::from("42"))),
            ["The field name must be 4 digits."]
        );
        let range = Digits::between(2, 3);
        assert_eq!(range.name(), "digits_between");
        assert!(run(&range, Value::from(123)).is_empty());
        assert_eq!(
            messages_of(&run(&range, Value::from("12a"))),
            ["The field name must be between 2 and 3 digits."]
        );
    }

    #[test]
    fn test_date_and_format() {
        assert!(run(&Date, Value::from("2024-02-29")).is_empty());
        assert_eq!(run(&Date, Value::from("2023-02-29")).len(), 1);

        let format = DateFormat::new("d/m/Y");
        assert!(run(&format, Value::from("15/05/1990")).is_empty());
        assert_eq!(
            messages_of(&run(&format, Value::from("1990-05-15"))),
            ["The field name does not match the format d/m/Y."]
        );
        let time = DateFormat::new("H:i");
        assert!(run(&time, Value::from("13:45")).is_empty());
    }

    #[test]
    fn test_date_compare_relative() {
        // The clock is fixed at 2024-06-15 12:00.
        let after_today = DateCompare::new(DateOrder::After, "today");
        assert!(run(&after_today, Value::from("2024-06-16")).is_empty());
        assert_eq!(
            messages_of(&run(&after_today, Value::from("2024-06-15"))),
            ["The field name must be a date after today."]
        );

        let after_or_equal = DateCompare::new(DateOrder::AfterOrEqual, "today");
        assert!(run(&after_or_equal, Value::from("2024-06-15")).is_empty());

        let before_tomorrow = DateCompare::new(DateOrder::Before, "tomorrow");
        assert!(run(&before_tomorrow, Value::from("2024-06-15 23:59")).is_empty());

        let before_now = DateCompare::new(DateOrder::BeforeOrEqual, "now");
        assert_eq!(run(&before_now, Value::from("2024-06-15 12:00:01")).len(), 1);

        let after_yesterday = DateCompare::new(DateOrder::After, "yesterday");
        assert!(run(&after_yesterday, Value::from("2024-06-14 00:00:01")).is_empty());
    }

    #[test]
    fn test_date_compare_absolute_and_field() {
        let before = DateCompare::new(DateOrder::Before, "2000-01-01");
        assert!(run(&before, Value::from("1999-12-31")).is_empty());
        assert_eq!(run(&before, Value::from("not a date")).len(), 1);

        let data = Value::map([("start", "2024-01-10")]);
        let after_start = DateCompare::new(DateOrder::After, "start");
        assert!(run_with(&after_start, Value::from("2024-01-11"), &data).is_empty());
        assert_eq!(run_with(&after_start, Value::from("2024-01-09"), &data).len(), 1);
        // Unresolvable reference: nothing to compare against.
        assert!(run(&after_start, Value::from("2024-01-09")).is_empty());
    }

    #[test]
    fn test_confirmed() {
        let data = Value::map([("field_name_confirmation", "secret123")]);
        assert!(run_with(&FieldMatch::confirmed(), Value::from("secret123"), &data).is_empty());
        assert_eq!(
            messages_of(&run_with(&FieldMatch::confirmed(), Value::from("other"), &data)),
            ["The field name confirmation does not match."]
        );
    }

    #[test]
    fn test_same_and_different() {
        let data = Value::map([("email", "a@b.co"), ("pin", "1234")]);
        assert!(run_with(&FieldMatch::same("email"), Value::from("a@b.co"), &data).is_empty());
        assert_eq!(
            messages_of(&run_with(&FieldMatch::same("email"), Value::from("x"), &data)),
            ["The field name and email must match."]
        );
        // Scalars compare by view string.
        assert_eq!(
            run_with(&FieldMatch::different("pin"), Value::from(1234), &data).len(),
            1
        );
    }

    #[test]
    fn test_callback_reports_elsewhere() {
        let check = Callback::new("terms", |value, ctx| {
            if value.as_bool() != Some(true) {
                ctx.build_violation("You must accept the terms.")
                    .at_path("terms")
                    .add_violation();
            }
        });
        let violations = run(&check, Value::from(false));
        assert_eq!(violations[0].path, "terms");
        assert_eq!(violations[0].code.as_deref(), Some("terms"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-18.0), "-18");
    }
}
