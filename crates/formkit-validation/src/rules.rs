//! Rule-string parsing.
//!
//! A field's rules can be written compactly as `"required|email|max:255"`.
//! Each `|`-separated segment is a rule name, optionally followed by `:` and
//! comma-separated arguments. Parsing happens when the rules are attached to
//! a validator, so an unknown rule name or malformed argument is reported at
//! configuration time and never during submission.
//!
//! Regular expressions may themselves contain `|`; pass such rules as a list
//! (`vec!["required", "regex:/^(cat|dog)$/"]`) instead of a single string.
//!
//! # Examples
//!
//! ```
//! use formkit_validation::FieldRules;
//!
//! let rules = FieldRules::parse("required|alpha_num|between:3,20").unwrap();
//! assert_eq!(rules.names(), ["required", "alpha_num", "between"]);
//! assert!(rules.is_required());
//!
//! assert!(FieldRules::parse("required|shiny").is_err());
//! ```

use regex::Regex;

use formkit_core::{FormkitError, FormkitResult, Value};

use crate::constraint::Rule;
use crate::constraints::{
    Choice, Date, DateCompare, DateFormat, DateOrder, Digits, FieldMatch, Format, FormatKind,
    Nullable, Pattern, Required, Size, SizeBound, TypeCheck, TypeKind,
};
use crate::context::ExecutionContext;

/// The ordered rules attached to one field.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: Vec<Rule>,
}

impl FieldRules {
    /// Creates an empty rule set.
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Parses a `|`-separated rule string.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::UnknownRule`] for an unknown rule name and
    /// [`FormkitError::InvalidRule`] for malformed arguments.
    pub fn parse(spec: &str) -> FormkitResult<Self> {
        Self::from_list(spec.split('|'))
    }

    /// Parses a list of rule strings, one rule per entry.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`parse`](Self::parse).
    pub fn from_list<I, S>(rules: I) -> FormkitResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<S> = rules.into_iter().collect();
        let numeric = segments.iter().any(|segment| {
            matches!(split_rule(segment.as_ref()).0, "integer" | "numeric")
        });

        let mut parsed = Self::new();
        for segment in &segments {
            let segment = segment.as_ref().trim();
            if segment.is_empty() {
                continue;
            }
            parsed.rules.push(parse_rule(segment, numeric)?);
        }
        Ok(parsed)
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Appends all rules of `other`.
    pub fn extend(&mut self, other: Self) {
        self.rules.extend(other.rules);
    }

    /// Returns the rules in declared order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the rule names in declared order.
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Returns `true` if a rule with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name() == name)
    }

    /// Returns `true` if the field carries the `required` rule.
    pub fn is_required(&self) -> bool {
        self.contains("required")
    }

    /// Returns `true` if the field carries the `nullable` rule.
    pub fn is_nullable(&self) -> bool {
        self.contains("nullable")
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule in declared order against `value`.
    ///
    /// A failing `required` rule does not stop later rules; those skip empty
    /// input on their own. A `nullable` field with an empty value skips all
    /// rules. When `groups` is given, only rules in one of those groups run.
    pub fn validate(
        &self,
        value: &Value,
        context: &mut ExecutionContext<'_>,
        groups: Option<&[&str]>,
    ) {
        if self.is_nullable() && value.is_empty() {
            return;
        }
        for rule in &self.rules {
            if groups.map_or(true, |groups| rule.applies_to(groups)) {
                rule.check(value, context);
            }
        }
    }
}

impl From<Vec<Rule>> for FieldRules {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

/// Anything that can be turned into a [`FieldRules`]: a rule string, a list
/// of rule strings, a list of [`Rule`]s, or a ready rule set.
pub trait IntoFieldRules {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule string cannot be parsed.
    fn into_field_rules(self) -> FormkitResult<FieldRules>;
}

impl IntoFieldRules for FieldRules {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        Ok(self)
    }
}

impl IntoFieldRules for &str {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        FieldRules::parse(self)
    }
}

impl IntoFieldRules for String {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        FieldRules::parse(&self)
    }
}

impl IntoFieldRules for &String {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        FieldRules::parse(self)
    }
}

impl IntoFieldRules for Vec<&str> {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        FieldRules::from_list(self)
    }
}

impl IntoFieldRules for Vec<String> {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        FieldRules::from_list(self)
    }
}

impl IntoFieldRules for Vec<Rule> {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        Ok(FieldRules::from(self))
    }
}

impl IntoFieldRules for Rule {
    fn into_field_rules(self) -> FormkitResult<FieldRules> {
        Ok(FieldRules::from(vec![self]))
    }
}

// ============================================================
// Parsing
// ============================================================

/// Splits `"name:args"` into the name and the raw argument string.
fn split_rule(segment: &str) -> (&str, Option<&str>) {
    match segment.trim().split_once(':') {
        Some((name, args)) => (name.trim(), Some(args)),
        None => (segment.trim(), None),
    }
}

fn invalid(rule: &str, message: impl Into<String>) -> FormkitError {
    FormkitError::InvalidRule {
        rule: rule.to_string(),
        message: message.into(),
    }
}

fn list_args(rule: &str, args: Option<&str>) -> FormkitResult<Vec<String>> {
    let args = args.ok_or_else(|| invalid(rule, "expected at least one argument"))?;
    let values: Vec<String> = args
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if values.is_empty() {
        return Err(invalid(rule, "expected at least one argument"));
    }
    Ok(values)
}

fn single_arg<'a>(rule: &str, args: Option<&'a str>) -> FormkitResult<&'a str> {
    args.map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| invalid(rule, "expected one argument"))
}

fn number_arg(rule: &str, arg: &str) -> FormkitResult<f64> {
    arg.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid(rule, format!("\"{arg}\" is not a number")))
}

fn count_arg(rule: &str, arg: &str) -> FormkitResult<usize> {
    arg.trim()
        .parse::<usize>()
        .map_err(|_| invalid(rule, format!("\"{arg}\" is not a non-negative integer")))
}

fn two_args(rule: &str, args: Option<&str>) -> FormkitResult<(String, String)> {
    let mut values = list_args(rule, args)?;
    if values.len() != 2 {
        return Err(invalid(rule, "expected exactly two arguments"));
    }
    let max = values.pop().unwrap_or_default();
    let min = values.pop().unwrap_or_default();
    Ok((min, max))
}

/// Compiles a `regex:` argument. `/pattern/flags` delimiters are optional;
/// the `i`, `m`, `s` and `x` flags are honoured.
fn compile_pattern(rule: &str, raw: &str) -> FormkitResult<Regex> {
    let raw = raw.trim();
    let pattern = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, flags)) if flags.chars().all(|f| "imsx".contains(f)) => {
            if flags.is_empty() {
                body.to_string()
            } else {
                format!("(?{flags}){body}")
            }
        }
        _ => raw.to_string(),
    };
    Regex::new(&pattern).map_err(|e| invalid(rule, format!("invalid pattern: {e}")))
}

fn parse_rule(segment: &str, numeric: bool) -> FormkitResult<Rule> {
    let (name, args) = split_rule(segment);
    let rule = match name {
        "required" => Rule::new(Required),
        "nullable" => Rule::new(Nullable),

        "string" => Rule::new(TypeCheck::new(TypeKind::String)),
        "integer" => Rule::new(TypeCheck::new(TypeKind::Integer)),
        "numeric" => Rule::new(TypeCheck::new(TypeKind::Numeric)),
        "boolean" => Rule::new(TypeCheck::new(TypeKind::Boolean)),
        "array" => Rule::new(TypeCheck::new(TypeKind::Array)),

        "min" | "max" | "size" => {
            let n = number_arg(segment, single_arg(segment, args)?)?;
            let bound = match name {
                "min" => SizeBound::Min(n),
                "max" => SizeBound::Max(n),
                _ => SizeBound::Exactly(n),
            };
            Rule::new(Size::new(bound).numeric(numeric))
        }
        "between" => {
            let (min, max) = two_args(segment, args)?;
            let (min, max) = (number_arg(segment, &min)?, number_arg(segment, &max)?);
            if min > max {
                return Err(invalid(segment, "minimum is greater than maximum"));
            }
            Rule::new(Size::new(SizeBound::Between(min, max)).numeric(numeric))
        }

        "regex" => {
            let raw = args.ok_or_else(|| invalid(segment, "expected a pattern"))?;
            Rule::new(Pattern::new(compile_pattern(segment, raw)?))
        }
        "in" => Rule::new(Choice::one_of(list_args(segment, args)?)),
        "not_in" => Rule::new(Choice::none_of(list_args(segment, args)?)),

        "email" => Rule::new(Format::new(FormatKind::Email)),
        "url" => Rule::new(Format::new(FormatKind::Url)),
        "ip" => Rule::new(Format::new(FormatKind::Ip)),
        "ipv4" => Rule::new(Format::new(FormatKind::Ipv4)),
        "ipv6" => Rule::new(Format::new(FormatKind::Ipv6)),
        "alpha" => Rule::new(Format::new(FormatKind::Alpha)),
        "alpha_num" => Rule::new(Format::new(FormatKind::AlphaNum)),
        "alpha_dash" => Rule::new(Format::new(FormatKind::AlphaDash)),
        "uuid" => Rule::new(Format::new(FormatKind::Uuid)),
        "json" => Rule::new(Format::new(FormatKind::Json)),

        "digits" => Rule::new(Digits::exactly(count_arg(
            segment,
            single_arg(segment, args)?,
        )?)),
        "digits_between" => {
            let (min, max) = two_args(segment, args)?;
            let (min, max) = (count_arg(segment, &min)?, count_arg(segment, &max)?);
            if min > max {
                return Err(invalid(segment, "minimum is greater than maximum"));
            }
            Rule::new(Digits::between(min, max))
        }

        "date" => Rule::new(Date),
        "date_format" => Rule::new(DateFormat::new(single_arg(segment, args)?)),
        "after" | "after_or_equal" | "before" | "before_or_equal" => {
            let order = match name {
                "after" => DateOrder::After,
                "after_or_equal" => DateOrder::AfterOrEqual,
                "before" => DateOrder::Before,
                _ => DateOrder::BeforeOrEqual,
            };
            Rule::new(DateCompare::new(order, single_arg(segment, args)?))
        }

        "confirmed" => Rule::new(FieldMatch::confirmed()),
        "same" => Rule::new(FieldMatch::same(single_arg(segment, args)?)),
        "different" => Rule::new(FieldMatch::different(single_arg(segment, args)?)),

        unknown => return Err(FormkitError::UnknownRule(unknown.to_string())),
    };
    Ok(rule)
}
