//! Whole-submission validation.
//!
//! A [`Validator`] holds an ordered set of fields, each with its
//! [`FieldRules`], plus optional form-level callbacks. Validating a data bag
//! runs every rule of every field and collects *all* violations; nothing
//! stops at the first failure.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use formkit_core::{FormkitResult, ValidationErrors, Value};

use crate::constraint::{Rule, DEFAULT_GROUP};
use crate::constraints::Callback;
use crate::context::{ExecutionContext, Violation};
use crate::rules::{FieldRules, IntoFieldRules};

static NULL: Value = Value::Null;

/// Validates submitted data against per-field rules.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_validation::Validator;
///
/// let mut validator = Validator::new();
/// validator.add_field("password", "required|min:8|confirmed").unwrap();
/// let validator = validator.with_messages([("password.min", "Pick a longer password.")]);
///
/// let data = Value::map([("password", "short"), ("password_confirmation", "short")]);
/// let errors = validator.validate_data(&data).unwrap_err();
/// assert_eq!(errors.field("password"), ["Pick a longer password."]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    fields: Vec<(String, FieldRules)>,
    form_rules: Vec<Rule>,
    messages: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
    clock: Option<DateTime<FixedOffset>>,
}

impl Validator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator from `(field, rules)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if any rule string fails to parse.
    pub fn from_rules<I, K, R>(rules: I) -> FormkitResult<Self>
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: IntoFieldRules,
    {
        let mut validator = Self::new();
        for (field, field_rules) in rules {
            validator.add_field(field, field_rules)?;
        }
        Ok(validator)
    }

    /// Declares a field with its rules. Declaring a field twice appends the
    /// new rules to the existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules fail to parse.
    pub fn add_field(
        &mut self,
        field: impl Into<String>,
        rules: impl IntoFieldRules,
    ) -> FormkitResult<&mut Self> {
        let field = field.into();
        let rules = rules.into_field_rules()?;
        if let Some((_, existing)) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            existing.extend(rules);
        } else {
            self.fields.push((field, rules));
        }
        Ok(self)
    }

    /// Attaches a programmatic rule to a field, declaring it if needed.
    pub fn add_rule(&mut self, field: impl Into<String>, rule: Rule) -> &mut Self {
        let field = field.into();
        if let Some((_, existing)) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            existing.push(rule);
        } else {
            self.fields.push((field, FieldRules::from(vec![rule])));
        }
        self
    }

    /// Adds a form-level callback that receives the whole data bag.
    ///
    /// Violations it reports without [`at_path`](crate::ViolationBuilder::at_path)
    /// are form-level.
    pub fn add_callback<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value, &mut ExecutionContext<'_>) + Send + Sync + 'static,
    {
        self.form_rules.push(Rule::new(Callback::new(name, func)));
        self
    }

    /// Adds a form-level rule.
    pub fn add_form_rule(&mut self, rule: Rule) -> &mut Self {
        self.form_rules.push(rule);
        self
    }

    /// Sets custom messages keyed by `"<field>.<rule>"` (or just `"<rule>"`).
    #[must_use]
    pub fn with_messages<I, K, V>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.messages
            .extend(messages.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets display names used for the `{{ field }}` placeholder.
    #[must_use]
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Fixes the reference time for relative date rules.
    #[must_use]
    pub fn with_clock(mut self, now: DateTime<FixedOffset>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Returns the declared field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the rules declared for a field.
    pub fn rules_for(&self, field: &str) -> Option<&FieldRules> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, rules)| rules)
    }

    /// Returns `true` if no fields or form rules are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form_rules.is_empty()
    }

    /// Runs every rule and returns all violations, including non-blocking ones.
    pub fn validate(&self, data: &Value) -> Vec<Violation> {
        self.run(data, None)
    }

    /// Runs only the rules belonging to one of `groups`.
    pub fn validate_groups(&self, data: &Value, groups: &[&str]) -> Vec<Violation> {
        self.run(data, Some(groups))
    }

    /// Validates `data` and returns the declared fields' values.
    ///
    /// On success the result holds exactly the declared fields present in
    /// `data`; undeclared keys are dropped. Dotted field names produce
    /// nested maps. Warnings and info violations do not fail validation.
    ///
    /// # Errors
    ///
    /// Returns every blocking violation, keyed by field path (`__all__` for
    /// form-level violations).
    pub fn validate_data(&self, data: &Value) -> Result<BTreeMap<String, Value>, ValidationErrors> {
        self.validate_data_in_groups(data, &[DEFAULT_GROUP])
    }

    /// Like [`validate_data`](Self::validate_data), restricted to `groups`.
    ///
    /// # Errors
    ///
    /// Returns every blocking violation, keyed by field path.
    pub fn validate_data_in_groups(
        &self,
        data: &Value,
        groups: &[&str],
    ) -> Result<BTreeMap<String, Value>, ValidationErrors> {
        let violations = self.run(data, Some(groups));
        let errors = errors_from_violations(&violations);
        if !errors.is_empty() {
            tracing::debug!(fields = errors.len(), "Validation failed");
            return Err(errors);
        }

        let mut validated = Value::Map(BTreeMap::new());
        for (field, _) in &self.fields {
            if let Some(value) = data.get_path(field) {
                validated.set_path(field, value.clone());
            }
        }
        Ok(match validated {
            Value::Map(map) => map,
            _ => BTreeMap::new(),
        })
    }

    fn run(&self, data: &Value, groups: Option<&[&str]>) -> Vec<Violation> {
        let mut context = ExecutionContext::new(data)
            .with_messages(&self.messages)
            .with_attributes(&self.attributes);
        if let Some(now) = self.clock {
            context = context.with_now(now);
        }

        for (field, rules) in &self.fields {
            let value = data.get_path(field).unwrap_or(&NULL);
            context.set_path(field.as_str());
            rules.validate(value, &mut context, groups);
        }

        context.set_path("");
        for rule in &self.form_rules {
            if groups.map_or(true, |groups| rule.applies_to(groups)) {
                rule.check(data, &mut context);
            }
        }

        let violations = context.into_violations();
        tracing::debug!(
            fields = self.fields.len(),
            violations = violations.len(),
            "Validation run complete"
        );
        violations
    }
}

/// Collects the blocking violations into an error map.
pub fn errors_from_violations(violations: &[Violation]) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for violation in violations.iter().filter(|v| v.severity.is_blocking()) {
        errors.add(violation.error_key(), violation.message.clone());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Required;
    use crate::context::Severity;
    use serde_json::json;

    fn data(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    #[test]
    fn test_validate_data_returns_declared_subset() {
        let validator = Validator::from_rules([("name", "required"), ("age", "integer")]).unwrap();
        let result = validator
            .validate_data(&data(json!({"name": "Ann", "age": 30, "is_admin": true})))
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result["name"], Value::from("Ann"));
        assert!(!result.contains_key("is_admin"));
    }

    #[test]
    fn test_optional_missing_field_not_returned() {
        let validator = Validator::from_rules([("name", "required"), ("bio", "string")]).unwrap();
        let result = validator.validate_data(&data(json!({"name": "Ann"}))).unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), ["name"]);
    }

    #[test]
    fn test_multiple_messages_per_field() {
        let validator = Validator::from_rules([("code", "alpha|min:5")]).unwrap();
        let errors = validator.validate_data(&data(json!({"code": "a1"}))).unwrap_err();
        assert_eq!(errors.field("code").len(), 2);
    }

    #[test]
    fn test_dotted_fields() {
        let validator =
            Validator::from_rules([("address.city", "required"), ("address.zip", "digits:5")])
                .unwrap();
        let errors = validator
            .validate_data(&data(json!({"address": {"zip": "123"}})))
            .unwrap_err();
        assert_eq!(
            errors.field("address.city"),
            ["The address city field is required."]
        );
        assert_eq!(errors.field("address.zip"), ["The address zip must be 5 digits."]);

        let ok = validator
            .validate_data(&data(json!({"address": {"city": "Oslo", "zip": "01234", "x": 1}})))
            .unwrap();
        assert_eq!(
            Value::Map(ok).to_json(),
            json!({"address": {"city": "Oslo", "zip": "01234"}})
        );
    }

    #[test]
    fn test_form_level_callback() {
        let mut validator = Validator::new();
        validator
            .add_field("start", "required|date")
            .unwrap()
            .add_field("end", "required|date")
            .unwrap();
        validator.add_callback("range", |data, ctx| {
            let start = data.get("start").and_then(Value::as_str).unwrap_or_default();
            let end = data.get("end").and_then(Value::as_str).unwrap_or_default();
            if !start.is_empty() && !end.is_empty() && end < start {
                ctx.build_violation("The range is reversed.").add_violation();
            }
        });

        let errors = validator
            .validate_data(&data(json!({"start": "2024-05-02", "end": "2024-05-01"})))
            .unwrap_err();
        assert_eq!(errors.field("__all__"), ["The range is reversed."]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_attributes_and_messages() {
        let validator = Validator::from_rules([("dob", "required"), ("email", "required|email")])
            .unwrap()
            .with_attributes([("dob", "date of birth")])
            .with_messages([("email.email", "That {{ value }} is not an email.")]);
        let errors = validator
            .validate_data(&data(json!({"email": "nope"})))
            .unwrap_err();
        assert_eq!(errors.field("dob"), ["The date of birth field is required."]);
        assert_eq!(errors.field("email"), ["That nope is not an email."]);
    }

    #[test]
    fn test_warnings_do_not_block() {
        let mut validator = Validator::new();
        validator.add_rule("nickname", Rule::new(Required).with_severity(Severity::Warning));
        let empty = data(json!({}));

        assert!(validator.validate_data(&empty).is_ok());
        let violations = validator.validate(&empty);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn test_groups() {
        let mut validator = Validator::new();
        validator.add_rule("name", Rule::new(Required));
        validator.add_rule("company", Rule::new(Required).in_groups(["business"]));
        let empty = data(json!({}));

        let default_only = validator.validate_data(&empty).unwrap_err();
        assert_eq!(default_only.errors().keys().collect::<Vec<_>>(), ["name"]);

        let business = validator.validate_groups(&empty, &["business"]);
        assert_eq!(business.len(), 1);
        assert_eq!(business[0].path, "company");

        assert_eq!(validator.validate(&empty).len(), 2);
    }

    #[test]
    fn test_clock_injection() {
        use chrono::TimeZone;
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
            .unwrap();
        let validator = Validator::from_rules([("when", "after:today")])
            .unwrap()
            .with_clock(now);
        assert!(validator.validate_data(&data(json!({"when": "2029-12-31"}))).is_err());
        assert!(validator.validate_data(&data(json!({"when": "2030-01-02"}))).is_ok());
    }

    #[test]
    fn test_add_field_twice_appends() {
        let mut validator = Validator::new();
        validator.add_field("name", "required").unwrap();
        validator.add_field("name", "min:3").unwrap();
        assert_eq!(validator.rules_for("name").unwrap().names(), ["required", "min"]);
        assert_eq!(validator.fields().count(), 1);
    }

    #[test]
    fn test_unknown_rule_fails_at_configuration() {
        let result = Validator::from_rules([("name", "required|glitter")]);
        assert!(matches!(
            result,
            Err(formkit_core::FormkitError::UnknownRule(name)) if name == "glitter"
        ));
    }
}
