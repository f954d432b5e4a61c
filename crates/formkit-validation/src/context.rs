//! Execution context and violations.
//!
//! An [`ExecutionContext`] is created once per validation run. It wraps the
//! full submitted data bag, tracks which field and rule are being checked,
//! and accumulates [`Violation`]s. Constraints report failures through the
//! fluent [`ViolationBuilder`]:
//!
//! ```
//! use formkit_core::Value;
//! use formkit_validation::ExecutionContext;
//!
//! let data = Value::map([("password", "secret")]);
//! let mut ctx = ExecutionContext::new(&data);
//! ctx.build_violation("The {{ field }} is too weak (score {{ score }}).")
//!     .at_path("password")
//!     .set_parameter("score", 1)
//!     .add_violation();
//!
//! assert_eq!(ctx.violations()[0].message, "The password is too weak (score 1).");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use formkit_core::settings::utc;
use formkit_core::utils::text::{humanize, interpolate};
use formkit_core::Value;

/// The reserved key under which form-level errors are reported.
pub const FORM_LEVEL_KEY: &str = "__all__";

/// How serious a violation is. Only [`Severity::Error`] blocks validity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A blocking failure.
    #[default]
    Error,
    /// An advisory message that does not reject the value.
    Warning,
    /// Purely informational.
    Info,
}

impl Severity {
    /// Returns `true` if violations of this severity make data invalid.
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns the lowercase name of this severity.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Dotted path of the offending field. Empty for form-level violations.
    pub path: String,
    /// The message template before interpolation.
    pub template: String,
    /// The interpolated message.
    pub message: String,
    /// Values substituted into the template.
    pub parameters: BTreeMap<String, String>,
    /// The name of the rule that produced this violation, if any.
    pub code: Option<String>,
    /// How serious the violation is.
    pub severity: Severity,
    /// The value that failed.
    pub invalid_value: Value,
}

impl Violation {
    /// Returns the key this violation is reported under in an error map:
    /// its path, or [`FORM_LEVEL_KEY`] for form-level violations.
    pub fn error_key(&self) -> &str {
        if self.path.is_empty() {
            FORM_LEVEL_KEY
        } else {
            &self.path
        }
    }
}

/// State shared by all constraints during one validation run.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    root: &'a Value,
    path: String,
    rule: Option<String>,
    severity: Severity,
    messages: Option<&'a BTreeMap<String, String>>,
    attributes: Option<&'a BTreeMap<String, String>>,
    now: DateTime<FixedOffset>,
    violations: Vec<Violation>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context over the given data bag, using the current UTC time
    /// as "now".
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            path: String::new(),
            rule: None,
            severity: Severity::Error,
            messages: None,
            attributes: None,
            now: Utc::now().with_timezone(&utc()),
            violations: Vec::new(),
        }
    }

    /// Sets custom message overrides keyed by `"<field>.<rule>"` or `"<rule>"`.
    #[must_use]
    pub fn with_messages(mut self, messages: &'a BTreeMap<String, String>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Sets display names for fields, used for the `{{ field }}` placeholder.
    #[must_use]
    pub fn with_attributes(mut self, attributes: &'a BTreeMap<String, String>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Fixes the reference time used by relative date rules.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = now;
        self
    }

    /// Returns the full data bag.
    pub const fn root(&self) -> &'a Value {
        self.root
    }

    /// Looks up a value in the data bag by dotted path.
    pub fn value_at(&self, path: &str) -> Option<&'a Value> {
        self.root.get_path(path)
    }

    /// Returns the path of the field currently being validated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the reference "now" for relative date rules.
    pub const fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    /// Sets the field currently being validated.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Sets the rule currently being checked and its severity.
    pub fn enter_rule(&mut self, rule: &str, severity: Severity) {
        self.rule = Some(rule.to_string());
        self.severity = severity;
    }

    /// Clears the current rule.
    pub fn leave_rule(&mut self) {
        self.rule = None;
        self.severity = Severity::Error;
    }

    /// Returns the display name of a field: its attribute override, or the
    /// humanized path.
    pub fn display_name(&self, path: &str) -> String {
        self.attributes
            .and_then(|attrs| attrs.get(path))
            .cloned()
            .unwrap_or_else(|| humanize(path))
    }

    /// Starts building a violation at the current path.
    pub fn build_violation(&mut self, template: impl Into<String>) -> ViolationBuilder<'_, 'a> {
        let path = self.path.clone();
        let code = self.rule.clone();
        let severity = self.severity;
        ViolationBuilder {
            context: self,
            template: template.into(),
            path,
            parameters: BTreeMap::new(),
            code,
            severity,
            invalid_value: Value::Null,
        }
    }

    /// Returns all violations recorded so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes the context and returns its violations.
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Returns `true` if any recorded violation is blocking.
    pub fn has_blocking_violations(&self) -> bool {
        self.violations.iter().any(|v| v.severity.is_blocking())
    }

    fn custom_template(&self, path: &str, code: Option<&str>) -> Option<String> {
        let messages = self.messages?;
        let code = code?;
        messages
            .get(&format!("{path}.{code}"))
            .or_else(|| messages.get(code))
            .cloned()
    }
}

/// Fluent builder for a single [`Violation`].
///
/// Nothing is recorded until [`add_violation`](Self::add_violation) is called.
#[derive(Debug)]
#[must_use = "a violation is only recorded by add_violation()"]
pub struct ViolationBuilder<'c, 'a> {
    context: &'c mut ExecutionContext<'a>,
    template: String,
    path: String,
    parameters: BTreeMap<String, String>,
    code: Option<String>,
    severity: Severity,
    invalid_value: Value,
}

impl ViolationBuilder<'_, '_> {
    /// Reports the violation at the given dotted path from the data root
    /// instead of the current field. An empty path makes it form-level.
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets a template parameter.
    pub fn set_parameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(key.into(), value.to_string());
        self
    }

    /// Sets the rule code, overriding the rule currently being checked.
    pub fn set_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the severity, overriding the current rule's severity.
    pub fn set_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Records the value that failed; also available as `{{ value }}`.
    pub fn set_invalid_value(mut self, value: Value) -> Self {
        self.invalid_value = value;
        self
    }

    /// Interpolates the message and records the violation.
    pub fn add_violation(self) {
        let Self {
            context,
            template,
            path,
            mut parameters,
            code,
            severity,
            invalid_value,
        } = self;

        let template = context
            .custom_template(&path, code.as_deref())
            .unwrap_or(template);

        if !parameters.contains_key("field") {
            parameters.insert("field".to_string(), context.display_name(&path));
        }
        if !invalid_value.is_null() && !parameters.contains_key("value") {
            parameters.insert("value".to_string(), invalid_value.to_view_string());
        }

        let message = interpolate(&template, &parameters);
        context.violations.push(Violation {
            path,
            template,
            message,
            parameters,
            code,
            severity,
            invalid_value,
        });
    }
}
