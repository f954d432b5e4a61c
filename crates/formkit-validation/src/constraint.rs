//! The constraint abstraction.
//!
//! A [`Constraint`] checks one value and reports failures to the
//! [`ExecutionContext`]. A [`Rule`] attaches a constraint to a field together
//! with the validation groups it belongs to and the severity of the
//! violations it produces.

use std::fmt;
use std::sync::Arc;

use formkit_core::Value;

use crate::context::{ExecutionContext, Severity};

/// The group every rule belongs to unless configured otherwise.
pub const DEFAULT_GROUP: &str = "Default";

/// A named validation rule.
///
/// Implementations must tolerate missing input: unless the constraint is
/// specifically about presence, an empty value (see [`Value::is_empty`])
/// should be accepted silently.
///
/// # Examples
///
/// ```
/// use formkit_core::Value;
/// use formkit_validation::{Constraint, ExecutionContext};
///
/// #[derive(Debug)]
/// struct Even;
///
/// impl Constraint for Even {
///     fn name(&self) -> &str {
///         "even"
///     }
///
///     fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>) {
///         if value.as_i64().is_some_and(|n| n % 2 != 0) {
///             context.build_violation("The {{ field }} must be even.").add_violation();
///         }
///     }
/// }
///
/// let data = Value::Null;
/// let mut ctx = ExecutionContext::new(&data);
/// ctx.set_path("count");
/// Even.validate(&Value::from(3), &mut ctx);
/// assert_eq!(ctx.violations()[0].message, "The count must be even.");
/// ```
pub trait Constraint: Send + Sync + fmt::Debug {
    /// The rule name, used as the violation code and for message overrides.
    fn name(&self) -> &str;

    /// Checks `value`, recording violations in `context`.
    fn validate(&self, value: &Value, context: &mut ExecutionContext<'_>);
}

/// A constraint attached to a field, with its groups and severity.
#[derive(Debug, Clone)]
pub struct Rule {
    constraint: Arc<dyn Constraint>,
    groups: Vec<String>,
    severity: Severity,
}

impl Rule {
    /// Wraps a constraint in the default group with [`Severity::Error`].
    pub fn new(constraint: impl Constraint + 'static) -> Self {
        Self::from_arc(Arc::new(constraint))
    }

    /// Wraps a shared constraint.
    pub fn from_arc(constraint: Arc<dyn Constraint>) -> Self {
        Self {
            constraint,
            groups: vec![DEFAULT_GROUP.to_string()],
            severity: Severity::Error,
        }
    }

    /// Replaces the groups this rule belongs to.
    #[must_use]
    pub fn in_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the severity of violations produced by this rule.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns the rule name.
    pub fn name(&self) -> &str {
        self.constraint.name()
    }

    /// Returns the groups this rule belongs to.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Returns the severity of this rule's violations.
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the wrapped constraint.
    pub fn constraint(&self) -> &dyn Constraint {
        self.constraint.as_ref()
    }

    /// Returns `true` if this rule belongs to any of the given groups.
    pub fn applies_to(&self, groups: &[&str]) -> bool {
        self.groups.iter().any(|g| groups.contains(&g.as_str()))
    }

    /// Runs the constraint against `value` at the context's current path.
    pub fn check(&self, value: &Value, context: &mut ExecutionContext<'_>) {
        context.enter_rule(self.name(), self.severity);
        self.constraint.validate(value, context);
        context.leave_rule();
    }
}
