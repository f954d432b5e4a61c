//! # formkit-validation
//!
//! A constraint-based validation engine for submitted form data.
//!
//! Constraints are attached to fields either programmatically or through a
//! compact rule string such as `"required|email|max:255"`. A [`Validator`]
//! runs every field's constraints in declared order against a data bag and
//! collects *all* violations, keyed by field path.
//!
//! ## Modules
//!
//! - [`constraint`] - The [`Constraint`] trait and the [`Rule`] wrapper (groups, severity)
//! - [`constraints`] - Built-in constraints
//! - [`context`] - [`ExecutionContext`], violations, and the fluent violation builder
//! - [`messages`] - Default message templates
//! - [`rules`] - Rule-string parsing into [`FieldRules`]
//! - [`validator`] - The [`Validator`] that validates a full submission
//!
//! ## Example
//!
//! ```
//! use formkit_core::Value;
//! use formkit_validation::Validator;
//!
//! let validator = Validator::from_rules([
//!     ("email", "required|email"),
//!     ("age", "integer|between:18,100"),
//! ])
//! .unwrap();
//!
//! let data = Value::from(serde_json::json!({"email": "ann@example.com", "age": 15}));
//! let errors = validator.validate_data(&data).unwrap_err();
//! assert_eq!(errors.field("age"), ["The age must be between 18 and 100."]);
//! ```

pub mod constraint;
pub mod constraints;
pub mod context;
pub mod messages;
pub mod rules;
pub mod validator;

pub use constraint::{Constraint, Rule, DEFAULT_GROUP};
pub use context::{ExecutionContext, Severity, Violation, ViolationBuilder, FORM_LEVEL_KEY};
pub use rules::{FieldRules, IntoFieldRules};
pub use validator::Validator;
