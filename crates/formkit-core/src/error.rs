//! Core error types for formkit.
//!
//! Errors fall into three families that map onto the three pipelines of the
//! library:
//!
//! - [`OptionsError`]: a field was configured incorrectly. Always fatal and
//!   raised while a form is being built, never during submission.
//! - [`TransformationError`]: a value could not be converted between its
//!   model and view representations.
//! - [`ValidationErrors`]: submitted data broke one or more constraints.
//!
//! [`FormkitError`] wraps all of them together with the remaining failure
//! modes (CSRF, state, rule parsing, configuration, IO).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A boxed error used to carry arbitrary causes through the library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An option map failed to resolve against its declared schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    /// A required option has no value and no default.
    #[error("The required option \"{key}\" is missing.")]
    Missing {
        /// The missing option name.
        key: String,
    },

    /// An option value does not have any of the allowed types.
    #[error(
        "The option \"{key}\" with value of type \"{actual}\" is expected to be of type \"{}\".",
        .expected.join("\" or \"")
    )]
    InvalidType {
        /// The offending option name.
        key: String,
        /// The allowed type tags.
        expected: Vec<String>,
        /// The structural type of the given value.
        actual: String,
    },

    /// An option value is not one of the allowed values.
    #[error(
        "The option \"{key}\" with value {value} is invalid. Accepted values are: {}.",
        .allowed.join(", ")
    )]
    InvalidValue {
        /// The offending option name.
        key: String,
        /// The rejected value, rendered for display.
        value: String,
        /// The accepted values, rendered for display.
        allowed: Vec<String>,
    },

    /// One or more options are not declared by the schema.
    #[error(
        "The option(s) \"{}\" do not exist. Defined options are: \"{}\".",
        .keys.join("\", \""),
        .known.join("\", \"")
    )]
    Undefined {
        /// The unknown option names, sorted.
        keys: Vec<String>,
        /// The declared option names, sorted.
        known: Vec<String>,
    },

    /// A normalizer rejected the value.
    #[error("The option \"{key}\" could not be normalized: {message}")]
    Normalization {
        /// The option name.
        key: String,
        /// The normalizer's explanation.
        message: String,
    },
}

/// A model/view conversion could not complete.
///
/// Carries the offending value (rendered as a string), a human-readable
/// cause, and optionally the transformer and field path where the failure
/// happened plus the original error.
#[derive(Debug)]
pub struct TransformationError {
    /// The value that could not be converted.
    pub value: String,
    /// Why the conversion failed.
    pub message: String,
    /// The name of the transformer that failed, if known.
    pub transformer: Option<String>,
    /// The dotted path of the field being converted, if known.
    pub field: Option<String>,
    source: Option<BoxError>,
}

impl TransformationError {
    /// Creates a new `TransformationError` for the given value and cause.
    pub fn new(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            message: message.into(),
            transformer: None,
            field: None,
            source: None,
        }
    }

    /// Attaches the underlying error that caused this failure.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Records the transformer name, keeping the innermost one if already set.
    #[must_use]
    pub fn in_transformer(mut self, name: impl Into<String>) -> Self {
        if self.transformer.is_none() {
            self.transformer = Some(name.into());
        }
        self
    }

    /// Records the field path, keeping the innermost one if already set.
    #[must_use]
    pub fn at_field(mut self, path: impl Into<String>) -> Self {
        if self.field.is_none() {
            self.field = Some(path.into());
        }
        self
    }
}

impl fmt::Display for TransformationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to transform value \"{}\": {}", self.value, self.message)?;
        if let Some(transformer) = &self.transformer {
            write!(f, " (transformer: {transformer})")?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransformationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Submitted data failed validation.
///
/// Holds every failing field with all of its messages, keyed by field name
/// or dotted path. Form-level messages use the `__all__` key.
///
/// # Examples
///
/// ```
/// use formkit_core::error::ValidationErrors;
///
/// let mut errors = ValidationErrors::default();
/// errors.add("email", "The email must be a valid email address.");
/// errors.add("email", "The email may not be greater than 255 characters.");
/// assert_eq!(errors.field("email").len(), 2);
/// assert_eq!(errors.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Creates a `ValidationErrors` from an error map.
    pub const fn new(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self { errors }
    }

    /// Adds a message for the given field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns the full error map.
    pub const fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Consumes `self` and returns the error map.
    pub fn into_errors(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }

    /// Returns the messages recorded for a field (empty if none).
    pub fn field(&self, name: &str) -> &[String] {
        self.errors.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of fields with errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if no field has errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        write!(
            f,
            "{} field(s) failed validation: {}",
            fields.len(),
            fields.join(", ")
        )
    }
}

impl std::error::Error for ValidationErrors {}

/// The primary error type for formkit.
#[derive(Error, Debug)]
pub enum FormkitError {
    // ── Configuration ────────────────────────────────────────────────

    /// Field options failed to resolve.
    #[error("Invalid options: {0}")]
    Options(#[from] OptionsError),

    /// A rule string named a rule that does not exist.
    #[error("Unknown validation rule: {0}")]
    UnknownRule(String),

    /// A rule string contained a known rule with bad arguments.
    #[error("Invalid validation rule \"{rule}\": {message}")]
    InvalidRule {
        /// The rule as written.
        rule: String,
        /// What is wrong with it.
        message: String,
    },

    /// A type tag could not be resolved (e.g. an inheritance cycle).
    #[error("Unknown form type: {0}")]
    UnknownType(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Submission ───────────────────────────────────────────────────

    /// A value could not be converted between model and view formats.
    #[error(transparent)]
    Transformation(#[from] TransformationError),

    /// Submitted data failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The CSRF token was missing, forged, or expired.
    #[error("CSRF token invalid: {0}")]
    Csrf(String),

    /// `submit` was called on a form that was already submitted.
    #[error("Form \"{0}\" has already been submitted")]
    AlreadySubmitted(String),

    /// An operation is not allowed in the form's current state.
    #[error("Invalid form state: {0}")]
    InvalidState(String),

    // ── Collaborators ────────────────────────────────────────────────

    /// A renderer failed or a template was missing.
    #[error("Render error: {0}")]
    RenderError(String),

    /// A data provider failed to supply records.
    #[error("Data provider error: {0}")]
    ProviderError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FormkitError {
    /// Returns `true` if this error was caused by end-user input rather than
    /// by the form's author or the environment.
    ///
    /// User errors are routine and should be rendered back to the user;
    /// everything else indicates a programming or deployment mistake.
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Transformation(_) | Self::Validation(_) | Self::Csrf(_)
        )
    }
}

/// A convenience type alias for `Result<T, FormkitError>`.
pub type FormkitResult<T> = Result<T, FormkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_option_display() {
        let err = OptionsError::Missing { key: "choices".into() };
        assert_eq!(err.to_string(), "The required option \"choices\" is missing.");
    }

    #[test]
    fn test_invalid_type_display_lists_union() {
        let err = OptionsError::InvalidType {
            key: "label".into(),
            expected: vec!["null".into(), "string".into()],
            actual: "int".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"label\""));
        assert!(msg.contains("\"null\" or \"string\""));
        assert!(msg.contains("\"int\""));
    }

    #[test]
    fn test_undefined_display() {
        let err = OptionsError::Undefined {
            keys: vec!["colour".into()],
            known: vec!["color".into(), "label".into()],
        };
        assert!(err.to_string().contains("\"colour\" do not exist"));
    }

    #[test]
    fn test_transformation_error_context() {
        let err = TransformationError::new("abc", "Expected a numeric string")
            .in_transformer("number_to_localized_string")
            .at_field("profile.salary")
            .at_field("ignored");
        assert_eq!(err.field.as_deref(), Some("profile.salary"));
        let msg = err.to_string();
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("number_to_localized_string"));
        assert!(msg.contains("profile.salary"));
    }

    #[test]
    fn test_transformation_error_source() {
        use std::error::Error as _;
        let io = std::io::Error::other("boom");
        let err = TransformationError::new("x", "callback failed").with_source(io);
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_validation_errors_accumulate() {
        let mut errors = ValidationErrors::default();
        errors.add("age", "too young");
        errors.add("role", "invalid");
        errors.add("age", "not an integer");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.field("age"), ["too young", "not an integer"]);
        assert!(errors.field("missing").is_empty());
        assert_eq!(errors.to_string(), "2 field(s) failed validation: age, role");
    }

    #[test]
    fn test_is_user_error() {
        assert!(FormkitError::Csrf("expired".into()).is_user_error());
        assert!(FormkitError::Validation(ValidationErrors::default()).is_user_error());
        assert!(!FormkitError::UnknownRule("foo".into()).is_user_error());
        assert!(!FormkitError::from(OptionsError::Missing { key: "x".into() }).is_user_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: FormkitError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }
}
