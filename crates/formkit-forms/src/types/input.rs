//! Single-value input types: text-like inputs, checkboxes and files.

use formkit_core::{FormkitResult, Value};
use formkit_validation::constraints::{Format, FormatKind};
use formkit_validation::Rule;

use super::{FieldBuilder, FieldType};
use crate::builder::BuildContext;
use crate::options::{Options, OptionsResolver};
use crate::transformers::{BooleanToStringTransformer, CallbackTransformer};

/// A single-line text input.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextType;

impl FieldType for TextType {
    fn name(&self) -> &str {
        "text"
    }
}

/// A multi-line text input.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextareaType;

impl FieldType for TextareaType {
    fn name(&self) -> &str {
        "textarea"
    }

    fn parent(&self) -> Option<&str> {
        Some("text")
    }
}

/// A text input validated as an email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailType;

impl FieldType for EmailType {
    fn name(&self) -> &str {
        "email"
    }

    fn parent(&self) -> Option<&str> {
        Some("text")
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        _options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        if !builder.has_rule("email") {
            builder.add_rule(Rule::new(Format::new(FormatKind::Email)));
        }
        Ok(())
    }
}

/// A password input. With `always_empty` (the default) the submitted value
/// is never rendered back.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordType;

impl FieldType for PasswordType {
    fn name(&self) -> &str {
        "password"
    }

    fn parent(&self) -> Option<&str> {
        Some("text")
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("always_empty", true)
            .set_allowed_types("always_empty", ["bool"])
            .set_default("trim", false);
    }
}

/// A URL input. Values without a scheme get `default_protocol` prepended
/// on submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlType;

impl FieldType for UrlType {
    fn name(&self) -> &str {
        "url"
    }

    fn parent(&self) -> Option<&str> {
        Some("text")
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("default_protocol", "http")
            .set_allowed_types("default_protocol", ["null", "string"]);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        if let Some(protocol) = options.get("default_protocol").and_then(Value::as_str) {
            let protocol = protocol.to_string();
            builder.add_transformer(
                CallbackTransformer::map(Value::clone, move |value| match value {
                    Value::String(s) if !s.is_empty() && !s.contains("://") => {
                        Value::String(format!("{protocol}://{s}"))
                    }
                    other => other.clone(),
                })
                .with_name("default_protocol"),
            );
        }
        if !builder.has_rule("url") {
            builder.add_rule(Rule::new(Format::new(FormatKind::Url)));
        }
        Ok(())
    }
}

/// A telephone number input.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelType;

impl FieldType for TelType {
    fn name(&self) -> &str {
        "tel"
    }

    fn parent(&self) -> Option<&str> {
        Some("text")
    }
}

/// A search input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchType;

impl FieldType for SearchType {
    fn name(&self) -> &str {
        "search"
    }

    fn parent(&self) -> Option<&str> {
        Some("text")
    }
}

/// A hidden input. Its errors bubble to the parent form since the field
/// itself is never shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenType;

impl FieldType for HiddenType {
    fn name(&self) -> &str {
        "hidden"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver.set_default("error_bubbling", true);
    }
}

/// A checkbox bound to a boolean model value.
///
/// The view value is the `value` option when checked and `"0"` otherwise;
/// a checkbox missing from a submission counts as unchecked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckboxType;

impl FieldType for CheckboxType {
    fn name(&self) -> &str {
        "checkbox"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("value", "1")
            .set_allowed_types("value", ["string"])
            .set_default("empty_data", "0");
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        let checked = options.get("value").and_then(Value::as_str).unwrap_or("1");
        builder.add_transformer(BooleanToStringTransformer::new(checked, "0"));
        Ok(())
    }
}

/// A file upload. The submitted value is passed through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileType;

impl FieldType for FileType {
    fn name(&self) -> &str {
        "file"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("multiple", false)
            .set_allowed_types("multiple", ["bool"])
            .set_default("accept", Value::Null)
            .set_allowed_types("accept", ["null", "string"])
            .set_default("trim", false);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        if let Some(accept) = options.get("accept").and_then(Value::as_str) {
            builder.default_attr("accept", accept);
        }
        Ok(())
    }
}
