//! The root `field` type, compound forms, buttons and the `generic` fallback.

use std::collections::BTreeMap;

use formkit_core::{FormkitResult, Value};
use formkit_validation::constraints::Required;
use formkit_validation::{FieldRules, Rule};

use super::{FieldBuilder, FieldType};
use crate::builder::BuildContext;
use crate::options::{Options, OptionsResolver};

/// The message of the extra-fields error.
pub const EXTRA_FIELDS_MESSAGE: &str = "This form should not contain extra fields.";

/// The root of every data-carrying type.
///
/// Options: `label`, `required`, `disabled`, `attr`, `help`, `constraints`,
/// `data`, `empty_data`, `mapped`, `error_bubbling`, `trim`,
/// `translation_domain`, `property_path`, `compound` and `invalid_message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldBaseType;

impl FieldType for FieldBaseType {
    fn name(&self) -> &str {
        "field"
    }

    fn parent(&self) -> Option<&str> {
        None
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("label", Value::Null)
            .set_allowed_types("label", ["null", "string"])
            .set_default("required", false)
            .set_allowed_types("required", ["bool"])
            .set_default("disabled", false)
            .set_allowed_types("disabled", ["bool"])
            .set_default("attr", Value::Map(BTreeMap::new()))
            .set_allowed_types("attr", ["map"])
            .set_default("help", Value::Null)
            .set_allowed_types("help", ["null", "string"])
            .set_default("constraints", Value::Null)
            .set_allowed_types("constraints", ["null", "string", "string[]"])
            .set_defined(["data"])
            .set_default("empty_data", Value::Null)
            .set_default("mapped", true)
            .set_allowed_types("mapped", ["bool"])
            .set_default("error_bubbling", false)
            .set_allowed_types("error_bubbling", ["bool"])
            .set_default("trim", true)
            .set_allowed_types("trim", ["bool"])
            .set_default("translation_domain", Value::Null)
            .set_allowed_types("translation_domain", ["null", "string"])
            .set_default("property_path", Value::Null)
            .set_allowed_types("property_path", ["null", "string"])
            .set_default("compound", false)
            .set_allowed_types("compound", ["bool"])
            .set_default("invalid_message", "This value is not valid.")
            .set_allowed_types("invalid_message", ["string"]);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        let compound = options.get("compound").and_then(Value::as_bool).unwrap_or(false);
        builder.set_compound(compound);

        let constraints = match options.get("constraints") {
            Some(Value::String(rules)) => FieldRules::parse(rules)?,
            Some(Value::List(rules)) => FieldRules::from_list(rules.iter().map(Value::to_view_string))?,
            _ => FieldRules::new(),
        };
        let required = options.get("required").and_then(Value::as_bool).unwrap_or(false);
        if required && !constraints.is_required() {
            builder.add_rule(Rule::new(Required));
        }
        builder.add_rules(constraints)?;
        Ok(())
    }
}

/// A compound form holding child fields.
///
/// Adds `csrf_protection`, `csrf_field_name`, `csrf_token_id`,
/// `allow_extra_fields`, `extra_fields_message` and `validation_groups`.
/// CSRF defaults come from the settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormType;

impl FieldType for FormType {
    fn name(&self) -> &str {
        "form"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, context: &BuildContext) {
        let settings = context.settings();
        resolver
            .set_default("compound", true)
            .set_default("error_bubbling", true)
            .set_default("csrf_protection", settings.csrf_protection)
            .set_allowed_types("csrf_protection", ["bool"])
            .set_default("csrf_field_name", settings.csrf_field_name.clone())
            .set_allowed_types("csrf_field_name", ["string"])
            .set_default("csrf_token_id", Value::Null)
            .set_allowed_types("csrf_token_id", ["null", "string"])
            .set_default("allow_extra_fields", false)
            .set_allowed_types("allow_extra_fields", ["bool"])
            .set_default("extra_fields_message", EXTRA_FIELDS_MESSAGE)
            .set_allowed_types("extra_fields_message", ["string"])
            .set_default("validation_groups", Value::Null)
            .set_allowed_types("validation_groups", ["null", "string[]"]);
    }
}

/// The root of clickable buttons. Buttons carry no data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonType;

impl FieldType for ButtonType {
    fn name(&self) -> &str {
        "button"
    }

    fn parent(&self) -> Option<&str> {
        None
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("label", Value::Null)
            .set_allowed_types("label", ["null", "string"])
            .set_default("attr", Value::Map(BTreeMap::new()))
            .set_allowed_types("attr", ["map"])
            .set_default("disabled", false)
            .set_allowed_types("disabled", ["bool"])
            .set_default("translation_domain", Value::Null)
            .set_allowed_types("translation_domain", ["null", "string"])
            .set_default("mapped", false)
            .set_allowed_values("mapped", [false]);
    }
}

/// A submit button.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitType;

impl FieldType for SubmitType {
    fn name(&self) -> &str {
        "submit"
    }

    fn parent(&self) -> Option<&str> {
        Some("button")
    }
}

/// A reset button.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetType;

impl FieldType for ResetType {
    fn name(&self) -> &str {
        "reset"
    }

    fn parent(&self) -> Option<&str> {
        Some("button")
    }
}

/// The fallback for unknown type names: a plain field that accepts any
/// extra option.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericType;

impl FieldType for GenericType {
    fn name(&self) -> &str {
        "generic"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver.set_allow_extra_options(true);
    }
}
