//! Numeric input types.

use formkit_core::{FormkitResult, Value};
use formkit_validation::constraints::{TypeCheck, TypeKind};
use formkit_validation::Rule;

use super::{FieldBuilder, FieldType};
use crate::builder::BuildContext;
use crate::options::{Options, OptionsResolver};
use crate::transformers::{IntegerToStringTransformer, NumberToLocalizedStringTransformer};

/// A localized number input.
///
/// Options: `scale` (decimal places, defaulting to the configured
/// precision), `grouping` (thousands separators in the view) and `rounding`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl FieldType for NumberType {
    fn name(&self) -> &str {
        "number"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver
            .set_default("scale", Value::Null)
            .set_allowed_types("scale", ["null", "int"])
            .set_normalizer("scale", |_, scale| match scale {
                Value::Int(n) if n < 0 => Err(format!("must not be negative, got {n}")),
                other => Ok(other),
            })
            .set_default("grouping", false)
            .set_allowed_types("grouping", ["bool"])
            .set_default("rounding", true)
            .set_allowed_types("rounding", ["bool"]);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        context: &BuildContext,
    ) -> FormkitResult<()> {
        let settings = context.settings();
        let scale = options
            .get("scale")
            .and_then(Value::as_i64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(settings.number_precision);
        let grouping = options.get("grouping").and_then(Value::as_bool).unwrap_or(false);
        let rounding = options.get("rounding").and_then(Value::as_bool).unwrap_or(true);
        let thousands = if grouping {
            settings.thousands_separator.as_str()
        } else {
            ""
        };

        builder.add_transformer(
            NumberToLocalizedStringTransformer::new(
                scale,
                settings.decimal_separator.clone(),
                thousands,
            )
            .with_rounding(rounding),
        );
        if !builder.has_rule("numeric") {
            builder.add_rule(Rule::new(TypeCheck::new(TypeKind::Numeric)));
        }
        Ok(())
    }
}

/// A whole-number input. Fractional submissions are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl FieldType for IntegerType {
    fn name(&self) -> &str {
        "integer"
    }

    fn parent(&self) -> Option<&str> {
        Some("number")
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, _context: &BuildContext) {
        resolver.set_default("scale", 0);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        context: &BuildContext,
    ) -> FormkitResult<()> {
        let grouping = options.get("grouping").and_then(Value::as_bool).unwrap_or(false);
        let transformer = if grouping {
            IntegerToStringTransformer::with_grouping(context.settings().thousands_separator.clone())
        } else {
            IntegerToStringTransformer::new()
        };
        builder.reset_transformers().add_transformer(transformer);
        if !builder.has_rule("integer") {
            builder.add_rule(Rule::new(TypeCheck::new(TypeKind::Integer)));
        }
        Ok(())
    }
}
