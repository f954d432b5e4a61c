//! Date and date-time inputs.

use chrono::FixedOffset;

use formkit_core::{FormkitResult, Value};
use formkit_validation::constraints::Date;
use formkit_validation::Rule;

use super::{FieldBuilder, FieldType};
use crate::builder::BuildContext;
use crate::options::{Options, OptionsResolver};
use crate::transformers::DateTimeToStringTransformer;

fn offset_option(options: &Options, key: &str) -> Option<FixedOffset> {
    options
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|seconds| i32::try_from(seconds).ok())
        .and_then(FixedOffset::east_opt)
}

fn validate_offset(_: &Options, value: Value) -> Result<Value, String> {
    match value {
        Value::Int(seconds)
            if i32::try_from(seconds)
                .ok()
                .and_then(FixedOffset::east_opt)
                .is_none() =>
        {
            Err(format!("{seconds} is not a valid UTC offset in seconds"))
        }
        other => Ok(other),
    }
}

/// A date input.
///
/// Options: `format` (single-letter tokens or `strftime`, defaulting to the configured
/// date format), `model_timezone` and `view_timezone` (UTC offsets in
/// seconds, defaulting to the configured timezone).
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl FieldType for DateType {
    fn name(&self) -> &str {
        "date"
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, context: &BuildContext) {
        resolver
            .set_default("format", context.settings().date_format.clone())
            .set_allowed_types("format", ["string"])
            .set_default("model_timezone", Value::Null)
            .set_allowed_types("model_timezone", ["null", "int"])
            .set_normalizer("model_timezone", validate_offset)
            .set_default("view_timezone", Value::Null)
            .set_allowed_types("view_timezone", ["null", "int"])
            .set_normalizer("view_timezone", validate_offset);
    }

    fn build_field(
        &self,
        builder: &mut FieldBuilder,
        options: &Options,
        context: &BuildContext,
    ) -> FormkitResult<()> {
        let format = options
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or(&context.settings().date_format)
            .to_string();
        let model_tz =
            offset_option(options, "model_timezone").unwrap_or_else(|| context.settings().time_zone());
        let view_tz = offset_option(options, "view_timezone").unwrap_or(model_tz);

        builder.add_transformer(
            DateTimeToStringTransformer::new(format).with_timezones(model_tz, view_tz),
        );
        if !builder.has_rule("date") {
            builder.add_rule(Rule::new(Date));
        }
        Ok(())
    }
}

/// A date-time input, formatted with the configured date-time format by
/// default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeType;

impl FieldType for DateTimeType {
    fn name(&self) -> &str {
        "datetime"
    }

    fn parent(&self) -> Option<&str> {
        Some("date")
    }

    fn configure_options(&self, resolver: &mut OptionsResolver, context: &BuildContext) {
        resolver.set_default("format", context.settings().datetime_format.clone());
    }
}
