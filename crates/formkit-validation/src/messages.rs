//! Default message templates for the built-in constraints.
//!
//! Templates use `{{ placeholder }}` tokens. `{{ field }}` is always
//! available and resolves to the humanized field name (or its attribute
//! override); the other placeholders are set by the constraint that reports
//! the violation.

pub const REQUIRED: &str = "The {{ field }} field is required.";

pub const STRING: &str = "The {{ field }} must be a string.";
pub const INTEGER: &str = "The {{ field }} must be an integer.";
pub const NUMERIC: &str = "The {{ field }} must be a number.";
pub const BOOLEAN: &str = "The {{ field }} field must be true or false.";
pub const ARRAY: &str = "The {{ field }} must be an array.";

pub const MIN_NUMERIC: &str = "The {{ field }} must be at least {{ min }}.";
pub const MIN_STRING: &str = "The {{ field }} must be at least {{ min }} characters.";
pub const MIN_ARRAY: &str = "The {{ field }} must have at least {{ min }} items.";

pub const MAX_NUMERIC: &str = "The {{ field }} may not be greater than {{ max }}.";
pub const MAX_STRING: &str = "The {{ field }} may not be greater than {{ max }} characters.";
pub const MAX_ARRAY: &str = "The {{ field }} may not have more than {{ max }} items.";

pub const BETWEEN_NUMERIC: &str = "The {{ field }} must be between {{ min }} and {{ max }}.";
pub const BETWEEN_STRING: &str =
    "The {{ field }} must be between {{ min }} and {{ max }} characters.";
pub const BETWEEN_ARRAY: &str = "The {{ field }} must have between {{ min }} and {{ max }} items.";

pub const SIZE_NUMERIC: &str = "The {{ field }} must be {{ size }}.";
pub const SIZE_STRING: &str = "The {{ field }} must be {{ size }} characters.";
pub const SIZE_ARRAY: &str = "The {{ field }} must contain {{ size }} items.";

pub const REGEX: &str = "The {{ field }} format is invalid.";
pub const IN: &str = "The selected {{ field }} is invalid.";
pub const NOT_IN: &str = "The selected {{ field }} is invalid.";

pub const EMAIL: &str = "The {{ field }} must be a valid email address.";
pub const URL: &str = "The {{ field }} must be a valid URL.";
pub const IP: &str = "The {{ field }} must be a valid IP address.";
pub const IPV4: &str = "The {{ field }} must be a valid IPv4 address.";
pub const IPV6: &str = "The {{ field }} must be a valid IPv6 address.";
pub const ALPHA: &str = "The {{ field }} may only contain letters.";
pub const ALPHA_NUM: &str = "The {{ field }} may only contain letters and numbers.";
pub const ALPHA_DASH: &str =
    "The {{ field }} may only contain letters, numbers, dashes and underscores.";
pub const UUID: &str = "The {{ field }} must be a valid UUID.";
pub const JSON: &str = "The {{ field }} must be a valid JSON string.";

pub const DIGITS: &str = "The {{ field }} must be {{ digits }} digits.";
pub const DIGITS_BETWEEN: &str = "The {{ field }} must be between {{ min }} and {{ max }} digits.";

pub const DATE: &str = "The {{ field }} is not a valid date.";
pub const DATE_FORMAT: &str = "The {{ field }} does not match the format {{ format }}.";
pub const AFTER: &str = "The {{ field }} must be a date after {{ date }}.";
pub const AFTER_OR_EQUAL: &str = "The {{ field }} must be a date after or equal to {{ date }}.";
pub const BEFORE: &str = "The {{ field }} must be a date before {{ date }}.";
pub const BEFORE_OR_EQUAL: &str = "The {{ field }} must be a date before or equal to {{ date }}.";

pub const CONFIRMED: &str = "The {{ field }} confirmation does not match.";
pub const SAME: &str = "The {{ field }} and {{ other }} must match.";
pub const DIFFERENT: &str = "The {{ field }} and {{ other }} must be different.";
