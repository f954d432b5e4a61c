//! Library-wide settings.
//!
//! [`FormSettings`] holds the defaults every form-generation run starts from:
//! locale-dependent number and date formats, CSRF configuration, and logging.
//! Settings are plain data passed explicitly to the build context; there is
//! no global instance.

use serde::{Deserialize, Serialize};

/// The complete set of formkit settings.
///
/// # Examples
///
/// ```
/// use formkit_core::settings::FormSettings;
///
/// let settings = FormSettings::default();
/// assert_eq!(settings.csrf_field_name, "_token");
/// assert_eq!(settings.date_format, "Y-m-d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logging).
    pub debug: bool,
    /// The log filter directive (e.g. "info", "formkit_forms=debug").
    pub log_level: String,
    /// The secret key used to sign CSRF tokens.
    pub secret_key: String,

    // ── CSRF ─────────────────────────────────────────────────────────

    /// Whether root forms embed and check a CSRF token by default.
    pub csrf_protection: bool,
    /// The name of the hidden CSRF field.
    pub csrf_field_name: String,
    /// How long a generated token stays valid, in seconds.
    pub csrf_token_ttl: u64,

    // ── Formats ──────────────────────────────────────────────────────

    /// Default format for date fields.
    pub date_format: String,
    /// Default format for date-time fields.
    pub datetime_format: String,
    /// Decimal separator for number fields.
    pub decimal_separator: String,
    /// Thousands separator for number fields.
    pub thousands_separator: String,
    /// Default number of decimal places for number fields.
    pub number_precision: u32,
    /// Offset of the display timezone, in seconds east of UTC.
    pub time_zone_offset: i32,

    // ── Presentation ─────────────────────────────────────────────────

    /// The locale passed to the translator.
    pub locale: String,
    /// The theme name handed to renderers.
    pub theme: String,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            secret_key: String::new(),
            csrf_protection: false,
            csrf_field_name: "_token".to_string(),
            csrf_token_ttl: 7200,
            date_format: "Y-m-d".to_string(),
            datetime_format: "Y-m-d H:i:s".to_string(),
            decimal_separator: ".".to_string(),
            thousands_separator: ",".to_string(),
            number_precision: 2,
            time_zone_offset: 0,
            locale: "en".to_string(),
            theme: "default".to_string(),
        }
    }
}

impl FormSettings {
    /// Returns the display timezone as a `FixedOffset`, falling back to UTC
    /// when the configured offset is out of range.
    pub fn time_zone(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.time_zone_offset).unwrap_or_else(utc)
    }
}

/// The UTC offset.
pub fn utc() -> chrono::FixedOffset {
    use chrono::Offset;
    chrono::Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = FormSettings::default();
        assert!(s.debug);
        assert!(!s.csrf_protection);
        assert_eq!(s.csrf_token_ttl, 7200);
        assert_eq!(s.decimal_separator, ".");
        assert_eq!(s.thousands_separator, ",");
        assert_eq!(s.number_precision, 2);
    }

    #[test]
    fn test_time_zone() {
        let mut s = FormSettings::default();
        assert_eq!(s.time_zone().local_minus_utc(), 0);
        s.time_zone_offset = 3600;
        assert_eq!(s.time_zone().local_minus_utc(), 3600);
        s.time_zone_offset = 999_999;
        assert_eq!(s.time_zone().local_minus_utc(), 0);
    }

    #[test]
    fn test_serde_partial() {
        let s: FormSettings = serde_json::from_str(r#"{"locale": "de"}"#).unwrap();
        assert_eq!(s.locale, "de");
        assert_eq!(s.csrf_field_name, "_token");
    }
}
