//! Settings loading from configuration files.
//!
//! This module loads [`FormSettings`] from TOML and JSON files and applies
//! environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FORMKIT_SECRET_KEY` | `secret_key` |
//! | `FORMKIT_DEBUG` | `debug` |
//! | `FORMKIT_LOG_LEVEL` | `log_level` |
//! | `FORMKIT_CSRF_PROTECTION` | `csrf_protection` |
//! | `FORMKIT_CSRF_FIELD_NAME` | `csrf_field_name` |
//! | `FORMKIT_CSRF_TOKEN_TTL` | `csrf_token_ttl` |
//! | `FORMKIT_LOCALE` | `locale` |
//! | `FORMKIT_THEME` | `theme` |
//! | `FORMKIT_TIME_ZONE_OFFSET` | `time_zone_offset` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use formkit_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("config/forms.toml").unwrap();
//! let settings = settings_loader::from_toml_file_with_env("config/forms.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::FormkitError;
use crate::settings::FormSettings;

/// Loads settings from a TOML string. Keys not present keep their defaults.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<FormSettings, FormkitError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormkitError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<FormSettings, FormkitError> {
    let content = read_file(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<FormSettings, FormkitError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string. Keys not present keep their defaults.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<FormSettings, FormkitError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormkitError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<FormSettings, FormkitError> {
    let content = read_file(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> FormSettings {
    let mut settings = FormSettings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `FORMKIT_*` environment variable overrides to a settings struct.
///
/// Values that fail to parse (e.g. a non-numeric TTL) are ignored.
pub fn apply_env_overrides(settings: &mut FormSettings) {
    if let Ok(val) = std::env::var("FORMKIT_SECRET_KEY") {
        settings.secret_key = val;
    }

    if let Ok(val) = std::env::var("FORMKIT_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("FORMKIT_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("FORMKIT_CSRF_PROTECTION") {
        settings.csrf_protection = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("FORMKIT_CSRF_FIELD_NAME") {
        settings.csrf_field_name = val;
    }

    if let Ok(val) = std::env::var("FORMKIT_CSRF_TOKEN_TTL") {
        if let Ok(ttl) = val.parse::<u64>() {
            settings.csrf_token_ttl = ttl;
        }
    }

    if let Ok(val) = std::env::var("FORMKIT_LOCALE") {
        settings.locale = val;
    }

    if let Ok(val) = std::env::var("FORMKIT_THEME") {
        settings.theme = val;
    }

    if let Ok(val) = std::env::var("FORMKIT_TIME_ZONE_OFFSET") {
        if let Ok(offset) = val.parse::<i32>() {
            settings.time_zone_offset = offset;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_file(path: &Path, kind: &str) -> Result<String, FormkitError> {
    std::fs::read_to_string(path).map_err(|e| {
        FormkitError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

/// Deep-merges a parsed document over the serialized defaults and
/// deserializes the result.
fn merge_over_defaults(
    document: serde_json::Value,
    kind: &str,
) -> Result<FormSettings, FormkitError> {
    let default_json = serde_json::to_value(FormSettings::default()).map_err(|e| {
        FormkitError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, document);
    serde_json::from_value(merged).map_err(|e| {
        FormkitError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            secret_key = "s3cret"
            debug = false
            decimal_separator = ","
            thousands_separator = "."
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.secret_key, "s3cret");
        assert!(!settings.debug);
        assert_eq!(settings.decimal_separator, ",");
        assert_eq!(settings.thousands_separator, ".");
        // Defaults preserved
        assert_eq!(settings.csrf_field_name, "_token");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, FormSettings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("this is not toml = = =");
        assert!(matches!(result, Err(FormkitError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let result = from_toml_str("csrf_token_ttl = \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json_str() {
        let settings =
            from_json_str(r#"{"number_precision": 3, "csrf_protection": true}"#).unwrap();
        assert_eq!(settings.number_precision, 3);
        assert!(settings.csrf_protection);
        assert_eq!(settings.locale, "en");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = from_toml_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(FormkitError::ConfigurationError(msg)) if msg.contains("here.toml")));
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": 1});
        let over = serde_json::json!({"a": {"y": 3}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 3}, "b": 1}));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("off"));
    }
}
