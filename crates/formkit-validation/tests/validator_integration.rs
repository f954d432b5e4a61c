//! Integration tests for formkit-validation.
//!
//! These exercise the validator end to end: rule strings in, error maps or
//! validated data out.

use std::collections::BTreeMap;

use formkit_core::{FormkitError, Value};
use formkit_validation::constraints::Callback;
use formkit_validation::{Rule, Severity, Validator};
use serde_json::json;

fn registration_validator() -> Validator {
    Validator::from_rules([
        ("username", "required|alpha_num|between:3,20"),
        ("email", "required|email"),
        ("password", "required|min:8"),
        ("age", "integer|between:18,100"),
        ("role", "required|in:user,admin"),
    ])
    .unwrap()
}

fn valid_registration() -> serde_json::Value {
    json!({
        "username": "johndoe42",
        "email": "john@example.com",
        "password": "correct-horse",
        "age": 30,
        "role": "user"
    })
}

// ── Registration scenario ───────────────────────────────────────────

#[test]
fn test_registration_valid_payload_returns_exactly_declared_keys() {
    let validator = registration_validator();
    let payload = valid_registration();

    let validated = validator.validate_data(&Value::from(payload.clone())).unwrap();

    let keys: Vec<&str> = validated.keys().map(String::as_str).collect();
    assert_eq!(keys, ["age", "email", "password", "role", "username"]);
    // Values come back unmodified.
    let as_json = Value::Map(validated).to_json();
    assert_eq!(as_json, payload);
}

#[test]
fn test_registration_extra_keys_are_dropped() {
    let validator = registration_validator();
    let mut payload = valid_registration();
    payload["is_admin"] = json!(true);
    payload["password_confirmation"] = json!("correct-horse");

    let validated = validator.validate_data(&Value::from(payload)).unwrap();
    assert_eq!(validated.len(), 5);
    assert!(!validated.contains_key("is_admin"));
}

#[test]
fn test_registration_bad_age_and_role() {
    let validator = registration_validator();
    let mut payload = valid_registration();
    payload["age"] = json!(15);
    payload["role"] = json!("superadmin");

    let errors = validator.validate_data(&Value::from(payload)).unwrap_err();

    let keys: Vec<&str> = errors.errors().keys().map(String::as_str).collect();
    assert_eq!(keys, ["age", "role"]);
    assert_eq!(errors.field("age"), ["The age must be between 18 and 100."]);
    assert_eq!(errors.field("role"), ["The selected role is invalid."]);
}

#[test]
fn test_registration_age_as_submitted_string() {
    // Browsers submit everything as strings; `integer` makes `between` numeric.
    let validator = registration_validator();
    let mut payload = valid_registration();
    payload["age"] = json!("17");

    let errors = validator.validate_data(&Value::from(payload)).unwrap_err();
    assert_eq!(errors.field("age"), ["The age must be between 18 and 100."]);
}

#[test]
fn test_registration_age_is_optional() {
    let validator = registration_validator();
    let mut payload = valid_registration();
    payload.as_object_mut().unwrap().remove("age");

    let validated = validator.validate_data(&Value::from(payload)).unwrap();
    assert_eq!(validated.len(), 4);
}

// ── Aggregation ─────────────────────────────────────────────────────

#[test]
fn test_n_invalid_fields_produce_n_entries() {
    let validator = registration_validator();
    let payload = json!({
        "username": "x",
        "email": "not-an-email",
        "password": "short",
        "age": "old",
        "role": "root"
    });

    let errors = validator.validate_data(&Value::from(payload)).unwrap_err();
    assert_eq!(errors.len(), 5);
    // `age` fails both `integer` and the length fallback of `between`.
    assert_eq!(errors.field("age")[0], "The age must be an integer.");
}

#[test]
fn test_empty_submission_reports_every_required_field() {
    let validator = registration_validator();
    let errors = validator.validate_data(&Value::from(json!({}))).unwrap_err();

    let keys: Vec<&str> = errors.errors().keys().map(String::as_str).collect();
    assert_eq!(keys, ["email", "password", "role", "username"]);
    // Only `required` fires for a missing value.
    for key in keys {
        assert_eq!(errors.field(key).len(), 1, "{key}");
    }
}

// ── Custom messages and cross-field rules ───────────────────────────

#[test]
fn test_custom_message_overrides_one_pair_only() {
    let validator = registration_validator().with_messages([(
        "username.between",
        "Usernames are {{ min }} to {{ max }} characters long.",
    )]);
    let mut payload = valid_registration();
    payload["username"] = json!("jo");
    payload["password"] = json!("short");

    let errors = validator.validate_data(&Value::from(payload)).unwrap_err();
    assert_eq!(
        errors.field("username"),
        ["Usernames are 3 to 20 characters long."]
    );
    assert_eq!(
        errors.field("password"),
        ["The password must be at least 8 characters."]
    );
}

#[test]
fn test_password_confirmation() {
    let validator = Validator::from_rules([("password", "required|min:8|confirmed")]).unwrap();

    let ok = json!({"password": "long-enough", "password_confirmation": "long-enough"});
    let validated = validator.validate_data(&Value::from(ok)).unwrap();
    assert_eq!(validated.len(), 1);

    let mismatch = json!({"password": "long-enough", "password_confirmation": "different"});
    let errors = validator.validate_data(&Value::from(mismatch)).unwrap_err();
    assert_eq!(
        errors.field("password"),
        ["The password confirmation does not match."]
    );
}

#[test]
fn test_callback_reports_against_other_field() {
    let mut validator = Validator::new();
    validator.add_field("country", "required").unwrap();
    validator.add_field("state", "string").unwrap();
    validator.add_callback("state_for_us", |data, ctx| {
        let is_us = data.get("country").and_then(Value::as_str) == Some("US");
        let has_state = data.get("state").is_some_and(|s| !s.is_empty());
        if is_us && !has_state {
            ctx.build_violation("A state is required for US addresses.")
                .at_path("state")
                .add_violation();
        }
    });

    let errors = validator
        .validate_data(&Value::from(json!({"country": "US"})))
        .unwrap_err();
    assert_eq!(errors.field("state"), ["A state is required for US addresses."]);

    assert!(validator
        .validate_data(&Value::from(json!({"country": "NO"})))
        .is_ok());
}

#[test]
fn test_advisory_rule_is_reported_but_not_blocking() {
    let mut validator = Validator::from_rules([("password", "required|min:8")]).unwrap();
    validator.add_rule(
        "password",
        Rule::new(Callback::new("strength", |value, ctx| {
            let text = value.as_str().unwrap_or_default();
            if !text.chars().any(|c| c.is_ascii_digit()) {
                ctx.build_violation("Consider adding a digit to your {{ field }}.")
                    .add_violation();
            }
        }))
        .with_severity(Severity::Warning),
    );

    let data = Value::from(json!({"password": "long-enough"}));
    assert!(validator.validate_data(&data).is_ok());

    let violations = validator.validate(&data);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Warning);
    assert_eq!(
        violations[0].message,
        "Consider adding a digit to your password."
    );
}

#[test]
fn test_unknown_rule_is_a_configuration_error() {
    let err = Validator::from_rules([("email", "required|emial")]).unwrap_err();
    assert!(matches!(err, FormkitError::UnknownRule(ref name) if name == "emial"));
    assert!(!err.is_user_error());
}

#[test]
fn test_rules_given_as_lists() {
    let mut rules: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    rules.insert("pet", vec!["required", "regex:/^(cat|dog)$/"]);
    let validator = Validator::from_rules(rules).unwrap();

    assert!(validator
        .validate_data(&Value::from(json!({"pet": "dog"})))
        .is_ok());
    let errors = validator
        .validate_data(&Value::from(json!({"pet": "cow"})))
        .unwrap_err();
    assert_eq!(errors.field("pet"), ["The pet format is invalid."]);
}
