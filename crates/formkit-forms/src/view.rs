//! Render-ready snapshots of form trees.
//!
//! A [`FormView`] holds everything a template needs for one node: names
//! and ids, the translated label and errors, the view value, choices with
//! their selection state, and the child views. Views are plain data and
//! serialize to the context handed to a [`Renderer`](crate::interfaces::Renderer).

use std::collections::BTreeMap;

use serde::Serialize;

use formkit_core::utils::text::interpolate;
use formkit_core::{FormkitError, FormkitResult, Value};

use crate::form::Form;

/// One option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    /// The submitted value.
    pub value: String,
    /// The display label.
    pub label: String,
    /// Whether the current view value selects this option.
    pub selected: bool,
}

/// The view of one form node.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    /// The field name.
    pub name: String,
    /// The HTML name, e.g. `user[email]`.
    pub full_name: String,
    /// The HTML id, e.g. `user_email`.
    pub id: String,
    /// The translated label.
    pub label: String,
    /// The view value; null for compound forms and empty passwords.
    pub value: Value,
    /// The translated messages of this node's own errors.
    pub errors: Vec<String>,
    /// Type names from root to leaf.
    pub block_prefixes: Vec<String>,
    /// A prefix unique to this field, e.g. `_user_email`.
    pub unique_block_prefix: String,
    /// The HTML input type.
    pub input_type: String,
    /// HTML attributes.
    pub attr: BTreeMap<String, Value>,
    /// Help text.
    pub help: Option<String>,
    /// Placeholder of choice fields.
    pub placeholder: Option<String>,
    /// Whether a value is required.
    pub required: bool,
    /// Whether the field is disabled.
    pub disabled: bool,
    /// Whether the node holds children.
    pub compound: bool,
    /// Whether several choices may be selected.
    pub multiple: bool,
    /// Whether choices render as radio buttons or checkboxes.
    pub expanded: bool,
    /// Whether a checkbox is checked.
    pub checked: bool,
    /// The options of a choice field.
    pub choices: Vec<ChoiceView>,
    /// Whether the form was submitted.
    pub submitted: bool,
    /// Whether the node and its descendants are free of blocking errors.
    pub valid: bool,
    /// The child views in order.
    pub children: Vec<FormView>,
}

impl FormView {
    /// Builds the view of `form` and its descendants. The root's CSRF field
    /// receives a live token.
    pub(crate) fn build(form: &Form) -> FormkitResult<Self> {
        let mut view = Self::from_node(form);
        if let (Some(field), Some(provider)) = (form.csrf_field_name(), form.context().csrf_provider()) {
            let token = provider.generate_token(&form.csrf_token_id())?;
            if let Some(child) = view.children.iter_mut().find(|c| c.name == field) {
                child.value = Value::String(token);
            }
        }
        Ok(view)
    }

    fn from_node(form: &Form) -> Self {
        let descriptor = form.descriptor();
        let context = form.context();
        let locale = context.settings().locale.as_str();
        let translate = |text: &str, params: &BTreeMap<String, String>| match context.translator() {
            Some(translator) => translator.trans(text, params, Some(locale)),
            None => interpolate(text, params),
        };

        let option_str = |key: &str| descriptor.option(key).and_then(Value::as_str).map(str::to_string);
        let option_bool = |key: &str| descriptor.option(key).and_then(Value::as_bool).unwrap_or(false);

        let value = if form.is_compound() || option_bool("always_empty") {
            Value::Null
        } else {
            form.get_view_data()
        };
        let checked = descriptor.is_type("checkbox")
            && option_str("value").is_some_and(|on| value.as_str() == Some(on.as_str()));
        let choices = descriptor
            .choices()
            .into_iter()
            .map(|(choice, label)| ChoiceView {
                selected: is_selected(&value, &choice),
                label: translate(&label, &BTreeMap::new()),
                value: choice,
            })
            .collect();
        let errors = form
            .errors()
            .iter()
            .map(|error| match context.translator() {
                Some(_) => translate(&error.template, &error.parameters),
                None => error.message.clone(),
            })
            .collect();

        Self {
            name: form.name().to_string(),
            full_name: form.full_name().to_string(),
            id: form.id(),
            label: translate(descriptor.label(), &BTreeMap::new()),
            errors,
            block_prefixes: descriptor.block_prefixes().to_vec(),
            unique_block_prefix: format!("_{}", form.id()),
            input_type: input_type(descriptor.block_prefixes()).to_string(),
            attr: descriptor
                .option("attr")
                .and_then(Value::as_map)
                .cloned()
                .unwrap_or_default(),
            help: option_str("help").map(|help| translate(&help, &BTreeMap::new())),
            placeholder: option_str("placeholder").map(|p| translate(&p, &BTreeMap::new())),
            required: descriptor.is_required(),
            disabled: descriptor.is_disabled(),
            compound: form.is_compound(),
            multiple: option_bool("multiple"),
            expanded: option_bool("expanded"),
            checked,
            choices,
            submitted: form.is_submitted(),
            valid: form.is_valid(),
            value,
            children: form.children().iter().map(Self::from_node).collect(),
        }
    }

    /// Returns the direct child view named `name`.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Serializes the view to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::SerializationError`] if serialization fails.
    pub fn to_json(&self) -> FormkitResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| FormkitError::SerializationError(e.to_string()))
    }

    /// Converts the view into a template context.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::SerializationError`] if serialization fails.
    pub fn to_context(&self) -> FormkitResult<Value> {
        self.to_json().map(Value::from)
    }
}

fn is_selected(value: &Value, choice: &str) -> bool {
    match value {
        Value::List(items) => items.iter().any(|item| item.to_view_string() == choice),
        Value::Null => false,
        other => other.to_view_string() == choice,
    }
}

/// The HTML input type for the most specific known block prefix.
pub fn input_type(block_prefixes: &[String]) -> &'static str {
    block_prefixes
        .iter()
        .rev()
        .find_map(|prefix| match prefix.as_str() {
            "checkbox" => Some("checkbox"),
            "radio" => Some("radio"),
            "choice" | "select" => Some("select"),
            "textarea" => Some("textarea"),
            "email" => Some("email"),
            "password" => Some("password"),
            "url" => Some("url"),
            "tel" => Some("tel"),
            "search" => Some("search"),
            "hidden" => Some("hidden"),
            "file" => Some("file"),
            "integer" => Some("number"),
            "date" => Some("date"),
            "submit" => Some("submit"),
            "reset" => Some("reset"),
            "button" => Some("button"),
            "form" => Some("form"),
            "text" | "number" | "datetime" => Some("text"),
            _ => None,
        })
        .unwrap_or("text")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::BuildContext;
    use crate::csrf::{CsrfTokenManager, MemoryTokenStore};
    use crate::interfaces::{CatalogTranslator, CsrfTokenProvider};
    use serde_json::json;

    #[test]
    fn test_input_types() {
        let prefixes = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(input_type(&prefixes(&["field", "text", "email"])), "email");
        assert_eq!(input_type(&prefixes(&["field", "number", "integer"])), "number");
        assert_eq!(input_type(&prefixes(&["field", "date", "datetime"])), "text");
        assert_eq!(input_type(&prefixes(&["field", "generic", "colorpicker"])), "text");
        assert_eq!(input_type(&prefixes(&["button", "submit"])), "submit");
    }

    #[test]
    fn test_view_values_and_choices() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("user").unwrap();
        builder
            .add_text("name", json!({"required": true, "help": "Your full name"}))
            .unwrap()
            .add_password("password", ())
            .unwrap()
            .add_select("role", json!({"choices": {"admin": "Admin", "user": "User"}}))
            .unwrap()
            .add_checkbox("active", ())
            .unwrap();
        let mut form = builder.get_form().unwrap();
        form.set_data(Value::from(json!({"name": "Ada", "password": "secret", "role": "user", "active": true})))
            .unwrap();

        let view = form.create_view().unwrap();
        assert!(view.compound);
        assert_eq!(view.value, Value::Null);

        let name = view.child("name").unwrap();
        assert_eq!(name.full_name, "user[name]");
        assert_eq!(name.id, "user_name");
        assert_eq!(name.label, "Name");
        assert_eq!(name.value, Value::from("Ada"));
        assert_eq!(name.help.as_deref(), Some("Your full name"));
        assert!(name.required);

        assert_eq!(view.child("password").unwrap().value, Value::Null);
        assert_eq!(view.child("password").unwrap().input_type, "password");

        let role = view.child("role").unwrap();
        assert_eq!(role.input_type, "select");
        let selected: Vec<&str> = role
            .choices
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(selected, ["user"]);

        assert!(view.child("active").unwrap().checked);
    }

    #[test]
    fn test_view_errors_are_translated() {
        let mut translator = CatalogTranslator::new("de");
        translator.add("de", "The {{ field }} field is required.", "{{ field }} fehlt.");
        translator.add("de", "Name", "Vorname");
        let settings = formkit_core::FormSettings {
            locale: "de".to_string(),
            ..Default::default()
        };
        let context = BuildContext::new(settings).with_translator(Arc::new(translator));
        let mut builder = context.create_form_builder("f").unwrap();
        builder.add_text("name", json!({"required": true})).unwrap();
        let mut form = builder.get_form().unwrap();
        form.submit(Value::from(json!({}))).unwrap();

        let view = form.create_view().unwrap();
        let name = view.child("name").unwrap();
        assert_eq!(name.label, "Vorname");
        assert_eq!(name.errors, ["name fehlt."]);
        assert!(!name.valid);
        assert!(name.submitted);
    }

    #[test]
    fn test_csrf_field_gets_token() {
        let manager = Arc::new(CsrfTokenManager::new(Arc::new(MemoryTokenStore::new()), "k"));
        let context = BuildContext::default().with_csrf_provider(manager.clone());
        let builder = context
            .create_builder("login", "form", json!({"csrf_protection": true}))
            .unwrap();
        let form = builder.get_form().unwrap();
        let view = form.create_view().unwrap();
        let token = view.child("_token").unwrap().value.as_str().unwrap().to_string();
        assert!(manager.is_token_valid("login", &token));
        assert_eq!(view.child("_token").unwrap().input_type, "hidden");
    }

    #[test]
    fn test_to_context_is_map() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("f").unwrap();
        builder.add_text("q", ()).unwrap();
        let view = builder.get_form().unwrap().create_view().unwrap();
        let ctx = view.to_context().unwrap();
        assert_eq!(ctx.get("name"), Some(&Value::from("f")));
        assert!(ctx.get("children").and_then(Value::as_list).is_some_and(|c| c.len() == 1));
    }
}
