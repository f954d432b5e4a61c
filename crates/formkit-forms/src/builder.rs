//! Building form trees.
//!
//! A [`BuildContext`] bundles everything field types need while they are
//! being configured: the type registry, settings, and the optional CSRF,
//! translation and data collaborators. A [`FormBuilder`] collects child
//! fields, resolving each one's options as soon as it is added, and turns
//! them into a [`Form`] tree.
//!
//! ```
//! use formkit_forms::builder::BuildContext;
//! use serde_json::json;
//!
//! let context = BuildContext::default();
//! let mut builder = context.create_form_builder("contact").unwrap();
//! builder
//!     .add_text("name", json!({"constraints": "required|max:80"}))
//!     .unwrap()
//!     .add_email("email", json!({"required": true}))
//!     .unwrap();
//!
//! let form = builder.get_form().unwrap();
//! assert_eq!(form.get("email").unwrap().full_name(), "contact[email]");
//! ```

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use formkit_core::{FormSettings, FormkitError, FormkitResult, Value};
use formkit_validation::constraints::Callback;
use formkit_validation::{ExecutionContext, FieldRules, Rule};

use crate::form::Form;
use crate::interfaces::{CsrfTokenProvider, DataProvider, Translator};
use crate::mapper::DataMapper;
use crate::options::{IntoOptions, Options};
use crate::types::{choices_to_value, DataSourceKind, FieldDescriptor, ResolvedType, TypeRegistry};

// ============================================================
// BuildContext
// ============================================================

/// Shared services and settings for building forms.
///
/// Cloning is cheap; every form node keeps a clone.
#[derive(Clone)]
pub struct BuildContext {
    id: Uuid,
    registry: Arc<TypeRegistry>,
    settings: Arc<FormSettings>,
    csrf: Option<Arc<dyn CsrfTokenProvider>>,
    translator: Option<Arc<dyn Translator>>,
    provider: Option<Arc<dyn DataProvider>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("id", &self.id)
            .field("types", &self.registry.names().len())
            .field("csrf", &self.csrf.is_some())
            .field("translator", &self.translator.is_some())
            .field("provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(FormSettings::default())
    }
}

impl BuildContext {
    /// Creates a context with the built-in types and no collaborators.
    pub fn new(settings: FormSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry: Arc::new(TypeRegistry::with_builtin_types()),
            settings: Arc::new(settings),
            csrf: None,
            translator: None,
            provider: None,
        }
    }

    /// Replaces the type registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the CSRF token provider.
    #[must_use]
    pub fn with_csrf_provider(mut self, provider: Arc<dyn CsrfTokenProvider>) -> Self {
        self.csrf = Some(provider);
        self
    }

    /// Sets the translator used for labels and error messages in views.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Sets the data provider used by provider-backed choices.
    #[must_use]
    pub fn with_data_provider(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// A unique id for this context, used in log records.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The settings.
    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// The CSRF token provider, if any.
    pub fn csrf_provider(&self) -> Option<&dyn CsrfTokenProvider> {
        self.csrf.as_deref()
    }

    /// The translator, if any.
    pub fn translator(&self) -> Option<&dyn Translator> {
        self.translator.as_deref()
    }

    /// The data provider, if any.
    pub fn data_provider(&self) -> Option<&dyn DataProvider> {
        self.provider.as_deref()
    }

    /// Resolves a type name through the registry.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::UnknownType`] if the hierarchy is broken.
    pub fn resolve_type(&self, type_name: &str) -> FormkitResult<Arc<ResolvedType>> {
        self.registry.resolve(type_name)
    }

    /// Builds a standalone field descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the type does not resolve, the options do not
    /// resolve, or a rule string is invalid.
    pub fn create_field(
        &self,
        name: &str,
        type_name: &str,
        options: impl IntoOptions,
    ) -> FormkitResult<FieldDescriptor> {
        check_name(name)?;
        self.resolve_type(type_name)?
            .build(name, &options.into_options(), self)
    }

    /// Creates a builder for a compound form of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the field cannot be built, or
    /// [`FormkitError::ConfigurationError`] if the type is not compound.
    pub fn create_builder(
        &self,
        name: &str,
        type_name: &str,
        options: impl IntoOptions,
    ) -> FormkitResult<FormBuilder> {
        let descriptor = self.resolve_type(type_name)?.build(name, &options.into_options(), self)?;
        if !descriptor.is_compound() {
            return Err(FormkitError::ConfigurationError(format!(
                "type \"{type_name}\" is not compound and cannot hold fields"
            )));
        }
        Ok(FormBuilder::from_descriptor(self.clone(), descriptor))
    }

    /// Creates a builder for a plain `form`.
    ///
    /// # Errors
    ///
    /// Returns an error if the form type cannot be built.
    pub fn create_form_builder(&self, name: &str) -> FormkitResult<FormBuilder> {
        self.create_builder(name, "form", ())
    }
}

fn check_name(name: &str) -> FormkitResult<()> {
    if name.contains(['.', '[', ']']) {
        return Err(FormkitError::ConfigurationError(format!(
            "field name \"{name}\" must not contain '.', '[' or ']'"
        )));
    }
    Ok(())
}

// ============================================================
// FormBuilder
// ============================================================

#[derive(Debug, Clone)]
enum Child {
    Field(FieldDescriptor),
    Form(FormBuilder),
}

impl Child {
    fn name(&self) -> &str {
        match self {
            Self::Field(descriptor) => descriptor.name(),
            Self::Form(builder) => builder.descriptor.name(),
        }
    }
}

/// Collects the children of a compound form.
///
/// Options are resolved when a child is added, so misconfiguration fails at
/// the `add` call rather than at submission. Adding a name twice replaces
/// the earlier child in place. A cloned builder yields independent forms.
#[derive(Debug, Clone)]
pub struct FormBuilder {
    context: BuildContext,
    descriptor: FieldDescriptor,
    children: Vec<Child>,
    form_rules: Vec<Rule>,
    data_mapper: Option<Arc<dyn DataMapper>>,
}

impl FormBuilder {
    fn from_descriptor(context: BuildContext, descriptor: FieldDescriptor) -> Self {
        Self {
            context,
            descriptor,
            children: Vec::new(),
            form_rules: Vec::new(),
            data_mapper: None,
        }
    }

    /// The form's own descriptor.
    pub const fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// The build context.
    pub const fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Returns `true` if a child named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name() == name)
    }

    /// The child names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.children.iter().map(Child::name).collect()
    }

    /// Removes a child, returning `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.name() != name);
        before != self.children.len()
    }

    fn insert(&mut self, child: Child) {
        match self.children.iter().position(|c| c.name() == child.name()) {
            Some(index) => {
                tracing::debug!(field = child.name(), "replacing field");
                self.children[index] = child;
            }
            None => self.children.push(child),
        }
    }

    /// Adds a child of any registered type.
    ///
    /// # Errors
    ///
    /// Returns an error if the options do not resolve for the type, a rule
    /// string is invalid, or the name is malformed.
    pub fn add(
        &mut self,
        name: &str,
        type_name: &str,
        options: impl IntoOptions,
    ) -> FormkitResult<&mut Self> {
        let descriptor = self.context.create_field(name, type_name, options)?;
        let child = if descriptor.is_compound() {
            Child::Form(Self::from_descriptor(self.context.clone(), descriptor))
        } else {
            Child::Field(descriptor)
        };
        self.insert(child);
        Ok(self)
    }

    /// Adds a single-line text field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_text(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "text", options)
    }

    /// Adds a multi-line text field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_textarea(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "textarea", options)
    }

    /// Adds an email field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_email(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "email", options)
    }

    /// Adds a password field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_password(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "password", options)
    }

    /// Adds a URL field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_url(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "url", options)
    }

    /// Adds a localized number field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_number(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "number", options)
    }

    /// Adds an integer field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_integer(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "integer", options)
    }

    /// Adds a date field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_date(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "date", options)
    }

    /// Adds a date-time field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_datetime(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "datetime", options)
    }

    /// Adds a checkbox.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_checkbox(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "checkbox", options)
    }

    /// Adds a drop-down list; pass the choices in the `choices` option.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_select(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "select", options)
    }

    /// Adds a radio group; pass the choices in the `choices` option.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_radio(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "radio", options)
    }

    /// Adds a hidden field.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_hidden(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "hidden", options)
    }

    /// Adds a file upload.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_file(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "file", options)
    }

    /// Adds a submit button.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`add`](Self::add).
    pub fn add_submit(&mut self, name: &str, options: impl IntoOptions) -> FormkitResult<&mut Self> {
        self.add(name, "submit", options)
    }

    /// Adds a drop-down list whose choices are loaded from `source` now.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be loaded, or under the same
    /// conditions as [`add`](Self::add).
    pub fn add_select_from(
        &mut self,
        name: &str,
        source: &DataSourceKind,
        options: impl IntoOptions,
    ) -> FormkitResult<&mut Self> {
        let pairs = source.load(self.context.data_provider())?;
        let mut options: Options = options.into_options();
        options.insert("choices".to_string(), choices_to_value(&pairs));
        self.add(name, "select", options)
    }

    /// Adds a nested form, letting `build` populate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the nested form or any of its children fail to
    /// build.
    pub fn add_form<F>(&mut self, name: &str, options: impl IntoOptions, build: F) -> FormkitResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> FormkitResult<()>,
    {
        check_name(name)?;
        let mut nested = self.context.create_builder(name, "form", options)?;
        build(&mut nested)?;
        self.insert(Child::Form(nested));
        Ok(self)
    }

    /// Adds a rule checked against this form's whole data.
    pub fn add_constraint(&mut self, rule: Rule) -> &mut Self {
        self.form_rules.push(rule);
        self
    }

    /// Adds form-level rules parsed from a rule string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn add_constraints(&mut self, rules: &str) -> FormkitResult<&mut Self> {
        self.form_rules.extend(FieldRules::parse(rules)?.rules().iter().cloned());
        Ok(self)
    }

    /// Adds a named callback run against this form's whole data.
    ///
    /// Violations it adds without [`at_path`](formkit_validation::ViolationBuilder::at_path)
    /// belong to the form itself.
    pub fn add_callback<F>(&mut self, name: &str, callback: F) -> &mut Self
    where
        F: Fn(&Value, &mut ExecutionContext<'_>) + Send + Sync + 'static,
    {
        self.add_constraint(Rule::new(Callback::new(name, callback)))
    }

    /// Replaces the data mapper of this form.
    pub fn set_data_mapper(&mut self, mapper: impl DataMapper + 'static) -> &mut Self {
        self.data_mapper = Some(Arc::new(mapper));
        self
    }

    /// Builds the form tree and applies every `data` option.
    ///
    /// When CSRF protection is on, a hidden, unmapped token field is added
    /// to the root form.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::ConfigurationError`] if CSRF protection is on
    /// without a token provider, or an error if initial data cannot be
    /// transformed.
    pub fn get_form(mut self) -> FormkitResult<Form> {
        self.add_csrf_field()?;
        let context = self.context.clone();
        let mut form = self.into_node(String::new(), None);
        form.initialize()?;
        tracing::debug!(
            form = form.name(),
            context = %context.id(),
            fields = form.children().len(),
            "built form"
        );
        Ok(form)
    }

    fn add_csrf_field(&mut self) -> FormkitResult<()> {
        if !self
            .descriptor
            .option("csrf_protection")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(());
        }
        if self.context.csrf_provider().is_none() {
            return Err(FormkitError::ConfigurationError(
                "CSRF protection is enabled but no token provider is configured".to_string(),
            ));
        }
        let field_name = self
            .descriptor
            .option("csrf_field_name")
            .and_then(Value::as_str)
            .unwrap_or(&self.context.settings().csrf_field_name)
            .to_string();
        if !self.has(&field_name) {
            self.add_hidden(&field_name, [("mapped", false)])?;
        }
        Ok(())
    }

    fn into_node(self, path: String, parent_full_name: Option<&str>) -> Form {
        let full_name = child_full_name(parent_full_name, self.descriptor.name());
        let mut form = Form::new(Arc::new(self.descriptor), path.clone(), full_name.clone(), self.context.clone());
        if let Some(mapper) = self.data_mapper {
            form.set_mapper(mapper);
        }
        form.set_form_rules(self.form_rules);

        for child in self.children {
            let child_path = if path.is_empty() {
                child.name().to_string()
            } else {
                format!("{path}.{}", child.name())
            };
            let node = match child {
                Child::Field(descriptor) => {
                    let name = child_full_name(Some(&full_name), descriptor.name());
                    Form::new(Arc::new(descriptor), child_path, name, self.context.clone())
                }
                Child::Form(builder) => builder.into_node(child_path, Some(&full_name)),
            };
            form.push_child(node);
        }
        form
    }
}

/// `user` + `email` gives `user[email]`; an unnamed parent adds no prefix.
fn child_full_name(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}[{name}]"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::{CsrfTokenManager, MemoryTokenStore};
    use serde_json::json;

    #[test]
    fn test_options_fail_at_add() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("f").unwrap();
        let err = builder.add_text("name", json!({"lable": "Name"})).unwrap_err();
        assert!(matches!(err, FormkitError::Options(_)));
        assert!(err.to_string().contains("lable"));
        assert!(!builder.has("name"));
    }

    #[test]
    fn test_bad_constraints_fail_at_add() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("f").unwrap();
        let err = builder.add_text("name", json!({"constraints": "requird"})).unwrap_err();
        assert!(matches!(err, FormkitError::UnknownRule(_)));
    }

    #[test]
    fn test_add_replaces_in_place() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("f").unwrap();
        builder
            .add_text("a", ())
            .unwrap()
            .add_text("b", ())
            .unwrap()
            .add_email("a", ())
            .unwrap();
        assert_eq!(builder.names(), ["a", "b"]);
        assert!(builder.remove("b"));
        assert!(!builder.remove("b"));
    }

    #[test]
    fn test_malformed_name_rejected() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("f").unwrap();
        assert!(builder.add_text("a.b", ()).is_err());
        assert!(builder.add_text("a[0]", ()).is_err());
    }

    #[test]
    fn test_non_compound_builder_rejected() {
        let context = BuildContext::default();
        let err = context.create_builder("x", "text", ()).unwrap_err();
        assert!(matches!(err, FormkitError::ConfigurationError(_)));
    }

    #[test]
    fn test_paths_and_full_names() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("user").unwrap();
        builder
            .add_form("address", (), |address| {
                address.add_text("city", ())?;
                Ok(())
            })
            .unwrap();
        let form = builder.get_form().unwrap();
        let city = form.get("address.city").unwrap();
        assert_eq!(city.path(), "address.city");
        assert_eq!(city.full_name(), "user[address][city]");
        assert_eq!(city.id(), "user_address_city");
    }

    #[test]
    fn test_unnamed_root_full_names() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("").unwrap();
        builder.add_text("q", ()).unwrap();
        let form = builder.get_form().unwrap();
        assert_eq!(form.get("q").unwrap().full_name(), "q");
    }

    #[test]
    fn test_csrf_requires_provider() {
        let context = BuildContext::default();
        let builder = context
            .create_builder("f", "form", json!({"csrf_protection": true}))
            .unwrap();
        assert!(matches!(
            builder.get_form(),
            Err(FormkitError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_csrf_field_added_unmapped() {
        let manager = CsrfTokenManager::new(Arc::new(MemoryTokenStore::new()), "k");
        let context = BuildContext::default().with_csrf_provider(Arc::new(manager));
        let builder = context
            .create_builder("f", "form", json!({"csrf_protection": true}))
            .unwrap();
        let form = builder.get_form().unwrap();
        let token = form.get("_token").unwrap();
        assert!(!token.is_mapped());
        assert!(token.descriptor().is_type("hidden"));
    }

    #[test]
    fn test_select_from_rows() {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("f").unwrap();
        let source = DataSourceKind::rows(
            vec![
                Value::map([("id", Value::from("u")), ("name", Value::from("User"))]),
                Value::map([("id", Value::from("a")), ("name", Value::from("Admin"))]),
            ],
            "id",
            "name",
        );
        builder.add_select_from("role", &source, ()).unwrap();
        let form = builder.get_form().unwrap();
        assert_eq!(
            form.get("role").unwrap().descriptor().choices(),
            [
                ("u".to_string(), "User".to_string()),
                ("a".to_string(), "Admin".to_string())
            ]
        );
    }
}
