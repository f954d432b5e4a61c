//! Field types.
//!
//! A [`FieldType`] declares the options it accepts and configures the
//! transformers and rules of fields built from it. Types form a single
//! inheritance hierarchy by name: every type but the root names a parent,
//! and building a field runs the whole chain from the root down so a child
//! type layers its behavior on top of its parent's.
//!
//! The [`TypeRegistry`] resolves names to chains once and caches them.

mod base;
mod choice;
mod date;
mod input;
mod number;
mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use formkit_core::utils::text::label_from_name;
use formkit_core::{FormkitResult, Value};
use formkit_validation::{FieldRules, IntoFieldRules, Rule};

use crate::builder::BuildContext;
use crate::options::{Options, OptionsResolver};
use crate::transformers::{DataTransformer, TransformerChain};

pub use self::base::{
    ButtonType, FieldBaseType, FormType, GenericType, ResetType, SubmitType, EXTRA_FIELDS_MESSAGE,
};
pub use self::choice::{
    choice_pairs, choices_to_value, ChoiceType, DataSourceKind, RadioType, SelectType,
};
pub use self::date::{DateTimeType, DateType};
pub use self::input::{
    CheckboxType, EmailType, FileType, HiddenType, PasswordType, SearchType, TelType, TextType,
    TextareaType, UrlType,
};
pub use self::number::{IntegerType, NumberType};
pub use self::registry::{TypeRegistry, GENERIC_TYPE};

/// A named field type.
pub trait FieldType: Send + Sync + fmt::Debug {
    /// The type name used in registries and block prefixes.
    fn name(&self) -> &str;

    /// The parent type name. Root types return `None`.
    fn parent(&self) -> Option<&str> {
        Some("field")
    }

    /// Declares this type's options on top of those of its parents.
    fn configure_options(&self, _resolver: &mut OptionsResolver, _context: &BuildContext) {}

    /// Adds this type's transformers and rules to a field under construction.
    ///
    /// # Errors
    ///
    /// Returns an error if an option cannot be turned into a transformer or
    /// rule.
    fn build_field(
        &self,
        _builder: &mut FieldBuilder,
        _options: &Options,
        _context: &BuildContext,
    ) -> FormkitResult<()> {
        Ok(())
    }
}

/// A field type together with its resolved ancestor chain.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    requested: String,
    chain: Vec<Arc<dyn FieldType>>,
}

impl ResolvedType {
    pub(crate) fn new(requested: impl Into<String>, chain: Vec<Arc<dyn FieldType>>) -> Self {
        Self {
            requested: requested.into(),
            chain,
        }
    }

    /// The name the type was requested under.
    pub fn name(&self) -> &str {
        &self.requested
    }

    /// The name of the type that actually resolved. Differs from
    /// [`name`](Self::name) when an unknown name fell back to `generic`.
    pub fn inner_name(&self) -> &str {
        self.chain.last().map_or("", |t| t.name())
    }

    /// The parent of the resolved type.
    pub fn parent_name(&self) -> Option<&str> {
        self.chain.last().and_then(|t| t.parent())
    }

    /// Returns `true` if this type fell back to `generic`.
    pub fn is_fallback(&self) -> bool {
        self.requested != self.inner_name()
    }

    /// The type names from root to leaf, used to select templates.
    pub fn block_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.chain.iter().map(|t| t.name().to_string()).collect();
        if self.is_fallback() {
            prefixes.push(self.requested.clone());
        }
        prefixes
    }

    /// Builds an options resolver holding every option of the chain.
    pub fn options_resolver(&self, context: &BuildContext) -> OptionsResolver {
        let mut resolver = OptionsResolver::new();
        for field_type in &self.chain {
            field_type.configure_options(&mut resolver, context);
        }
        resolver
    }

    /// Resolves `options` and builds a field descriptor named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::Options`](formkit_core::FormkitError::Options)
    /// if the options do not resolve, or any error a type raises while
    /// building.
    pub fn build(
        &self,
        name: &str,
        options: &Options,
        context: &BuildContext,
    ) -> FormkitResult<FieldDescriptor> {
        let resolved = self.options_resolver(context).resolve(options)?;
        let mut builder = FieldBuilder::new(name, self, resolved.clone());
        for field_type in &self.chain {
            field_type.build_field(&mut builder, &resolved, context)?;
        }
        tracing::debug!(
            field = name,
            field_type = self.requested.as_str(),
            transformers = builder.transformers.len(),
            rules = builder.rules.len(),
            "built field"
        );
        Ok(builder.finish())
    }
}

/// Collects a field's transformers and rules while its type chain runs.
#[derive(Debug)]
pub struct FieldBuilder {
    name: String,
    type_name: String,
    parent_type: Option<String>,
    block_prefixes: Vec<String>,
    options: Options,
    transformers: TransformerChain,
    rules: FieldRules,
    compound: bool,
}

impl FieldBuilder {
    fn new(name: &str, resolved: &ResolvedType, options: Options) -> Self {
        Self {
            name: name.to_string(),
            type_name: resolved.name().to_string(),
            parent_type: resolved.parent_name().map(str::to_string),
            block_prefixes: resolved.block_prefixes(),
            options,
            transformers: TransformerChain::new(),
            rules: FieldRules::new(),
            compound: false,
        }
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved options.
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Returns one resolved option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Sets one HTML attribute in the `attr` option unless the caller already
    /// set it.
    pub fn default_attr(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let attr = self
            .options
            .entry("attr".to_string())
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        if let Some(map) = attr.as_map_mut() {
            map.entry(key.to_string()).or_insert_with(|| value.into());
        }
        self
    }

    /// Appends a transformer.
    pub fn add_transformer(&mut self, transformer: impl DataTransformer + 'static) -> &mut Self {
        self.transformers.push(transformer);
        self
    }

    /// Drops every transformer added so far, typically by a parent type.
    pub fn reset_transformers(&mut self) -> &mut Self {
        self.transformers.clear();
        self
    }

    /// The transformers added so far.
    pub const fn transformers(&self) -> &TransformerChain {
        &self.transformers
    }

    /// Appends a rule.
    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Appends parsed rules.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule string cannot be parsed.
    pub fn add_rules(&mut self, rules: impl IntoFieldRules) -> FormkitResult<&mut Self> {
        self.rules.extend(rules.into_field_rules()?);
        Ok(self)
    }

    /// Returns `true` if a rule with the given name is attached.
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains(name)
    }

    /// Marks the field as holding children.
    pub fn set_compound(&mut self, compound: bool) -> &mut Self {
        self.compound = compound;
        self
    }

    /// Finishes the field.
    pub fn finish(self) -> FieldDescriptor {
        let label = self
            .options
            .get("label")
            .and_then(Value::as_str)
            .map_or_else(|| label_from_name(&self.name), str::to_string);
        FieldDescriptor {
            name: self.name,
            type_name: self.type_name,
            parent_type: self.parent_type,
            label,
            options: self.options,
            transformers: self.transformers,
            rules: self.rules,
            block_prefixes: self.block_prefixes,
            compound: self.compound,
        }
    }
}

/// A fully configured field: resolved options, transformers and rules.
///
/// Descriptors are immutable once built and shared by the [`Form`](crate::Form)
/// nodes created from them.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    type_name: String,
    parent_type: Option<String>,
    label: String,
    options: Options,
    transformers: TransformerChain,
    rules: FieldRules,
    block_prefixes: Vec<String>,
    compound: bool,
}

impl FieldDescriptor {
    /// The field name, unique among its siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type name the field was built from.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The parent type name.
    pub fn parent_type(&self) -> Option<&str> {
        self.parent_type.as_deref()
    }

    /// The display label: the `label` option or one derived from the name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The resolved options.
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Returns one resolved option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.option(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// The model/view transformer chain.
    pub const fn transformers(&self) -> &TransformerChain {
        &self.transformers
    }

    /// The validation rules.
    pub const fn rules(&self) -> &FieldRules {
        &self.rules
    }

    /// The type names from root to leaf.
    pub fn block_prefixes(&self) -> &[String] {
        &self.block_prefixes
    }

    /// Returns `true` if the type or one of its ancestors is `name`.
    pub fn is_type(&self, name: &str) -> bool {
        self.block_prefixes.iter().any(|p| p == name)
    }

    /// Returns `true` if the field holds children.
    pub const fn is_compound(&self) -> bool {
        self.compound
    }

    /// Returns `true` if the field must be filled in.
    pub fn is_required(&self) -> bool {
        self.flag("required", false) || self.rules.is_required()
    }

    /// Returns `true` if submissions to the field are ignored.
    pub fn is_disabled(&self) -> bool {
        self.flag("disabled", false)
    }

    /// Returns `true` if the field reads and writes its parent's data.
    pub fn is_mapped(&self) -> bool {
        self.flag("mapped", true)
    }

    /// Returns `true` if the field's errors attach to its parent.
    pub fn error_bubbling(&self) -> bool {
        self.flag("error_bubbling", false)
    }

    /// Returns `true` if submitted strings are trimmed.
    pub fn trims(&self) -> bool {
        self.flag("trim", true)
    }

    /// The value used when the submission is empty.
    pub fn empty_data(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.option("empty_data").unwrap_or(&NULL)
    }

    /// The `(value, label)` choice pairs, in declared order.
    pub fn choices(&self) -> Vec<(String, String)> {
        self.option("choices").map(choice_pairs).unwrap_or_default()
    }
}
