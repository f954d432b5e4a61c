//! Name-to-type resolution with a cached inheritance chain.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use formkit_core::{FormkitError, FormkitResult};

use super::{
    ButtonType, CheckboxType, ChoiceType, DateTimeType, DateType, EmailType, FieldBaseType,
    FieldType, FileType, FormType, GenericType, HiddenType, IntegerType, NumberType,
    PasswordType, RadioType, ResetType, ResolvedType, SearchType, SelectType, SubmitType,
    TelType, TextType, TextareaType, UrlType,
};

/// The type unknown names fall back to.
pub const GENERIC_TYPE: &str = "generic";

/// Registered field types, looked up by name.
///
/// Resolution walks parent names up to a root type. Resolved chains are
/// cached; registering a type clears the cache.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn FieldType>>,
    cache: RwLock<HashMap<String, Arc<ResolvedType>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in type.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        registry
            .register(FieldBaseType)
            .register(FormType)
            .register(GenericType)
            .register(ButtonType)
            .register(SubmitType)
            .register(ResetType)
            .register(TextType)
            .register(TextareaType)
            .register(EmailType)
            .register(PasswordType)
            .register(UrlType)
            .register(TelType)
            .register(SearchType)
            .register(HiddenType)
            .register(CheckboxType)
            .register(FileType)
            .register(NumberType)
            .register(IntegerType)
            .register(DateType)
            .register(DateTimeType)
            .register(ChoiceType)
            .register(SelectType)
            .register(RadioType);
        registry
    }

    /// Registers a type, replacing any type of the same name.
    pub fn register(&mut self, field_type: impl FieldType + 'static) -> &mut Self {
        self.register_arc(Arc::new(field_type))
    }

    /// Registers a shared type.
    pub fn register_arc(&mut self, field_type: Arc<dyn FieldType>) -> &mut Self {
        self.types.insert(field_type.name().to_string(), field_type);
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self
    }

    /// Returns `true` if a type is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns the type registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn FieldType>> {
        self.types.get(name).cloned()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves a type name to its chain.
    ///
    /// Unknown names resolve to [`GENERIC_TYPE`] with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::UnknownType`] if a parent is missing, the
    /// hierarchy has a cycle, or the name is unknown and no generic type is
    /// registered.
    pub fn resolve(&self, name: &str) -> FormkitResult<Arc<ResolvedType>> {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(hit));
        }

        let leaf = if self.has(name) {
            name
        } else if self.has(GENERIC_TYPE) {
            tracing::warn!(field_type = name, "unknown field type, using generic");
            GENERIC_TYPE
        } else {
            return Err(FormkitError::UnknownType(name.to_string()));
        };

        let resolved = Arc::new(ResolvedType::new(name, self.chain(leaf)?));
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Walks from `leaf` to its root, returning the chain root first.
    fn chain(&self, leaf: &str) -> FormkitResult<Vec<Arc<dyn FieldType>>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(leaf.to_string());

        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                return Err(FormkitError::UnknownType(format!(
                    "{leaf} (inheritance cycle through \"{name}\")"
                )));
            }
            let field_type = self.get(&name).ok_or_else(|| {
                FormkitError::UnknownType(format!("{name} (ancestor of \"{leaf}\")"))
            })?;
            current = field_type.parent().map(str::to_string);
            chain.push(field_type);
        }

        chain.reverse();
        Ok(chain)
    }
}
