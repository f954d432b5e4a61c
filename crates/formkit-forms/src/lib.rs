//! # formkit-forms
//!
//! Typed form trees. Fields are declared by type name with an options map;
//! options are validated against the type's resolver when the field is
//! built. On submission, raw request values run backwards through each
//! field's transformer chain into model values, which are then validated.
//! Views run the chain forwards to produce display strings.
//!
//! ## Modules
//!
//! - [`options`] - [`OptionsResolver`] and structural type tags
//! - [`transformers`] - [`DataTransformer`] and the built-in transformers
//! - [`types`] - Field types, the [`TypeRegistry`], and [`FieldDescriptor`]s
//! - [`builder`] - [`BuildContext`] and [`FormBuilder`]
//! - [`form`] - The [`Form`] tree: data, submission, validation, errors
//! - [`mapper`] - Property paths and the [`DataMapper`] between parents and children
//! - [`errors`] - [`FormError`] and [`ErrorList`]
//! - [`csrf`] - CSRF token manager and stores
//! - [`request`] - URL-encoded request decoding
//! - [`interfaces`] - Collaborator traits: renderer, theme, data provider, translator
//! - [`view`] - [`FormView`], the render-ready snapshot of a form
//! - [`render`] - [`FormRenderer`] and the built-in HTML renderer
//! - [`providers`] - An in-memory data provider
//!
//! ## Example
//!
//! ```
//! use formkit_core::Value;
//! use formkit_forms::BuildContext;
//! use serde_json::json;
//!
//! let context = BuildContext::default();
//! let mut builder = context.create_form_builder("signup").unwrap();
//! builder
//!     .add_email("email", json!({"required": true}))
//!     .unwrap()
//!     .add_integer("age", json!({"constraints": "between:18,100"}))
//!     .unwrap();
//!
//! let mut form = builder.get_form().unwrap();
//! form.submit(Value::from(json!({"email": "ann@example.com", "age": "15"}))).unwrap();
//!
//! assert!(!form.is_valid());
//! let errors = form.get_errors(true).to_flat_map();
//! assert_eq!(errors["age"], ["The age must be between 18 and 100."]);
//! assert_eq!(form.get_data().get("age"), Some(&Value::Int(15)));
//! ```

pub mod builder;
pub mod csrf;
pub mod errors;
pub mod form;
pub mod interfaces;
pub mod mapper;
pub mod options;
pub mod providers;
pub mod render;
pub mod request;
pub mod transformers;
pub mod types;
pub mod view;

pub use builder::{BuildContext, FormBuilder};
pub use csrf::{CsrfTokenManager, MemoryTokenStore, TokenStore};
pub use errors::{ErrorList, FormError};
pub use form::{Form, FormState};
pub use interfaces::{CsrfTokenProvider, DataProvider, Renderer, Theme, Translator};
pub use mapper::{DataMapper, PropertyPath, PropertyPathMapper};
pub use options::{IntoOptions, Options, OptionsResolver};
pub use render::{DefaultTheme, FormRenderer, HtmlRenderer};
pub use transformers::{DataTransformer, TransformerChain};
pub use types::{DataSourceKind, FieldDescriptor, FieldType, TypeRegistry};
pub use view::{ChoiceView, FormView};
