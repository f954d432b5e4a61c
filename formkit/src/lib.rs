//! # formkit
//!
//! Typed form processing for Rust.
//!
//! This is the meta-crate that re-exports the formkit crates. Depend on
//! `formkit` to get everything, or on the individual crates for finer
//! control.
//!
//! ## Example
//!
//! ```
//! use formkit::prelude::*;
//! use serde_json::json;
//!
//! let context = BuildContext::default();
//! let mut builder = context.create_form_builder("contact").unwrap();
//! builder
//!     .add_email("email", json!({"required": true}))
//!     .unwrap()
//!     .add_textarea("message", json!({"constraints": "required|min:10"}))
//!     .unwrap();
//! let mut form = builder.get_form().unwrap();
//!
//! form.handle_urlencoded("contact[email]=ann%40example.com&contact[message]=hi").unwrap();
//! assert!(!form.is_valid());
//! assert_eq!(
//!     form.get_errors(true).to_flat_map()["message"],
//!     ["The message must be at least 10 characters."]
//! );
//! ```

/// Values, errors, settings, logging and signing.
pub use formkit_core as core;

/// Constraints, rule strings and the data validator.
#[cfg(feature = "validation")]
pub use formkit_validation as validation;

/// Options, transformers, field types, form trees, CSRF and rendering.
#[cfg(feature = "forms")]
pub use formkit_forms as forms;

/// The types most applications need.
pub mod prelude {
    pub use formkit_core::{FormSettings, FormkitError, FormkitResult, Value};

    #[cfg(feature = "validation")]
    pub use formkit_validation::{FieldRules, Rule, Severity, Validator};

    #[cfg(feature = "forms")]
    pub use formkit_forms::{
        BuildContext, CsrfTokenManager, ErrorList, Form, FormBuilder, FormError, FormRenderer,
        FormView, MemoryTokenStore, TypeRegistry,
    };
}
