//! # formkit-core
//!
//! Core types shared by every formkit crate. This crate has no dependency on
//! the rest of the workspace and provides the foundation for validation and
//! form processing.
//!
//! ## Modules
//!
//! - [`value`] - The dynamic [`Value`] passed between transformers, validators and forms
//! - [`error`] - Error taxonomy and result aliases
//! - [`settings`] - Library-wide configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`signing`] - HMAC signing used for CSRF tokens
//! - [`utils`] - Text and date-format helpers

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod signing;
pub mod utils;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{
    BoxError, FormkitError, FormkitResult, OptionsError, TransformationError, ValidationErrors,
};
pub use settings::FormSettings;
pub use value::Value;
