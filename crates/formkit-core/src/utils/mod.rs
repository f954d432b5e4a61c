//! Utility functions for formkit.
//!
//! - [`text`]: String helpers (humanizing field names, message interpolation, HTML escaping).
//! - [`dates`]: Date format translation and lenient date parsing.

pub mod dates;
pub mod text;
