//! HMAC signing for tokens handed to clients.
//!
//! [`Signer`] appends an HMAC-SHA256 signature to a value so that tampered or
//! forged values can be rejected without a store lookup. CSRF tokens are
//! signed with the form id as salt, which keeps a token issued for one form
//! from validating against another.
//!
//! ## Key Rotation
//!
//! [`Signer`] supports `fallback_keys`. When verifying, the primary key is
//! tried first, then each fallback key in order.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// The separator used between value and signature.
const DEFAULT_SEP: &str = ":";

/// A signed value could not be verified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The value does not contain the separator.
    #[error("No separator found in signed value")]
    NoSeparator,
    /// No key produced a matching signature.
    #[error("Signature verification failed")]
    Mismatch,
}

/// Signs and verifies strings using HMAC-SHA256.
///
/// # Examples
///
/// ```
/// use formkit_core::signing::Signer;
///
/// let signer = Signer::new("my-secret-key").with_salt("registration");
/// let signed = signer.sign("token");
/// assert_eq!(signer.unsign(&signed).unwrap(), "token");
/// assert!(Signer::new("my-secret-key").unsign(&signed).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Signer {
    key: String,
    fallback_keys: Vec<String>,
    sep: String,
    salt: String,
}

impl Signer {
    /// Creates a new `Signer` with the given secret key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fallback_keys: Vec::new(),
            sep: DEFAULT_SEP.to_string(),
            salt: "formkit.signing.Signer".to_string(),
        }
    }

    /// Sets fallback keys for key rotation.
    #[must_use]
    pub fn with_fallback_keys(mut self, keys: Vec<String>) -> Self {
        self.fallback_keys = keys;
        self
    }

    /// Sets the separator between value and signature.
    #[must_use]
    pub fn with_sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    /// Sets the salt for the HMAC.
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    fn make_signature(&self, value: &str, key: &str) -> String {
        let salted_key = format!("{}:{}", self.salt, key);
        let mut mac =
            HmacSha256::new_from_slice(salted_key.as_bytes()).expect("HMAC accepts any key size");
        mac.update(value.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Signs a value, returning `"value:signature"`.
    pub fn sign(&self, value: &str) -> String {
        let sig = self.make_signature(value, &self.key);
        format!("{}{}{}", value, self.sep, sig)
    }

    /// Verifies and returns the original value from a signed string.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is missing or no key matches.
    pub fn unsign(&self, signed_value: &str) -> Result<String, SignatureError> {
        let (value, sig) = signed_value
            .rsplit_once(&self.sep)
            .ok_or(SignatureError::NoSeparator)?;

        let matches = std::iter::once(&self.key)
            .chain(&self.fallback_keys)
            .any(|key| constant_time_eq(sig, &self.make_signature(value, key)));

        if matches {
            Ok(value.to_string())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_sign_unsign() {
        let signer = Signer::new("test-secret");
        let signed = signer.sign("hello");
        assert!(signed.starts_with("hello:"));
        assert_eq!(signer.unsign(&signed).unwrap(), "hello");
    }

    #[test]
    fn test_signer_tampered_value() {
        let signer = Signer::new("test-secret");
        let signed = signer.sign("hello");
        let tampered = signed.replace("hello", "hacked");
        assert_eq!(signer.unsign(&tampered), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_signer_wrong_key() {
        let signed = Signer::new("key1").sign("hello");
        assert!(Signer::new("key2").unsign(&signed).is_err());
    }

    #[test]
    fn test_signer_salt_isolates() {
        let a = Signer::new("k").with_salt("form-a");
        let b = Signer::new("k").with_salt("form-b");
        assert!(b.unsign(&a.sign("tok")).is_err());
    }

    #[test]
    fn test_signer_no_separator() {
        let signer = Signer::new("test-secret");
        assert_eq!(signer.unsign("noseparator"), Err(SignatureError::NoSeparator));
    }

    #[test]
    fn test_signer_custom_sep() {
        let signer = Signer::new("test-secret").with_sep("!");
        let signed = signer.sign("a:b");
        assert_eq!(signer.unsign(&signed).unwrap(), "a:b");
    }

    #[test]
    fn test_signer_fallback_keys() {
        let old = Signer::new("old-key");
        let signed = old.sign("hello");
        let rotated = Signer::new("new-key").with_fallback_keys(vec!["old-key".to_string()]);
        assert_eq!(rotated.unsign(&signed).unwrap(), "hello");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
