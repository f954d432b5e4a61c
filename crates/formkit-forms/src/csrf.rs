//! CSRF token storage and management.
//!
//! Tokens are random 32-byte values, hex encoded and signed with
//! HMAC-SHA256 over the secret key salted with the form id. The signed token
//! is kept in a [`TokenStore`] with an expiry; validation checks the
//! signature and then compares against the stored token in constant time.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::RngCore;

use formkit_core::signing::{constant_time_eq, Signer};
use formkit_core::{FormSettings, FormkitError, FormkitResult};

use crate::interfaces::CsrfTokenProvider;

/// The length of a raw CSRF token in bytes (64 hex characters).
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// A key-value store with optional expiry.
pub trait TokenStore: Send + Sync {
    /// Returns the live value for `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores a value, expiring after `ttl` if given.
    fn set(&self, key: &str, value: String, ttl: Option<Duration>);

    /// Removes a value.
    fn delete(&self, key: &str);

    /// Drops expired entries and returns how many were removed.
    fn purge_expired(&self) -> usize;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// A mutex-guarded in-memory [`TokenStore`].
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.lock()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.lock()
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

/// Issues, stores and validates CSRF tokens.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use formkit_forms::csrf::{CsrfTokenManager, MemoryTokenStore};
/// use formkit_forms::interfaces::CsrfTokenProvider;
///
/// let manager = CsrfTokenManager::new(Arc::new(MemoryTokenStore::new()), "s3cret");
/// let token = manager.generate_token("registration").unwrap();
/// assert!(manager.is_token_valid("registration", &token));
/// assert!(!manager.is_token_valid("login", &token));
/// ```
#[derive(Clone)]
pub struct CsrfTokenManager {
    store: Arc<dyn TokenStore>,
    secret_key: String,
    ttl: Option<Duration>,
    namespace: String,
}

impl std::fmt::Debug for CsrfTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenManager")
            .field("ttl", &self.ttl)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl CsrfTokenManager {
    /// Creates a manager whose tokens never expire.
    pub fn new(store: Arc<dyn TokenStore>, secret_key: impl Into<String>) -> Self {
        Self {
            store,
            secret_key: secret_key.into(),
            ttl: None,
            namespace: "_csrf/".to_string(),
        }
    }

    /// Creates a manager from the secret key and token lifetime in `settings`.
    /// A lifetime of zero means tokens never expire.
    pub fn from_settings(store: Arc<dyn TokenStore>, settings: &FormSettings) -> Self {
        let ttl = (settings.csrf_token_ttl > 0).then(|| Duration::from_secs(settings.csrf_token_ttl));
        Self::new(store, settings.secret_key.clone()).with_ttl(ttl)
    }

    /// Sets the token lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the prefix of store keys.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn key(&self, form_id: &str) -> String {
        format!("{}{form_id}", self.namespace)
    }

    fn signer(&self, form_id: &str) -> Signer {
        Signer::new(self.secret_key.clone()).with_salt(format!("formkit.csrf.{form_id}"))
    }

    /// Replaces the form's token with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::ConfigurationError`] if no secret key is set.
    pub fn refresh_token(&self, form_id: &str) -> FormkitResult<String> {
        if self.secret_key.is_empty() {
            return Err(FormkitError::ConfigurationError(
                "a secret key is required for CSRF protection".to_string(),
            ));
        }
        let token = self.signer(form_id).sign(&random_token());
        self.store.set(&self.key(form_id), token.clone(), self.ttl);
        tracing::debug!(form_id, "issued CSRF token");
        Ok(token)
    }

    /// Forgets the form's token.
    pub fn remove_token(&self, form_id: &str) {
        self.store.delete(&self.key(form_id));
    }
}

impl CsrfTokenProvider for CsrfTokenManager {
    fn generate_token(&self, form_id: &str) -> FormkitResult<String> {
        match self.store.get(&self.key(form_id)) {
            Some(token) => Ok(token),
            None => self.refresh_token(form_id),
        }
    }

    fn is_token_valid(&self, form_id: &str, token: &str) -> bool {
        if token.is_empty() || self.signer(form_id).unsign(token).is_err() {
            return false;
        }
        self.store
            .get(&self.key(form_id))
            .is_some_and(|stored| constant_time_eq(&stored, token))
    }
}

/// Generates a random token as a 64-character hex string.
fn random_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_LENGTH];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(CSRF_TOKEN_LENGTH * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (Arc<MemoryTokenStore>, CsrfTokenManager) {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = CsrfTokenManager::new(store.clone(), "test-secret");
        (store, manager)
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, random_token());
    }

    #[test]
    fn test_generate_reuses_live_token() {
        let (_, manager) = manager();
        let first = manager.generate_token("contact").unwrap();
        assert_eq!(manager.generate_token("contact").unwrap(), first);
        assert_ne!(manager.refresh_token("contact").unwrap(), first);
    }

    #[test]
    fn test_token_is_bound_to_form() {
        let (_, manager) = manager();
        let token = manager.generate_token("contact").unwrap();
        manager.generate_token("login").unwrap();
        assert!(manager.is_token_valid("contact", &token));
        assert!(!manager.is_token_valid("login", &token));
    }

    #[test]
    fn test_forged_and_removed_tokens() {
        let (_, manager) = manager();
        let token = manager.generate_token("contact").unwrap();
        let last = if token.ends_with('A') { 'B' } else { 'A' };
        let forged = format!("{}{last}", &token[..token.len() - 1]);
        assert!(!manager.is_token_valid("contact", &forged));
        assert!(!manager.is_token_valid("contact", ""));

        manager.remove_token("contact");
        assert!(!manager.is_token_valid("contact", &token));
    }

    #[test]
    fn test_signed_by_other_key_is_rejected() {
        let (store, manager) = manager();
        let other = CsrfTokenManager::new(store, "other-secret");
        let token = other.generate_token("contact").unwrap();
        assert!(!manager.is_token_valid("contact", &token));
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let manager = CsrfTokenManager::new(Arc::new(MemoryTokenStore::new()), "");
        let err = manager.generate_token("contact").unwrap_err();
        assert!(matches!(err, FormkitError::ConfigurationError(_)));
    }

    #[test]
    fn test_store_expiry() {
        let store = MemoryTokenStore::new();
        store.set("live", "a".into(), None);
        store.set("dead", "b".into(), Some(Duration::ZERO));
        assert_eq!(store.get("live").as_deref(), Some("a"));
        assert_eq!(store.get("dead"), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_settings_ttl() {
        let settings = FormSettings {
            secret_key: "k".into(),
            csrf_token_ttl: 0,
            ..FormSettings::default()
        };
        let manager = CsrfTokenManager::from_settings(Arc::new(MemoryTokenStore::new()), &settings);
        assert_eq!(manager.ttl, None);
        assert!(manager.generate_token("f").is_ok());
    }
}
