//! Bearer credential held in storage.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// The opaque bearer token identifying a session.
///
/// Implements `Debug` manually so the token never ends up in logs.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a raw token, trimming surrounding whitespace.
    ///
    /// Returns `None` for a blank token, which counts as no credential.
    #[must_use]
    pub fn new(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(SecretString::from(token.to_string())))
        }
    }

    /// The raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}
