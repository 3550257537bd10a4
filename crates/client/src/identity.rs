//! Resolving a stored credential to a user identity.
//!
//! The client never verifies tokens; that is the backend's job on every
//! request. It only reads the claims to know who is logged in and drops tokens
//! that are obviously unusable (garbled or expired).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use buen_sabor_core::{Email, Identity, UserId, UserRole};

use crate::credential::Credential;

/// Why a credential did not resolve.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The token is not three dot-separated segments.
    #[error("token is not a JWT")]
    Malformed,

    /// The payload segment is not valid base64url.
    #[error("token payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload decoded but does not describe a user.
    #[error("token claims are invalid: {0}")]
    Claims(String),

    /// The token's `exp` claim is in the past.
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Turns a credential into the identity it belongs to.
pub trait IdentityResolver: Send + Sync {
    /// Resolve `credential`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential does not identify a usable session.
    fn resolve(&self, credential: &Credential) -> Result<Identity, ResolveError>;
}

impl<F> IdentityResolver for F
where
    F: Fn(&Credential) -> Result<Identity, ResolveError> + Send + Sync,
{
    fn resolve(&self, credential: &Credential) -> Result<Identity, ResolveError> {
        self(credential)
    }
}

/// Reads the identity from the unverified payload of a JWT.
///
/// Accepts both the backend's Spanish claim names and English ones:
///
/// | field | claims |
/// |---|---|
/// | id | `id`, `userId`, falling back to a numeric `sub` |
/// | name | `nombre`, `name` |
/// | email | `email` |
/// | role | `rol`, `role` |
/// | phone | `telefono`, `phone` |
/// | active | `activo`, `active` (default `true`) |
/// | first login | `primerLogin`, `firstLogin` (default `false`) |
#[derive(Debug, Clone)]
pub struct JwtPayloadResolver {
    leeway: TimeDelta,
}

impl Default for JwtPayloadResolver {
    fn default() -> Self {
        Self::new(TimeDelta::zero())
    }
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default, alias = "userId")]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(alias = "nombre")]
    name: String,
    email: String,
    #[serde(alias = "rol")]
    role: UserRole,
    #[serde(default, alias = "telefono")]
    phone: Option<String>,
    #[serde(default = "default_active", alias = "activo")]
    active: bool,
    #[serde(default, alias = "primerLogin", alias = "firstLogin")]
    first_login: bool,
    #[serde(default)]
    exp: Option<i64>,
}

const fn default_active() -> bool {
    true
}

impl JwtPayloadResolver {
    /// Create a resolver that tolerates `leeway` of clock skew on `exp`.
    #[must_use]
    pub const fn new(leeway: TimeDelta) -> Self {
        Self { leeway }
    }

    /// Resolve against an explicit current time.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`].
    pub fn resolve_at(
        &self,
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> Result<Identity, ResolveError> {
        let mut segments = credential.expose().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ResolveError::Malformed);
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        let claims: Claims =
            serde_json::from_slice(&bytes).map_err(|e| ResolveError::Claims(e.to_string()))?;

        if let Some(exp) = claims.exp {
            let expires_at = DateTime::from_timestamp(exp, 0)
                .ok_or_else(|| ResolveError::Claims(format!("exp out of range: {exp}")))?;
            if expires_at + self.leeway <= now {
                return Err(ResolveError::Expired(expires_at));
            }
        }

        let id = claims
            .id
            .as_ref()
            .or(claims.sub.as_ref())
            .and_then(user_id_from_claim)
            .ok_or_else(|| ResolveError::Claims("missing numeric user id".to_string()))?;
        let email = Email::parse(&claims.email).map_err(|e| ResolveError::Claims(e.to_string()))?;

        Ok(Identity {
            id,
            name: claims.name,
            email,
            role: claims.role,
            phone: claims.phone.filter(|phone| !phone.trim().is_empty()),
            active: claims.active,
            first_login: claims.first_login,
        })
    }
}

impl IdentityResolver for JwtPayloadResolver {
    fn resolve(&self, credential: &Credential) -> Result<Identity, ResolveError> {
        self.resolve_at(credential, Utc::now())
    }
}

/// Accept ids sent either as numbers or as numeric strings.
fn user_id_from_claim(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()).map(UserId::new),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
