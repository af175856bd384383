use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;

use messagely_types::api::Claims;

use crate::identity::CallerIdentity;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed, wrongly signed, or expired. Never retried.
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Issue time plus lifetime falls outside the representable calendar.
    #[error("token lifetime out of range")]
    Lifetime,
}

/// Issues and verifies HS256 identity tokens over a shared secret.
///
/// A token binds only the username (`sub`) plus issue and expiry times.
/// There is no server-side session: validity is the signature and `exp`.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `username`. Call only once the username has been
    /// authenticated or freshly registered.
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now())
    }

    fn issue_at(&self, username: &str, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::Lifetime)?;

        let claims = Claims {
            sub: username.to_string(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<CallerIdentity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            TokenError::Invalid(e)
        })?;

        Ok(CallerIdentity::new(data.claims.sub))
    }
}
