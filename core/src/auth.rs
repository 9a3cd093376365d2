//! Bearer credential verification.
//!
//! Tokens are HS256 JWTs carrying the user id in `sub`. Only the signature
//! and the expiry are checked.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::UserId;

pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `user` valid for `ttl` from now.
    pub fn issue(&self, user: UserId, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Storage(anyhow::anyhow!("failed to sign token: {e}")))
    }

    /// Resolve a credential to the user it was issued for.
    ///
    /// Absence, a bad signature, an expired token and a malformed subject all
    /// collapse to `Unauthenticated`.
    pub fn resolve_identity(&self, credential: Option<&str>) -> Result<UserId> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Error::Unauthenticated)?;
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            Error::Unauthenticated
        })?;
        data.claims
            .sub
            .parse::<i64>()
            .map(UserId::from_raw)
            .map_err(|_| Error::Unauthenticated)
    }
}
