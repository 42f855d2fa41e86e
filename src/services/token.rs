// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token issuance and verification (HS256 JWT).

use crate::config::MIN_SIGNING_KEY_LEN;
use crate::error::AuthError;
use crate::models::Principal;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer claim stamped on, and required of, every token.
pub const TOKEN_ISSUER: &str = "goal-tracker";

/// Token lifetime, in hours.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (principal ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

/// A freshly minted token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token Service: mints and checks stateless bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Build the service, refusing an absent or short secret.
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "token signing secret is not configured".to_string(),
            ));
        }
        if secret.len() < MIN_SIGNING_KEY_LEN {
            return Err(AuthError::Configuration(format!(
                "token signing secret must be at least {} bytes",
                MIN_SIGNING_KEY_LEN
            )));
        }

        // Expiry is checked in `verify_at` against an explicit clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "iat"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        self.issue_at(&principal.id, Utc::now())
    }

    /// Mint a token for `principal_id`, valid for 24 hours from `now`.
    pub fn issue_at(
        &self,
        principal_id: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);
        let claims = Claims {
            sub: principal_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Configuration(format!("token encoding failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    /// Verify a token and return the principal ID it carries.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AuthError::TokenInvalid
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(AuthError::TokenExpired);
        }
        if data.claims.sub.is_empty() {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_jwt_key_32_bytes_minimum!!!";

    #[test]
    fn test_new_fails_closed_without_secret() {
        assert!(matches!(
            TokenService::new(b""),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            TokenService::new(b"too-short"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_expiry_boundary() {
        let service = TokenService::new(SECRET).unwrap();
        let issued = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = service.issue_at("p-1", issued).unwrap();

        assert_eq!(token.expires_at, issued + Duration::hours(24));
        assert_eq!(
            service
                .verify_at(&token.token, issued + Duration::hours(24) - Duration::seconds(1))
                .unwrap(),
            "p-1"
        );
        assert!(matches!(
            service.verify_at(&token.token, issued + Duration::hours(24)),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let service = TokenService::new(SECRET).unwrap();
        assert!(matches!(
            service.verify("not.a.jwt"),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(service.verify(""), Err(AuthError::TokenInvalid)));
    }
}
