//! Stateless session tokens
//!
//! Signed HS256 tokens carrying the user identity, valid for 7 days.
//! No server-side session table; verification is a pure function over
//! the token and the configured secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const TOKEN_VALIDITY_DAYS: i64 = 7;

/// Claims embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Issues and verifies signed session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// The secret is held only as derived keys and is never logged.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a verified identity, valid for 7 days.
    pub fn issue(&self, user_id: i64, email: &str) -> Result<String> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issue with an explicit clock. Lets tests produce expired tokens.
    pub fn issue_at(&self, user_id: i64, email: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign token: {e}");
            Error::Storage("Failed to issue token")
        })
    }

    /// Verify signature and expiry; malformed, tampered, and expired
    /// tokens are all rejected the same way.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| Error::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let service = TokenService::new("test-secret");
        let token = service.issue(42, "user@example.com").unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn expired_token_rejected() {
        let service = TokenService::new("test-secret");
        let token = service
            .issue_at(42, "user@example.com", Utc::now() - Duration::days(8))
            .unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let service = TokenService::new("test-secret");
        let token = service.issue(42, "user@example.com").unwrap();
        let other = TokenService::new("other-secret");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn garbage_rejected() {
        let service = TokenService::new("test-secret");
        assert!(service.verify("not-a-token").is_err());
        assert!(service.verify("").is_err());
    }
}
