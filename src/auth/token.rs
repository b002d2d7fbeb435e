use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::AuthConfig;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Signs and verifies time-bound claims with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(
        secret: &str,
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        let algorithm = Algorithm::from_str(&config.jwt_algorithm).map_err(|_| {
            AppError::ConfigError(format!("unsupported JWT algorithm '{}'", config.jwt_algorithm))
        })?;

        Ok(Self::new(
            &config.jwt_secret,
            algorithm,
            Duration::minutes(config.access_token_expire_minutes),
            Duration::days(config.refresh_token_expire_days),
        ))
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue(&self, subject: &str, token_type: TokenType, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Token encoding failed: {}", e)))
    }

    pub fn issue_access(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, TokenType::Access, self.access_ttl)
    }

    pub fn issue_refresh(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, TokenType::Refresh, self.refresh_ttl)
    }

    /// Bad signature, expiry, malformed input and a type other than
    /// `expected` all collapse into `AuthError::InvalidToken`.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AuthError::InvalidToken
            })?
            .claims;

        if claims.token_type != expected {
            tracing::debug!(
                "Token rejected: expected {:?} token, got {:?}",
                expected,
                claims.token_type
            );
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn codec() -> TokenCodec {
        TokenCodec::new("test_secret", Algorithm::HS256, Duration::minutes(30), Duration::days(7))
    }

    #[test]
    fn test_access_token_decodes_as_access() {
        let codec = codec();
        let token = codec.issue_access("user-1").unwrap();
        let claims = codec.decode(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let codec = codec();
        let access = codec.issue_access("user-1").unwrap();
        let refresh = codec.issue_refresh("user-1").unwrap();

        assert_eq!(codec.decode(&access, TokenType::Refresh), Err(AuthError::InvalidToken));
        assert_eq!(codec.decode(&refresh, TokenType::Access), Err(AuthError::InvalidToken));
        assert_ok!(codec.decode(&refresh, TokenType::Refresh));
        assert_ok!(codec.decode(&access, TokenType::Access));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = codec();
        let token = codec
            .issue("user-1", TokenType::Access, Duration::seconds(-5))
            .unwrap();
        assert_eq!(codec.decode(&token, TokenType::Access), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = TokenCodec::new("other_secret", Algorithm::HS256, Duration::minutes(30), Duration::days(7));
        let token = other.issue_access("user-1").unwrap();
        assert_eq!(codec().decode(&token, TokenType::Access), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_err!(codec().decode("not.a.jwt", TokenType::Access));
        assert_err!(codec().decode("", TokenType::Refresh));
    }

    #[test]
    fn test_refresh_ttl_is_days() {
        let codec = codec();
        let token = codec.issue_refresh("user-1").unwrap();
        let claims = codec.decode(&token, TokenType::Refresh).unwrap();
        assert!(claims.exp - claims.iat >= Duration::days(7).num_seconds() - 1);
    }

    #[test]
    fn test_claims_wire_format() {
        let claims = Claims {
            sub: "abc".into(),
            exp: 10,
            iat: 1,
            token_type: TokenType::Refresh,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "refresh");
    }
}
