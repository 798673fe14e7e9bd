//! Signed access/refresh token pairs (HS256).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub jti: String,
    pub token_type: TokenType,
    /// On access tokens, the jti of the refresh token (session) they belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid)
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Wrong token type")]
    WrongType,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub access: String,
    pub refresh: String,
    pub refresh_jti: String,
    pub refresh_expires_at: DateTime<Utc>,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::minutes(config.access_token_minutes),
            Duration::hours(config.refresh_token_hours),
        )
    }

    pub fn issue_pair(&self, user_id: i32) -> Result<IssuedPair, TokenError> {
        let now = Utc::now();
        let subject = user_id.to_string();
        let refresh_jti = Uuid::new_v4().to_string();
        let refresh_expires_at = now + self.refresh_ttl;

        let refresh_claims = Claims {
            sub: subject.clone(),
            jti: refresh_jti.clone(),
            token_type: TokenType::Refresh,
            sid: None,
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        };

        let access_claims = Claims {
            sub: subject,
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
            sid: Some(refresh_jti.clone()),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        Ok(IssuedPair {
            access: self.encode(&access_claims)?,
            refresh: self.encode(&refresh_claims)?,
            refresh_jti,
            refresh_expires_at,
        })
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature, expiry and the expected token type.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongType);
        }

        Ok(data.claims)
    }
}
