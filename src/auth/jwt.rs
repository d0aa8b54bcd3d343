//! JWT token generation and validation
//! Implements access token + refresh token pattern with two independent
//! secrets, so leaking one token class does not compromise the other.

use crate::{config::AppConfig, error::AppError, models::user::{Role, User}};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// User email
    pub email: String,

    /// User role
    pub role: Role,

    /// Token type (access or refresh)
    pub token_type: String,

    /// Refresh tokens carry the id of their stored record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<Uuid>,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::unauthorized("Invalid token subject"))
    }
}

/// JWT service
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_token_exp_secs: u64,
    refresh_token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let access_secret = config.security.jwt_access_secret.expose_secret();
        let refresh_secret = config.security.jwt_refresh_secret.expose_secret();

        // Ensure secrets are at least 32 bytes for HS256
        if access_secret.len() < 32 || refresh_secret.len() < 32 {
            return Err(AppError::Config(
                "JWT secrets too short (min 32 chars)".to_string(),
            ));
        }

        Ok(Self {
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_token_exp_secs: config.security.access_token_exp_secs,
            refresh_token_exp_secs: config.security.refresh_token_exp_secs,
        })
    }

    /// Generate access token
    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now + Duration::seconds(self.access_token_exp_secs as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            token_type: "access".to_string(),
            token_id: None,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::default(), &claims, &self.access_encoding_key).map_err(|e| {
            tracing::error!("Failed to encode access token: {:?}", e);
            AppError::Internal
        })
    }

    /// Generate refresh token bound to its stored record by `token_id`
    pub fn issue_refresh_token(&self, user: &User, token_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now + Duration::seconds(self.refresh_token_exp_secs as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            token_type: "refresh".to_string(),
            token_id: Some(token_id),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding_key).map_err(|e| {
            tracing::error!("Failed to encode refresh token: {:?}", e);
            AppError::Internal
        })
    }

    /// Validate access token specifically
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode(token, &self.access_decoding_key)?;

        if claims.token_type != "access" {
            tracing::debug!(
                "Token type mismatch: expected 'access', got '{}'",
                claims.token_type
            );
            return Err(AppError::unauthorized("Invalid access token"));
        }

        Ok(claims)
    }

    /// Validate refresh token specifically
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode(token, &self.refresh_decoding_key)?;

        if claims.token_type != "refresh" {
            tracing::debug!(
                "Token type mismatch: expected 'refresh', got '{}'",
                claims.token_type
            );
            return Err(AppError::invalid_refresh_token());
        }

        Ok(claims)
    }

    fn decode(&self, token: &str, key: &DecodingKey) -> Result<Claims, AppError> {
        Ok(decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::unauthorized("Invalid token")
            })?
            .claims)
    }
}
