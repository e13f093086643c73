use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::models::UserRole;
use crate::error::BridgeError;

/// Lifetime of an issued access token.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 55;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// HS256 signing material for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    keys: Arc<Keys>,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
        }
    }

    pub fn sign(&self, user_id: &str, role: UserRole) -> Result<String, BridgeError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, BridgeError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| BridgeError::InvalidSession)
    }
}

pub async fn hash_password(password: String) -> Result<String, BridgeError> {
    tokio::task::spawn_blocking(move || {
        Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .map(|hash| hash.to_string())
            .map_err(|e| BridgeError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| BridgeError::Internal(format!("password hashing task failed: {e}")))?
}

/// `Ok(false)` for a wrong password; `Err` only for unreadable stored hashes.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, BridgeError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| BridgeError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| BridgeError::Internal(format!("password verification task failed: {e}")))?
}
