use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{oid::ObjectId, DateTime};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

const RESET_TOKEN_BYTES: usize = 20;
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub iat: usize,
    pub exp: usize,
}

pub fn sign_token(user_id: &ObjectId, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_hex(),
        iat: now.timestamp().max(0) as usize,
        exp: (now + ttl).timestamp().max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|err| AppError::Internal(format!("Failed to sign token: {err}")))
}

/// Verifies an HS256 token. Expired tokens map to "Please log in again".
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// A password reset token: `raw` goes out by email, `hashed` is stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub raw: String,
    pub hashed: String,
    pub expires: DateTime,
}

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let raw: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();

        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        Self {
            hashed: hash_reset_token(&raw),
            raw,
            expires: DateTime::from_millis(expires.timestamp_millis()),
        }
    }
}

pub fn hash_reset_token(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn signed_tokens_verify() {
        let id = ObjectId::new();
        let token = sign_token(&id, SECRET, Duration::days(30)).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, id.to_hex());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn forged_and_expired_tokens_fail() {
        let id = ObjectId::new();
        let forged = sign_token(&id, "another-secret", Duration::days(1)).unwrap();
        let err = verify_token(&forged, SECRET).unwrap_err();
        assert_eq!(err.to_string(), "Not authorized to access this route");

        let expired = sign_token(&id, SECRET, Duration::minutes(-5)).unwrap();
        let err = verify_token(&expired, SECRET).unwrap_err();
        assert_eq!(err.to_string(), "Please log in again");

        assert!(verify_token("garbage", SECRET).is_err());
    }

    #[test]
    fn reset_token_stores_only_the_digest() {
        let token = ResetToken::generate();
        assert_eq!(token.raw.len(), RESET_TOKEN_BYTES * 2);
        assert_eq!(token.hashed.len(), 64);
        assert_eq!(token.hashed, hash_reset_token(&token.raw));
        assert_ne!(token.hashed, token.raw);
        assert!(token.expires > DateTime::now());
    }
}
