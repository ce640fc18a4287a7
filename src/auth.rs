use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{AppError, Result};

/// Identity carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Issue a signed bearer token for a user.
///
/// Token format: `base64url(claims_json) . base64url(hmac_sha256_tag)`.
pub fn issue_token(secret: &str, user_id: &str) -> Result<String> {
    let claims = TokenClaims {
        user_id: user_id.to_string(),
        issued_at: Utc::now(),
    };

    let payload = serde_json::to_vec(&claims)
        .map_err(|e| AppError::Validation(format!("Cannot encode token: {}", e)))?;
    let tag = hmac_sha256::HMAC::mac(&payload, secret.as_bytes());

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// Verify a bearer token and return its claims.
///
/// Uses `hmac_sha256::HMAC::verify` so the tag comparison is constant-time.
pub fn verify_token(secret: &str, token: &str) -> Result<TokenClaims> {
    let invalid = || AppError::Unauthorized("Invalid token".to_string());

    let (payload_b64, tag_b64) = token.split_once('.').ok_or_else(invalid)?;

    let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| invalid())?;
    let tag = URL_SAFE_NO_PAD.decode(tag_b64).map_err(|_| invalid())?;

    let tag_array: [u8; 32] = tag.try_into().map_err(|_| invalid())?;
    if !hmac_sha256::HMAC::verify(&payload, secret.as_bytes(), &tag_array) {
        return Err(invalid());
    }

    serde_json::from_slice(&payload).map_err(|_| invalid())
}

/// Pull the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(header: &str) -> Result<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".to_string()))
}

/// Fresh random salt for a new account.
pub fn generate_salt() -> String {
    Ulid::new().to_string()
}

/// Salted password hash, stored next to the salt.
pub fn hash_password(password: &str, salt: &str) -> String {
    let tag = hmac_sha256::HMAC::mac(password.as_bytes(), salt.as_bytes());
    URL_SAFE_NO_PAD.encode(tag)
}

/// Constant-time password check against the stored salt + hash.
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    let Ok(stored) = URL_SAFE_NO_PAD.decode(stored_hash) else {
        return false;
    };
    let Ok(tag_array) = <[u8; 32]>::try_from(stored) else {
        return false;
    };
    hmac_sha256::HMAC::verify(password.as_bytes(), salt.as_bytes(), &tag_array)
}
