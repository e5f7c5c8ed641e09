//! Access tokens handed out by register/login and checked by the `CurrentUser` extractor.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token expired")]
    Expired,
}

pub fn create_access_token(
    secret: &[u8],
    user_id: &str,
    email: &str,
    expires_in_hours: u64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expires_in_hours as i64);

    let claims = AccessClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )?;

    Ok(token)
}

pub fn verify_access_token(secret: &[u8], token: &str) -> Result<AccessClaims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data =
        decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            },
        )?;

    Ok(token_data.claims)
}

/// Random signing secret for when none is configured. Tokens die with the process.
pub fn ephemeral_secret() -> Vec<u8> {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes";

    #[test]
    fn create_and_verify_token() {
        let token = create_access_token(SECRET, "user-1", "a@example.com", 24).unwrap();
        let claims = verify_access_token(SECRET, &token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@example.com");

        let now = Utc::now().timestamp();
        assert!((claims.iat - now).abs() < 60);
        assert!((claims.exp - (now + 24 * 3600)).abs() < 60);
    }

    #[test]
    fn garbage_token_is_invalid() {
        let result = verify_access_token(SECRET, "not-a-jwt");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = create_access_token(SECRET, "user-1", "a@example.com", 24).unwrap();
        let result = verify_access_token(b"another-secret-key-of-32-bytes!!", &token);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: "user-1".into(),
            email: "a@example.com".into(),
            iat: (now - Duration::hours(3)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let result = verify_access_token(SECRET, &token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn ephemeral_secrets_differ() {
        let a = ephemeral_secret();
        let b = ephemeral_secret();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
