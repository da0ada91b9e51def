//! HS256 session tokens signed with the configured secret

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use timeline_core::models::{User, UserRole};
use timeline_core::AppError;

use crate::auth::models::{AuthContext, JwtClaims};

/// Issues and verifies session tokens. Built once at startup from `Config`.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl JwtService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Token lifetime, also used as the session cookie's Max-Age
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry.num_seconds()
    }

    pub fn issue(&self, user: &User, role: UserRole) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<AuthContext, AppError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AppError::Unauthorized("Invalid or expired session".to_string())
        })?;

        AuthContext::try_from(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn user(id: i64, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let jwt = JwtService::new(SECRET, 12);
        let token = jwt.issue(&user(7, "admin"), UserRole::Admin).unwrap();

        let ctx = jwt.verify(&token).unwrap();
        assert_eq!(ctx.user_id, 7);
        assert_eq!(ctx.username, "admin");
        assert_eq!(ctx.role, UserRole::Admin);
        assert_eq!(jwt.expiry_seconds(), 12 * 3600);
    }

    #[test]
    fn test_rejects_other_secret_and_garbage() {
        let token = JwtService::new(SECRET, 12)
            .issue(&user(1, "guest"), UserRole::Viewer)
            .unwrap();
        let other = JwtService::new("ffffffffffffffffffffffffffffffff", 12);

        assert!(matches!(other.verify(&token), Err(AppError::Unauthorized(_))));
        assert!(other.verify("not-a-token").is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = JwtService::new(SECRET, -1);
        let token = jwt.issue(&user(1, "guest"), UserRole::Viewer).unwrap();
        assert!(jwt.verify(&token).is_err());
    }
}
