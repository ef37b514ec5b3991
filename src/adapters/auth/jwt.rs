//! Symmetric-HMAC JWT issuance and validation.
//!
//! All services share one HS256 secret. Claims:
//! `{iss, exp, username, user_id, is_admin, role}`, expiry 30 minutes
//! after issue.

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, DomainError, Timestamp, UserId};
use crate::domain::identity::User;
use crate::ports::{TokenIssuer, TokenVerifier};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    exp: i64,
    username: String,
    user_id: i64,
    is_admin: bool,
    role: String,
}

/// HS256 token service implementing both issuance and validation.
pub struct JwtTokenService {
    secret: SecretString,
    issuer: String,
    ttl_minutes: i64,
}

impl JwtTokenService {
    pub fn new(secret: SecretString, issuer: String, ttl_minutes: i64) -> Self {
        Self {
            secret,
            issuer,
            ttl_minutes,
        }
    }
}

#[async_trait]
impl TokenIssuer for JwtTokenService {
    async fn issue(&self, user: &User) -> Result<String, DomainError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            exp: Timestamp::now().add_minutes(self.ttl_minutes).unix_seconds(),
            username: user.username.clone(),
            user_id: user.id.as_i64(),
            is_admin: user.is_admin,
            role: if user.is_admin { "admin" } else { "user" }.to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| DomainError::internal(format!("token signing failed: {}", e)))
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenService {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::Json(_)
            | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => {
                AuthError::MalformedClaims
            }
            _ => AuthError::InvalidToken,
        })?;

        let claims = data.claims;
        if claims.username.is_empty() {
            return Err(AuthError::MalformedClaims);
        }
        Ok(AuthenticatedUser::new(
            UserId::new(claims.user_id),
            claims.username,
            claims.is_admin,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Role;
    use crate::domain::identity::PasswordHash;

    fn service(ttl_minutes: i64) -> JwtTokenService {
        JwtTokenService::new(
            SecretString::new("a-shared-test-secret".into()),
            "gym-management-system".into(),
            ttl_minutes,
        )
    }

    fn user(is_admin: bool) -> User {
        User {
            id: UserId::new(42),
            first_name: "Ana".into(),
            last_name: "García".into(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            password_hash: PasswordHash::digest("Passw0rd"),
            is_admin,
            home_branch_id: None,
            created_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn issue_and_verify_round_trip() {
        let service = service(30);
        let token = service.issue(&user(false)).await.unwrap();
        let caller = service.verify(&token).await.unwrap();

        assert_eq!(caller.user_id, UserId::new(42));
        assert_eq!(caller.username, "ana");
        assert!(!caller.is_admin);
        assert_eq!(caller.role, Role::User);
    }

    #[tokio::test]
    async fn admin_flag_travels_in_claims() {
        let service = service(30);
        let token = service.issue(&user(true)).await.unwrap();
        let caller = service.verify(&token).await.unwrap();
        assert!(caller.is_admin);
        assert_eq!(caller.role, Role::Admin);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_as_expired() {
        let service = service(-1);
        let token = service.issue(&user(false)).await.unwrap();
        let err = service.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let token = service(30).issue(&user(false)).await.unwrap();
        let other = JwtTokenService::new(
            SecretString::new("a-different-secret!!".into()),
            "gym-management-system".into(),
            30,
        );
        let err = other.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let err = service(30).verify("not.a.token").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken | AuthError::MalformedClaims));
    }
}
