//! User entity and registration validation.
//!
//! Passwords are stored as a single SHA-256 hex digest of the plaintext.
//! That choice is inherited from the deployed credential store; swapping
//! in a memory-hard KDF only requires replacing [`PasswordHash::digest`]
//! and re-hashing on next login.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::{BranchId, DomainError, Timestamp, UserId};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("username pattern"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern")
});

/// SHA-256 hex digest of a password. The plaintext is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes a plaintext password.
    pub fn digest(plaintext: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(plaintext.as_bytes());
        Self(hex_encode(&hasher.finalize()))
    }

    /// Wraps an already-hashed value loaded from the store.
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-shape comparison against a plaintext candidate.
    pub fn matches(&self, plaintext: &str) -> bool {
        Self::digest(plaintext) == *self
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    pub is_admin: bool,
    pub home_branch_id: Option<BranchId>,
    pub created_at: Timestamp,
}

/// Public projection of a user (no credential material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub home_branch_id: Option<BranchId>,
    pub created_at: Timestamp,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            home_branch_id: self.home_branch_id,
            created_at: self.created_at,
        }
    }
}

/// Validated registration input. Construction enforces every rule, so a
/// `NewUser` value is always storable.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub home_branch_id: Option<BranchId>,
}

impl NewUser {
    /// Validates registration data and hashes the password.
    ///
    /// Rules: first/last name non-empty and at most 30 chars; username
    /// 3-30 chars of `[A-Za-z0-9_-]`; email a simple RFC-5322 subset;
    /// password at least 8 chars with an uppercase, a lowercase, and a
    /// digit. Registration always creates a non-admin user.
    pub fn validate(
        first_name: &str,
        last_name: &str,
        username: &str,
        email: &str,
        password: &str,
        home_branch_id: Option<BranchId>,
    ) -> Result<Self, DomainError> {
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(DomainError::validation("first name is required"));
        }
        if first_name.chars().count() > 30 {
            return Err(DomainError::validation(
                "first name must be at most 30 characters",
            ));
        }

        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(DomainError::validation("last name is required"));
        }
        if last_name.chars().count() > 30 {
            return Err(DomainError::validation(
                "last name must be at most 30 characters",
            ));
        }

        let username = username.trim();
        let username_len = username.chars().count();
        if !(3..=30).contains(&username_len) {
            return Err(DomainError::validation(
                "username must be between 3 and 30 characters",
            ));
        }
        if !USERNAME_RE.is_match(username) {
            return Err(DomainError::validation(
                "username can only contain letters, numbers, hyphens and underscores",
            ));
        }

        let email = email.trim();
        if !EMAIL_RE.is_match(email) {
            return Err(DomainError::validation("invalid email format"));
        }

        if password.chars().count() < 8 {
            return Err(DomainError::validation(
                "password must be at least 8 characters",
            ));
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(
                "password must contain at least one uppercase letter",
            ));
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(DomainError::validation(
                "password must contain at least one lowercase letter",
            ));
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation(
                "password must contain at least one number",
            ));
        }

        Ok(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: PasswordHash::digest(password),
            home_branch_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Result<NewUser, DomainError> {
        NewUser::validate("Ana", "García", "ana_garcia", "ana@example.com", "Passw0rd", None)
    }

    #[test]
    fn accepts_well_formed_registration() {
        let user = valid().unwrap();
        assert_eq!(user.username, "ana_garcia");
        assert_ne!(user.password_hash.as_str(), "Passw0rd");
    }

    #[test]
    fn sha256_digest_is_lowercase_hex() {
        // Known vector: sha256("password")
        let hash = PasswordHash::digest("password");
        assert_eq!(
            hash.as_str(),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn password_matches_round_trip() {
        let hash = PasswordHash::digest("Secreta1");
        assert!(hash.matches("Secreta1"));
        assert!(!hash.matches("secreta1"));
    }

    #[test]
    fn rejects_empty_names() {
        assert!(NewUser::validate("", "García", "ana", "a@b.com", "Passw0rd", None).is_err());
        assert!(NewUser::validate("Ana", "  ", "ana", "a@b.com", "Passw0rd", None).is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "x".repeat(31);
        assert!(NewUser::validate(&long, "García", "ana", "a@b.com", "Passw0rd", None).is_err());
    }

    #[test]
    fn rejects_bad_usernames() {
        for username in ["ab", "has spaces", "acéntos", &"x".repeat(31)] {
            assert!(
                NewUser::validate("Ana", "García", username, "a@b.com", "Passw0rd", None).is_err(),
                "username {:?} should be rejected",
                username
            );
        }
    }

    #[test]
    fn rejects_bad_emails() {
        for email in ["", "no-at", "a@b", "a@b.", "@x.com"] {
            assert!(
                NewUser::validate("Ana", "García", "ana", email, "Passw0rd", None).is_err(),
                "email {:?} should be rejected",
                email
            );
        }
    }

    #[test]
    fn rejects_weak_passwords() {
        for password in ["short1A", "alllower1", "ALLUPPER1", "NoDigits"] {
            assert!(
                NewUser::validate("Ana", "García", "ana", "a@b.com", password, None).is_err(),
                "password {:?} should be rejected",
                password
            );
        }
    }

    #[test]
    fn profile_omits_credentials() {
        let user = User {
            id: UserId::new(1),
            first_name: "Ana".into(),
            last_name: "García".into(),
            username: "ana".into(),
            email: "a@b.com".into(),
            password_hash: PasswordHash::digest("Passw0rd"),
            is_admin: false,
            home_branch_id: None,
            created_at: Timestamp::now(),
        };
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
