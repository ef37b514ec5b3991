//! Identity request/response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::identity::UserProfile;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub home_branch_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email; both are accepted as login keys.
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}
