//! Identity HTTP handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::{ApiError, ApiResult};
use crate::application::identity::{IdentityService, RegisterCommand};
use crate::domain::foundation::{BranchId, UserId};
use crate::domain::identity::UserProfile;

use super::dto::{AuthResponse, LoginRequest, RegisterRequest};

#[derive(Clone)]
pub struct IdentityAppState {
    pub identity: Arc<IdentityService>,
}

pub async fn register(
    State(state): State<IdentityAppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = state
        .identity
        .register(RegisterCommand {
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            email: request.email,
            password: request.password,
            home_branch_id: request.home_branch_id.map(BranchId::new),
        })
        .await
        .map_err(ApiError)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<IdentityAppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, token) = state
        .identity
        .login(&request.username_or_email, &request.password)
        .await
        .map_err(ApiError)?;

    Ok(Json(AuthResponse { user, token }))
}

pub async fn get_user(
    State(state): State<IdentityAppState>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .identity
        .get_user(UserId::new(id))
        .await
        .map_err(ApiError)?;
    Ok(Json(user))
}

pub async fn list_users(
    State(state): State<IdentityAppState>,
    RequireAuth(_caller): RequireAuth,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let users = state.identity.list_users().await.map_err(ApiError)?;
    Ok(Json(users))
}
