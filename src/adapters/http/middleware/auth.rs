//! Bearer-token authentication middleware and extractors.
//!
//! The middleware validates the token through the `TokenVerifier` port
//! and injects [`AuthenticatedUser`] (plus the raw header value, for
//! forwarding) into request extensions. Routes opt in to enforcement
//! with the `RequireAuth` / `RequireAdmin` extractors, so public and
//! protected routes share one router.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::TokenVerifier;

/// Middleware state: the shared token verifier.
pub type AuthState = Arc<dyn TokenVerifier>;

/// Raw `Authorization` header value, kept for forwarding to peers.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Validates a Bearer token when one is present.
///
/// Missing tokens pass through untouched; extraction-time enforcement
/// decides whether that is acceptable per route. Invalid or expired
/// tokens short-circuit with 401.
pub async fn auth_middleware(
    State(verifier): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|h| h.to_string());

    let Some(header) = header else {
        return next.run(request).await;
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return unauthorized("invalid authorization header format, expected 'Bearer <token>'");
    };

    match verifier.verify(token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            request.extensions_mut().insert(BearerToken(header.clone()));
            next.run(request).await
        }
        Err(AuthError::TokenExpired) => unauthorized("token expired"),
        Err(_) => unauthorized("invalid or expired token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": "AUTHENTICATION",
        })),
    )
        .into_response()
}

/// Extractor requiring a validated caller.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Extractor requiring a validated caller with the admin capability.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user = parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AuthRejection::Unauthenticated)?;
            if !user.is_admin {
                return Err(AuthRejection::Forbidden);
            }
            Ok(RequireAdmin(user))
        })
    }
}

impl<S> axum::extract::FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<BearerToken>()
                .cloned()
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejections for the auth extractors.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    Unauthenticated,
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authorization header required",
                "AUTHENTICATION",
            ),
            AuthRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                "admin access required for this operation",
                "AUTHORIZATION",
            ),
        };
        (
            status,
            Json(serde_json::json!({"error": message, "code": code})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    fn caller(is_admin: bool) -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(5), "ana", is_admin)
    }

    fn parts_with(user: Option<AuthenticatedUser>) -> axum::http::request::Parts {
        let mut request: Request<()> = Request::builder().uri("/x").body(()).unwrap();
        if let Some(user) = user {
            request.extensions_mut().insert(user);
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn require_auth_reads_extensions() {
        let mut parts = parts_with(Some(caller(false)));
        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_id, UserId::new(5));
    }

    #[tokio::test]
    async fn require_auth_rejects_anonymous() {
        let mut parts = parts_with(None);
        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }

    #[tokio::test]
    async fn require_admin_rejects_plain_users() {
        let mut parts = parts_with(Some(caller(false)));
        let result = RequireAdmin::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Forbidden)));

        let mut parts = parts_with(Some(caller(true)));
        assert!(RequireAdmin::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[test]
    fn rejections_map_to_401_and_403() {
        assert_eq!(
            AuthRejection::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
