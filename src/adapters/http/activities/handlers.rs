//! Activity & enrollment HTTP handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::adapters::http::middleware::{BearerToken, RequireAdmin, RequireAuth};
use crate::adapters::http::{ApiError, ApiResult};
use crate::application::activities::CachedActivityService;
use crate::application::enrollments::EnrollmentService;
use crate::domain::activities::{Activity, ActivityRecord, Enrollment};
use crate::domain::foundation::ActivityId;
use crate::ports::ActivitySearch;

use super::dto::{ActivityRequest, EnrollmentRequest, SearchQuery};

#[derive(Clone)]
pub struct ActivitiesAppState {
    pub activities: Arc<CachedActivityService>,
    pub enrollments: Arc<EnrollmentService>,
}

// ------------------------------------------------------------------
// Activities
// ------------------------------------------------------------------

pub async fn list_activities(
    State(state): State<ActivitiesAppState>,
) -> ApiResult<Json<Vec<ActivityRecord>>> {
    let records = state.activities.list().await.map_err(ApiError)?;
    Ok(Json(records))
}

pub async fn search_activities(
    State(state): State<ActivitiesAppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ActivityRecord>>> {
    let records = state
        .activities
        .search(&ActivitySearch {
            keyword: query.keyword,
            category: query.category,
        })
        .await
        .map_err(ApiError)?;
    Ok(Json(records))
}

pub async fn get_activity(
    State(state): State<ActivitiesAppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ActivityRecord>> {
    let record = state
        .activities
        .get(ActivityId::new(id))
        .await
        .map_err(ApiError)?;
    Ok(Json(record))
}

pub async fn create_activity(
    State(state): State<ActivitiesAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Json(request): Json<ActivityRequest>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    let activity = state
        .activities
        .create(request.validate().map_err(ApiError)?)
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn update_activity(
    State(state): State<ActivitiesAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<i64>,
    Json(request): Json<ActivityRequest>,
) -> ApiResult<Json<Activity>> {
    let activity = state
        .activities
        .update(ActivityId::new(id), request.validate().map_err(ApiError)?)
        .await
        .map_err(ApiError)?;
    Ok(Json(activity))
}

pub async fn delete_activity(
    State(state): State<ActivitiesAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .activities
        .delete(ActivityId::new(id))
        .await
        .map_err(ApiError)?;
    Ok(StatusCode::NO_CONTENT)
}

// ------------------------------------------------------------------
// Enrollments
// ------------------------------------------------------------------

pub async fn list_enrollments(
    State(state): State<ActivitiesAppState>,
    RequireAuth(caller): RequireAuth,
) -> ApiResult<Json<Vec<Enrollment>>> {
    let enrollments = state
        .enrollments
        .list_by_user(caller.user_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(enrollments))
}

pub async fn enroll(
    State(state): State<ActivitiesAppState>,
    RequireAuth(caller): RequireAuth,
    BearerToken(token): BearerToken,
    Json(request): Json<EnrollmentRequest>,
) -> ApiResult<(StatusCode, Json<Enrollment>)> {
    let enrollment = state
        .enrollments
        .enroll(caller.user_id, ActivityId::new(request.activity_id), &token)
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn unenroll(
    State(state): State<ActivitiesAppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<EnrollmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .enrollments
        .unenroll(caller.user_id, ActivityId::new(request.activity_id))
        .await
        .map_err(ApiError)?;
    Ok(StatusCode::NO_CONTENT)
}
