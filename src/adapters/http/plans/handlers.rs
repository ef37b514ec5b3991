//! Plan & subscription HTTP handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::http::middleware::{RequireAdmin, RequireAuth};
use crate::adapters::http::{ApiError, ApiResult};
use crate::application::plans::{CachedPlanService, PlanListQuery};
use crate::application::subscriptions::{
    CreateSubscriptionCommand, SubscriptionResponse, SubscriptionService,
};
use crate::domain::foundation::{BranchId, DomainError, PlanId, SubscriptionId, UserId};
use crate::domain::plans::{NewPlan, Plan};
use crate::domain::subscriptions::SubscriptionState;
use crate::ports::PagedPlans;

use super::dto::{
    CreateSubscriptionRequest, ListPlansQuery, PlanRequest, TogglePlanRequest,
    UpdateSubscriptionStatusRequest,
};

#[derive(Clone)]
pub struct PlansAppState {
    pub plans: Arc<CachedPlanService>,
    pub subscriptions: Arc<SubscriptionService>,
}

fn parse_plan_id(raw: &str) -> Result<PlanId, ApiError> {
    PlanId::from_str(raw)
        .map_err(|_| ApiError(DomainError::validation("invalid plan id")))
}

fn parse_subscription_id(raw: &str) -> Result<SubscriptionId, ApiError> {
    SubscriptionId::from_str(raw)
        .map_err(|_| ApiError(DomainError::validation("invalid subscription id")))
}

fn new_plan(request: &PlanRequest) -> Result<NewPlan, DomainError> {
    NewPlan::validate(
        &request.name,
        &request.description,
        request.monthly_price,
        request.access_type()?,
        request.duration_days,
        request.allowed_activity_categories.clone(),
    )
}

// ------------------------------------------------------------------
// Plans
// ------------------------------------------------------------------

pub async fn list_plans(
    State(state): State<PlansAppState>,
    Query(query): Query<ListPlansQuery>,
) -> ApiResult<Json<PagedPlans>> {
    let page = state
        .plans
        .list_plans(&PlanListQuery {
            active: query.active,
            page: query.page,
            page_size: query.page_size,
            sort_by: query.sort_by,
            sort_desc: query.sort_desc,
        })
        .await
        .map_err(ApiError)?;
    Ok(Json(page))
}

pub async fn get_plan(
    State(state): State<PlansAppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Plan>> {
    let plan = state
        .plans
        .get_plan(parse_plan_id(&id)?)
        .await
        .map_err(ApiError)?;
    Ok(Json(plan))
}

pub async fn create_plan(
    State(state): State<PlansAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Json(request): Json<PlanRequest>,
) -> ApiResult<(StatusCode, Json<Plan>)> {
    let plan = state
        .plans
        .create_plan(new_plan(&request).map_err(ApiError)?)
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan(
    State(state): State<PlansAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Json<Plan>> {
    let plan = state
        .plans
        .update_plan(parse_plan_id(&id)?, new_plan(&request).map_err(ApiError)?)
        .await
        .map_err(ApiError)?;
    Ok(Json(plan))
}

pub async fn delete_plan(
    State(state): State<PlansAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .plans
        .delete_plan(parse_plan_id(&id)?)
        .await
        .map_err(ApiError)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_plan(
    State(state): State<PlansAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<TogglePlanRequest>,
) -> ApiResult<Json<Plan>> {
    let plan = state
        .plans
        .toggle_plan(parse_plan_id(&id)?, request.active)
        .await
        .map_err(ApiError)?;
    Ok(Json(plan))
}

// ------------------------------------------------------------------
// Subscriptions
// ------------------------------------------------------------------

pub async fn create_subscription(
    State(state): State<PlansAppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<CreateSubscriptionRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)> {
    let subscription = state
        .subscriptions
        .create(
            caller.user_id,
            CreateSubscriptionCommand {
                plan_id: parse_plan_id(&request.plan_id)?,
                origin_branch_id: request.origin_branch_id.map(BranchId::new),
                preferred_payment_method: request.preferred_payment_method,
                auto_renew: request.auto_renew,
                notes: request.notes,
            },
        )
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn get_subscription(
    State(state): State<PlansAppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = state
        .subscriptions
        .get(parse_subscription_id(&id)?)
        .await
        .map_err(ApiError)?;

    if !caller.can_access_resource_of(subscription.user_id) {
        return Err(ApiError(DomainError::authorization(
            "you can only view your own subscriptions",
        )));
    }
    Ok(Json(subscription))
}

pub async fn get_active_subscription(
    State(state): State<PlansAppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let user_id = UserId::new(user_id);
    if !caller.can_access_resource_of(user_id) {
        return Err(ApiError(DomainError::authorization(
            "you can only view your own subscriptions",
        )));
    }

    let subscription = state
        .subscriptions
        .get_active_by_user(user_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(subscription))
}

pub async fn list_subscriptions_by_user(
    State(state): State<PlansAppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<SubscriptionResponse>>> {
    let user_id = UserId::new(user_id);
    if !caller.can_access_resource_of(user_id) {
        return Err(ApiError(DomainError::authorization(
            "you can only view your own subscriptions",
        )));
    }

    let subscriptions = state
        .subscriptions
        .list_by_user(user_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(subscriptions))
}

pub async fn update_subscription_status(
    State(state): State<PlansAppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<String>,
    Json(request): Json<UpdateSubscriptionStatusRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let id = parse_subscription_id(&id)?;
    let current = state.subscriptions.get(id).await.map_err(ApiError)?;
    if !caller.can_access_resource_of(current.user_id) {
        return Err(ApiError(DomainError::authorization(
            "you can only update your own subscriptions",
        )));
    }

    let state_value = SubscriptionState::parse(&request.state).ok_or_else(|| {
        ApiError(DomainError::validation(format!(
            "unknown subscription state: {}",
            request.state
        )))
    })?;

    let subscription = state
        .subscriptions
        .update_status(id, state_value, request.payment_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(subscription))
}

pub async fn cancel_subscription(
    State(state): State<PlansAppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_subscription_id(&id)?;
    let current = state.subscriptions.get(id).await.map_err(ApiError)?;
    if !caller.can_access_resource_of(current.user_id) {
        return Err(ApiError(DomainError::authorization(
            "you can only cancel your own subscriptions",
        )));
    }

    state.subscriptions.cancel(id).await.map_err(ApiError)?;
    Ok(StatusCode::OK)
}
