//! Plan service and its caching decorator.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{DomainError, PlanId, Timestamp};
use crate::domain::plans::{NewPlan, Plan};
use crate::ports::{PageRequest, PagedPlans, PlanFilter, PlanRepository};

use super::cache::TtlCache;

/// Raw listing query as it arrives from the HTTP boundary, before
/// clamping. Kept raw so the cache can recognize the default query.
#[derive(Debug, Clone, Default)]
pub struct PlanListQuery {
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
}

/// Plan catalog operations.
pub struct PlanService {
    plans: Arc<dyn PlanRepository>,
}

impl PlanService {
    pub fn new(plans: Arc<dyn PlanRepository>) -> Self {
        Self { plans }
    }

    pub async fn create_plan(&self, new_plan: NewPlan) -> Result<Plan, DomainError> {
        let plan = new_plan.into_plan();
        self.plans.create(&plan).await?;
        tracing::info!(plan_id = %plan.id, name = %plan.name, "plan created");
        Ok(plan)
    }

    pub async fn get_plan(&self, id: PlanId) -> Result<Plan, DomainError> {
        self.plans.find_by_id(id).await
    }

    /// Count-then-find listing. The count runs first so `total` and
    /// `total_pages` describe the same filter the page was taken from.
    pub async fn list_plans(&self, query: &PlanListQuery) -> Result<PagedPlans, DomainError> {
        let filter = PlanFilter {
            active: query.active,
        };
        let request = PageRequest::new(
            query.page,
            query.page_size,
            query.sort_by.clone(),
            query.sort_desc,
        );

        let total = self.plans.count(&filter).await?;
        let plans = self.plans.find_page(&filter, &request).await?;
        Ok(PagedPlans::assemble(plans, total, &request))
    }

    /// Full update; identity, creation time, and active flag survive.
    pub async fn update_plan(&self, id: PlanId, input: NewPlan) -> Result<Plan, DomainError> {
        let existing = self.plans.find_by_id(id).await?;
        let plan = Plan {
            id: existing.id,
            name: input.name,
            description: input.description,
            monthly_price: input.monthly_price,
            access_type: input.access_type,
            duration_days: input.duration_days,
            active: existing.active,
            allowed_activity_categories: input.allowed_activity_categories,
            created_at: existing.created_at,
            updated_at: Timestamp::now(),
        };
        self.plans.update(&plan).await?;
        Ok(plan)
    }

    /// Hard delete. Live subscriptions that reference the plan are not
    /// touched; their reads will enrich with an empty plan name.
    pub async fn delete_plan(&self, id: PlanId) -> Result<(), DomainError> {
        self.plans.find_by_id(id).await?;
        self.plans.delete(id).await?;
        tracing::info!(plan_id = %id, "plan deleted");
        Ok(())
    }

    pub async fn toggle_plan(&self, id: PlanId, active: bool) -> Result<Plan, DomainError> {
        let mut plan = self.plans.find_by_id(id).await?;
        plan.active = active;
        plan.updated_at = Timestamp::now();
        self.plans.update(&plan).await?;
        Ok(plan)
    }
}

/// Caching decorator over [`PlanService`].
///
/// Only the highest-traffic read is cacheable: active plans, first page,
/// no explicit paging or sorting. Every other query goes straight
/// through. Any successful mutation wipes the map so the next read is
/// authoritative.
pub struct CachedPlanService {
    inner: PlanService,
    cache: Arc<TtlCache>,
}

const ACTIVE_PLANS_KEY: &str = "plans:active:all";

/// Plans change rarely; entries live an hour.
pub const PLAN_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Sweeper period for expired plan-cache entries.
pub const PLAN_CACHE_SWEEP: Duration = Duration::from_secs(10 * 60);

impl CachedPlanService {
    pub fn new(inner: PlanService) -> Self {
        Self {
            inner,
            cache: Arc::new(TtlCache::new(PLAN_CACHE_TTL)),
        }
    }

    /// Handle for spawning the background sweeper.
    pub fn cache(&self) -> Arc<TtlCache> {
        self.cache.clone()
    }

    fn cacheable(query: &PlanListQuery) -> bool {
        query.active == Some(true)
            && query.page.unwrap_or(1) == 1
            && query.page_size.is_none()
            && query.sort_by.is_none()
            && !query.sort_desc
    }

    pub async fn create_plan(&self, new_plan: NewPlan) -> Result<Plan, DomainError> {
        let plan = self.inner.create_plan(new_plan).await?;
        self.cache.clear();
        Ok(plan)
    }

    /// Point reads bypass the cache.
    pub async fn get_plan(&self, id: PlanId) -> Result<Plan, DomainError> {
        self.inner.get_plan(id).await
    }

    pub async fn list_plans(&self, query: &PlanListQuery) -> Result<PagedPlans, DomainError> {
        if !Self::cacheable(query) {
            return self.inner.list_plans(query).await;
        }

        if let Some(bytes) = self.cache.get(ACTIVE_PLANS_KEY) {
            if let Ok(page) = serde_json::from_slice::<PagedPlans>(&bytes) {
                tracing::debug!("plan cache hit");
                return Ok(page);
            }
        }

        tracing::debug!("plan cache miss");
        let page = self.inner.list_plans(query).await?;
        if let Ok(bytes) = serde_json::to_vec(&page) {
            self.cache.put(ACTIVE_PLANS_KEY, bytes);
        }
        Ok(page)
    }

    pub async fn update_plan(&self, id: PlanId, input: NewPlan) -> Result<Plan, DomainError> {
        let plan = self.inner.update_plan(id, input).await?;
        self.cache.clear();
        Ok(plan)
    }

    pub async fn delete_plan(&self, id: PlanId) -> Result<(), DomainError> {
        self.inner.delete_plan(id).await?;
        self.cache.clear();
        Ok(())
    }

    pub async fn toggle_plan(&self, id: PlanId, active: bool) -> Result<Plan, DomainError> {
        let plan = self.inner.toggle_plan(id, active).await?;
        self.cache.clear();
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlanRepository;
    use crate::domain::plans::AccessType;

    fn new_plan(name: &str, price: f64) -> NewPlan {
        NewPlan::validate(name, "", price, AccessType::Full, 30, vec![]).unwrap()
    }

    fn cached() -> CachedPlanService {
        CachedPlanService::new(PlanService::new(Arc::new(InMemoryPlanRepository::new())))
    }

    fn default_active_query() -> PlanListQuery {
        PlanListQuery {
            active: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn pagination_counts_before_finding() {
        let service = PlanService::new(Arc::new(InMemoryPlanRepository::new()));
        for i in 0..25 {
            service
                .create_plan(new_plan(&format!("Plan {}", i), 100.0 + i as f64))
                .await
                .unwrap();
        }

        let page = service
            .list_plans(&PlanListQuery {
                page: Some(2),
                page_size: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 25);
        assert_eq!(page.plans.len(), 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
    }

    #[tokio::test]
    async fn default_active_listing_is_cached() {
        let service = cached();
        service.create_plan(new_plan("Basic", 100.0)).await.unwrap();

        let first = service.list_plans(&default_active_query()).await.unwrap();
        assert_eq!(first.plans.len(), 1);
        assert_eq!(service.cache().len(), 1);

        // Served from cache even though the query runs again.
        let second = service.list_plans(&default_active_query()).await.unwrap();
        assert_eq!(second.total, first.total);
    }

    #[tokio::test]
    async fn non_default_queries_bypass_cache() {
        let service = cached();
        service.create_plan(new_plan("Basic", 100.0)).await.unwrap();

        service
            .list_plans(&PlanListQuery {
                active: Some(true),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        service
            .list_plans(&PlanListQuery::default())
            .await
            .unwrap();
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn mutation_invalidates_cache_and_next_read_is_fresh() {
        let service = cached();
        let plan = service.create_plan(new_plan("Basic", 100.0)).await.unwrap();

        service.list_plans(&default_active_query()).await.unwrap();
        assert_eq!(service.cache().len(), 1);

        service.toggle_plan(plan.id, false).await.unwrap();
        assert!(service.cache().is_empty());

        let page = service.list_plans(&default_active_query()).await.unwrap();
        assert_eq!(page.total, 0, "deactivated plan must vanish immediately");
    }

    #[tokio::test]
    async fn delete_is_hard_and_get_turns_not_found() {
        let service = cached();
        let plan = service.create_plan(new_plan("Basic", 100.0)).await.unwrap();
        service.delete_plan(plan.id).await.unwrap();
        assert!(service.get_plan(plan.id).await.unwrap_err().is_not_found());
    }
}
