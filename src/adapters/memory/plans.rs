//! In-memory plan repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, PlanId};
use crate::domain::plans::Plan;
use crate::ports::{PageRequest, PlanFilter, PlanRepository};

pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<PlanId, Plan>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
        }
    }

    fn filtered(&self, filter: &PlanFilter) -> Vec<Plan> {
        self.plans
            .read()
            .expect("plans lock poisoned")
            .values()
            .filter(|p| filter.active.map_or(true, |active| p.active == active))
            .cloned()
            .collect()
    }
}

impl Default for InMemoryPlanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn create(&self, plan: &Plan) -> Result<(), DomainError> {
        self.plans
            .write()
            .expect("plans lock poisoned")
            .insert(plan.id, plan.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PlanId) -> Result<Plan, DomainError> {
        self.plans
            .read()
            .expect("plans lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("plan not found"))
    }

    async fn count(&self, filter: &PlanFilter) -> Result<u64, DomainError> {
        Ok(self.filtered(filter).len() as u64)
    }

    async fn find_page(
        &self,
        filter: &PlanFilter,
        page: &PageRequest,
    ) -> Result<Vec<Plan>, DomainError> {
        let mut plans = self.filtered(filter);
        plans.sort_by(|a, b| {
            let ordering = match page.sort_by.as_str() {
                "name" => a.name.cmp(&b.name),
                "monthly_price" => a
                    .monthly_price
                    .partial_cmp(&b.monthly_price)
                    .unwrap_or(std::cmp::Ordering::Equal),
                _ => a.created_at.cmp(&b.created_at),
            };
            if page.sort_desc {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(plans
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect())
    }

    async fn update(&self, plan: &Plan) -> Result<(), DomainError> {
        let mut plans = self.plans.write().expect("plans lock poisoned");
        if !plans.contains_key(&plan.id) {
            return Err(DomainError::not_found("plan not found"));
        }
        plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn delete(&self, id: PlanId) -> Result<(), DomainError> {
        self.plans
            .write()
            .expect("plans lock poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("plan not found"))
    }
}
