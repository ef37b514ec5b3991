//! Plan repository port and pagination contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, PlanId};
use crate::domain::plans::Plan;

/// Listing filter; `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanFilter {
    pub active: Option<bool>,
}

/// Normalized page request. Construction clamps raw query values:
/// page >= 1, page_size in [1, 100] (default 10), sort key defaulting
/// to `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_desc: bool,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(
        page: Option<u32>,
        page_size: Option<u32>,
        sort_by: Option<String>,
        sort_desc: bool,
    ) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE);
        let sort_by = sort_by
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "created_at".to_string());
        Self {
            page,
            page_size,
            sort_by,
            sort_desc,
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }
}

/// One page of plans plus paging totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedPlans {
    pub plans: Vec<Plan>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl PagedPlans {
    /// Assembles a page, deriving `total_pages = ceil(total / page_size)`.
    pub fn assemble(plans: Vec<Plan>, total: u64, request: &PageRequest) -> Self {
        let total_pages = ((total + request.page_size as u64 - 1) / request.page_size as u64) as u32;
        Self {
            plans,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages,
        }
    }
}

/// Persistence port for plans (document store).
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn create(&self, plan: &Plan) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: PlanId) -> Result<Plan, DomainError>;

    /// Count matching plans; evaluated before the page query so totals
    /// refer to the same filter.
    async fn count(&self, filter: &PlanFilter) -> Result<u64, DomainError>;

    async fn find_page(
        &self,
        filter: &PlanFilter,
        page: &PageRequest,
    ) -> Result<Vec<Plan>, DomainError>;

    async fn update(&self, plan: &Plan) -> Result<(), DomainError>;

    /// Hard delete. Subscriptions referencing the plan are left alone.
    async fn delete(&self, id: PlanId) -> Result<(), DomainError>;
}
