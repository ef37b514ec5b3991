//! Activity & enrollment DTOs.

use serde::Deserialize;

use crate::domain::activities::NewActivity;
use crate::domain::foundation::{BranchId, DomainError};

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub capacity: u32,
    pub day_of_week: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`, must be after `start_time`
    pub end_time: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub instructor: String,
    pub category: String,
    #[serde(default)]
    pub branch_id: Option<i64>,
}

impl ActivityRequest {
    pub fn validate(&self) -> Result<NewActivity, DomainError> {
        NewActivity::validate(
            &self.title,
            &self.description,
            self.capacity,
            &self.day_of_week,
            &self.start_time,
            &self.end_time,
            &self.photo_url,
            &self.instructor,
            &self.category,
            self.branch_id.map(BranchId::new),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    pub activity_id: i64,
}
