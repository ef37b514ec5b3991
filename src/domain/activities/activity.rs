//! Activity entity and schedule parsing.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ActivityId, BranchId, DomainError, Timestamp};

static HHMM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time pattern"));

/// Reference date all schedule times are anchored to, so start and end
/// compare as instants regardless of the serving day.
const REFERENCE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 1, 1) {
    Some(d) => d,
    None => panic!("reference date"),
};

/// Day of the week an activity runs on, in the branch locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Lunes,
    Martes,
    Miercoles,
    Jueves,
    Viernes,
    Sabado,
    Domingo,
}

impl Weekday {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "Lunes" => Ok(Weekday::Lunes),
            "Martes" => Ok(Weekday::Martes),
            "Miercoles" => Ok(Weekday::Miercoles),
            "Jueves" => Ok(Weekday::Jueves),
            "Viernes" => Ok(Weekday::Viernes),
            "Sabado" => Ok(Weekday::Sabado),
            "Domingo" => Ok(Weekday::Domingo),
            other => Err(DomainError::validation(format!("unknown weekday: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Lunes => "Lunes",
            Weekday::Martes => "Martes",
            Weekday::Miercoles => "Miercoles",
            Weekday::Jueves => "Jueves",
            Weekday::Viernes => "Viernes",
            Weekday::Sabado => "Sabado",
            Weekday::Domingo => "Domingo",
        }
    }
}

/// A time of day in `HH:MM`, comparable through the shared reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleTime(NaiveTime);

impl ScheduleTime {
    /// Parses an `HH:MM` string.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        if !HHMM_RE.is_match(value) {
            return Err(DomainError::validation(format!(
                "invalid time {:?} (expected HH:MM)",
                value
            )));
        }
        let time = NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|e| DomainError::validation(format!("invalid time {:?}: {}", value, e)))?;
        Ok(Self(time))
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self(time)
    }

    pub fn as_time(&self) -> NaiveTime {
        self.0
    }

    /// The time anchored to the reference date, for instant arithmetic.
    pub fn on_reference_date(&self) -> NaiveDateTime {
        REFERENCE_DATE.and_time(self.0)
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// A scheduled class at a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub description: String,
    pub capacity: u32,
    pub day_of_week: Weekday,
    pub start_time: ScheduleTime,
    pub end_time: ScheduleTime,
    pub photo_url: String,
    pub instructor: String,
    /// Matched case-insensitively against plan category sets.
    pub category: String,
    pub branch_id: Option<BranchId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Soft-delete marker; deleted activities vanish from read models.
    pub deleted_at: Option<Timestamp>,
}

impl Activity {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Read-model projection: the activity plus its free places
/// (`capacity - count(active enrollments)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(flatten)]
    pub activity: Activity,
    pub available_places: i64,
}

/// Validated activity creation/update input.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: String,
    pub capacity: u32,
    pub day_of_week: Weekday,
    pub start_time: ScheduleTime,
    pub end_time: ScheduleTime,
    pub photo_url: String,
    pub instructor: String,
    pub category: String,
    pub branch_id: Option<BranchId>,
}

impl NewActivity {
    #[allow(clippy::too_many_arguments)]
    pub fn validate(
        title: &str,
        description: &str,
        capacity: u32,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
        photo_url: &str,
        instructor: &str,
        category: &str,
        branch_id: Option<BranchId>,
    ) -> Result<Self, DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if capacity == 0 {
            return Err(DomainError::validation("capacity must be greater than 0"));
        }
        if category.trim().is_empty() {
            return Err(DomainError::validation("category is required"));
        }

        let day_of_week = Weekday::parse(day_of_week)?;
        let start = ScheduleTime::parse(start_time)?;
        let end = ScheduleTime::parse(end_time)?;
        if end.on_reference_date() <= start.on_reference_date() {
            return Err(DomainError::validation(
                "end time must be after start time",
            ));
        }

        Ok(Self {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            capacity,
            day_of_week,
            start_time: start,
            end_time: end,
            photo_url: photo_url.trim().to_string(),
            instructor: instructor.trim().to_string(),
            category: category.trim().to_string(),
            branch_id,
        })
    }
}
