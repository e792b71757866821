use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// WEEKLY TEMPLATE
// ==============================================================================

/// One weekday of the recurring template. `day_of_week` is 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub day_of_week: i32,
    pub enabled: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

impl DayAvailability {
    pub fn has_valid_window(&self) -> bool {
        self.start_time < self.end_time && self.slot_minutes > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailabilityTemplate {
    pub(crate) days: BTreeMap<i32, DayAvailability>,
}

// ==============================================================================
// EXCEPTIONS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffDay {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Lunch,
    Meeting,
    Admin,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedInterval {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: BlockReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencySlotPolicy {
    pub slots_per_day: i32,
    pub release_threshold_hours: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCalendar {
    pub(crate) off_days: Vec<OffDay>,
    pub(crate) blocked_intervals: Vec<BlockedInterval>,
    pub(crate) emergency_policy: EmergencySlotPolicy,
}

// ==============================================================================
// PUBLICATION
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationState {
    pub status: PublicationStatus,
    pub last_published_at: Option<DateTime<Utc>>,
}

impl PublicationState {
    pub fn is_published(&self) -> bool {
        self.status == PublicationStatus::Published
    }
}

/// Everything a doctor configures about their time: template, exceptions and
/// the publication gate. Mutated only through the operations in
/// `services::calendar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorCalendar {
    pub(crate) doctor_id: Uuid,
    pub(crate) template: WeeklyAvailabilityTemplate,
    pub(crate) exceptions: ExceptionCalendar,
    pub(crate) publication: PublicationState,
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDayAvailabilityRequest {
    pub enabled: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOffDayRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockedIntervalRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: BlockReason,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DoctorError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
