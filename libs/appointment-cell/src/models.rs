// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::DoctorError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_by_id: Uuid,
    pub cancelled_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment occupies its time range. Cancelled ones never do.
    pub fn blocks_time(&self) -> bool {
        self.status.blocks_time()
    }

    /// Half-open `[start, end)` overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_datetime < end && start < self.end_datetime
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn blocks_time(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Confirm,
    Cancel,
    Complete,
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusAction::Confirm => write!(f, "confirm"),
            StatusAction::Cancel => write!(f, "cancel"),
            StatusAction::Complete => write!(f, "complete"),
        }
    }
}

/// A bookable window on a given date. Times are UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Slot {
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.end_time).and_utc()
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    #[serde(default = "default_initial_status")]
    pub initial_status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by_id: Uuid,
}

fn default_initial_status() -> AppointmentStatus {
    AppointmentStatus::Pending
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub action: StatusAction,
    pub reason: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub use_default_policy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookableSlots {
    pub published: bool,
    pub slots: Vec<Slot>,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckRequest {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Requested time is not available: {0}")]
    SlotConflict(String),

    #[error("Cannot {action} an appointment that is {from}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        action: StatusAction,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DoctorError> for AppointmentError {
    fn from(error: DoctorError) -> Self {
        match error {
            DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::NotFound(msg) => AppointmentError::NotFound(msg),
        }
    }
}
