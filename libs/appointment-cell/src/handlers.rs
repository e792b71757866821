// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::models::{
    CreateBlockedIntervalRequest, CreateOffDayRequest, EmergencySlotPolicy, SetDayAvailabilityRequest,
};
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentStatus, ChangeStatusRequest, ConflictCheckRequest,
    CreateAppointmentRequest, SlotQuery,
};
use crate::services::registry::ScheduleRegistry;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
}

fn to_app_error(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::NotFound(msg) => AppError::NotFound(msg),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        e @ AppointmentError::SlotConflict(_) => AppError::Conflict(e.to_string()),
        e @ AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
        AppointmentError::Internal(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// WEEKLY AVAILABILITY HANDLERS
// ==============================================================================

pub async fn get_weekly_availability(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability = registry.get_weekly_availability(doctor_id).map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "availability": availability
    })))
}

pub async fn set_weekly_availability(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path((doctor_id, day_of_week)): Path<(Uuid, i32)>,
    Json(request): Json<SetDayAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let day = registry
        .set_weekly_availability(
            doctor_id,
            day_of_week,
            request.enabled,
            request.start_time,
            request.end_time,
            request.slot_minutes,
        )
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": day
    })))
}

pub async fn copy_availability_to_all_days(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path((doctor_id, source_day)): Path<(Uuid, i32)>,
) -> Result<Json<Value>, AppError> {
    let availability = registry
        .copy_availability_to_all_days(doctor_id, source_day)
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

// ==============================================================================
// EXCEPTION HANDLERS
// ==============================================================================

pub async fn get_exceptions(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let exceptions = registry.get_exceptions(doctor_id).map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "off_days": exceptions.off_days(),
        "blocked_intervals": exceptions.blocked_intervals(),
        "emergency_policy": exceptions.emergency_policy()
    })))
}

pub async fn add_off_day(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateOffDayRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let off_day = registry
        .add_off_day(doctor_id, request.date, request.reason)
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "off_day": off_day
    }))))
}

pub async fn remove_off_day(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let removed = registry.remove_off_day(doctor_id, date).map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    })))
}

pub async fn add_blocked_interval(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateBlockedIntervalRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let interval = registry
        .add_blocked_interval(doctor_id, request.date, request.start_time, request.end_time, request.reason)
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "blocked_interval": interval
    }))))
}

pub async fn remove_blocked_interval(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path((doctor_id, interval_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let removed = registry
        .remove_blocked_interval(doctor_id, interval_id)
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    })))
}

pub async fn set_emergency_policy(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<EmergencySlotPolicy>,
) -> Result<Json<Value>, AppError> {
    let policy = registry
        .set_emergency_policy(doctor_id, request.slots_per_day, request.release_threshold_hours)
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "emergency_policy": policy
    })))
}

// ==============================================================================
// PUBLICATION HANDLERS
// ==============================================================================

pub async fn get_publication_state(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let publication = registry.get_publication_state(doctor_id).map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "publication": publication
    })))
}

pub async fn publish_schedule(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let publication = registry
        .publish_schedule(doctor_id, Utc::now())
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "publication": publication
    })))
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

/// Doctor-side view. Not gated on publication.
pub async fn get_available_slots(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = registry
        .get_available_slots(doctor_id, query.from, query.to, Utc::now(), query.use_default_policy)
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "from": query.from,
        "to": query.to,
        "available_slots": slots,
        "total_slots": slots.len()
    })))
}

/// Patient-facing view. Empty unless the schedule is published.
pub async fn get_bookable_slots(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let bookable = registry
        .get_bookable_slots(doctor_id, query.from, query.to, Utc::now())
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "published": bookable.published,
        "available_slots": bookable.slots,
        "total_slots": bookable.slots.len()
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

pub async fn create_appointment(
    State(registry): State<Arc<ScheduleRegistry>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = registry
        .create_appointment(request, Utc::now())
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    }))))
}

pub async fn get_appointment(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let (appointment, valid_actions) = registry
        .get_appointment(appointment_id)
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "appointment": appointment,
        "valid_actions": valid_actions
    })))
}

pub async fn change_appointment_status(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = registry
        .change_appointment_status(
            appointment_id,
            request.action,
            request.reason.as_deref(),
            request.actor_id,
            Utc::now(),
        )
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn list_doctor_appointments(
    State(registry): State<Arc<ScheduleRegistry>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = registry
        .list_doctor_appointments(doctor_id, query.status)
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn check_appointment_conflicts(
    State(registry): State<Arc<ScheduleRegistry>>,
    Query(query): Query<ConflictCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let response = registry
        .check_conflicts(query.doctor_id, query.start_time, query.end_time)
        .map_err(to_app_error)?;

    Ok(Json(json!(response)))
}
