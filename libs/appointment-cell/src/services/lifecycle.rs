// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, StatusAction};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Status reached by applying `action` to `current`, if that move is legal.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        action: StatusAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        debug!("Validating status transition: {} via {}", current, action);

        let next = match (current, action) {
            (AppointmentStatus::Pending, StatusAction::Confirm) => AppointmentStatus::Confirmed,
            (AppointmentStatus::Pending, StatusAction::Cancel)
            | (AppointmentStatus::Confirmed, StatusAction::Cancel) => AppointmentStatus::Cancelled,
            (AppointmentStatus::Confirmed, StatusAction::Complete) => AppointmentStatus::Completed,
            _ => {
                warn!("Invalid status transition attempted: {} via {}", current, action);
                return Err(AppointmentError::InvalidStatusTransition { from: current, action });
            }
        };

        Ok(next)
    }

    /// Actions that are legal from `current`. Terminal states have none.
    pub fn get_valid_actions(&self, current: AppointmentStatus) -> Vec<StatusAction> {
        match current {
            AppointmentStatus::Pending => vec![StatusAction::Confirm, StatusAction::Cancel],
            AppointmentStatus::Confirmed => vec![StatusAction::Cancel, StatusAction::Complete],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Only `Pending` and `Confirmed` are valid entry states.
    pub fn validate_initial_status(&self, status: AppointmentStatus) -> Result<(), AppointmentError> {
        match status {
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => Ok(()),
            other => Err(AppointmentError::ValidationError(format!(
                "Appointments cannot be created as {}",
                other
            ))),
        }
    }

    /// Applies `action` to `appointment`. The record is left untouched on error.
    pub fn apply(
        &self,
        appointment: &mut Appointment,
        action: StatusAction,
        reason: Option<&str>,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        let next = self.validate_status_transition(appointment.status, action)?;

        let cancellation_reason = if next == AppointmentStatus::Cancelled {
            let reason = reason.map(str::trim).unwrap_or_default();
            if reason.is_empty() {
                return Err(AppointmentError::ValidationError(
                    "A cancellation reason is required".to_string(),
                ));
            }
            Some(reason.to_string())
        } else {
            None
        };

        let previous = appointment.status;
        appointment.status = next;
        appointment.updated_at = now;
        if let Some(reason) = cancellation_reason {
            appointment.cancellation_reason = Some(reason);
            appointment.cancelled_by_id = Some(actor_id);
        }

        info!(
            "Appointment {} moved from {} to {} by {}",
            appointment.id, previous, next, actor_id
        );
        Ok(())
    }
}
