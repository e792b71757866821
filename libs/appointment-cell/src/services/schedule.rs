// libs/appointment-cell/src/services/schedule.rs

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{DoctorCalendar, WeeklyAvailabilityTemplate};
use shared_config::DefaultSchedulePolicy;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookableSlots, ConflictCheckResponse,
    CreateAppointmentRequest, Slot, StatusAction,
};
use crate::services::conflict::{check_exceptions, find_conflicts};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::SlotResolver;

/// One doctor's complete scheduling state: calendar configuration plus every
/// appointment ever booked against it. Appointments are never removed.
#[derive(Debug, Clone)]
pub struct Schedule {
    calendar: DoctorCalendar,
    appointments: Vec<Appointment>,
    lifecycle: AppointmentLifecycleService,
}

impl Schedule {
    pub fn new(doctor_id: Uuid) -> Self {
        Self {
            calendar: DoctorCalendar::new(doctor_id),
            appointments: Vec::new(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub fn doctor_id(&self) -> Uuid {
        self.calendar.doctor_id()
    }

    pub fn calendar(&self) -> &DoctorCalendar {
        &self.calendar
    }

    /// Only the registry mutates a calendar, under the doctor's write lock.
    pub(crate) fn calendar_mut(&mut self) -> &mut DoctorCalendar {
        &mut self.calendar
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn appointment(&self, appointment_id: Uuid) -> Option<&Appointment> {
        self.appointments.iter().find(|appointment| appointment.id == appointment_id)
    }

    pub fn appointments_with_status(&self, status: Option<AppointmentStatus>) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|appointment| status.map_or(true, |status| appointment.status == status))
            .cloned()
            .collect();
        appointments.sort_by_key(|appointment| appointment.start_datetime);
        appointments
    }

    /// Open slots between `from` and `to`, inclusive. With no template
    /// configured this fails with `NotFound` unless `fallback` is supplied.
    pub fn resolve_slots(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
        fallback: Option<&DefaultSchedulePolicy>,
        max_range_days: i64,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let template = self.calendar.template();
        if template.is_configured() {
            return SlotResolver::new(template, self.calendar.exceptions(), &self.appointments)
                .with_max_range_days(max_range_days)
                .resolve(from, to, now);
        }

        match fallback {
            Some(policy) => {
                debug!("Doctor {} has no template, resolving against default policy", self.doctor_id());
                let template = WeeklyAvailabilityTemplate::from_policy(policy);
                SlotResolver::new(&template, self.calendar.exceptions(), &self.appointments)
                    .with_max_range_days(max_range_days)
                    .resolve(from, to, now)
            }
            None => Err(AppointmentError::NotFound(format!(
                "No availability template configured for doctor {}",
                self.doctor_id()
            ))),
        }
    }

    /// Patient-facing view: only a published schedule offers slots.
    pub fn bookable_slots(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
        max_range_days: i64,
    ) -> Result<BookableSlots, AppointmentError> {
        if !self.calendar.publication().is_published() {
            debug!("Schedule for doctor {} is a draft, offering no slots", self.doctor_id());
            return Ok(BookableSlots { published: false, slots: Vec::new() });
        }

        let slots = self.resolve_slots(from, to, now, None, max_range_days)?;
        Ok(BookableSlots { published: true, slots })
    }

    pub fn check_conflicts(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ConflictCheckResponse {
        let conflicting_appointments: Vec<Appointment> =
            find_conflicts(&self.appointments, start, end).into_iter().cloned().collect();

        ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            conflicting_appointments,
        }
    }

    /// Overlap check and insert in one step; callers must hold this
    /// schedule's write lock for the whole call.
    pub fn create_appointment(
        &mut self,
        request: CreateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if request.start_datetime >= request.end_datetime {
            return Err(AppointmentError::ValidationError(
                "Appointment start must be before its end".to_string(),
            ));
        }
        self.lifecycle.validate_initial_status(request.initial_status)?;

        check_exceptions(self.calendar.exceptions(), request.start_datetime, request.end_datetime)?;

        let conflicts = find_conflicts(&self.appointments, request.start_datetime, request.end_datetime);
        if let Some(existing) = conflicts.first() {
            warn!(
                "Conflict detected for doctor {} - {} conflicting appointments",
                self.doctor_id(),
                conflicts.len()
            );
            return Err(AppointmentError::SlotConflict(format!(
                "Overlaps appointment {} ({} - {})",
                existing.id, existing.start_datetime, existing.end_datetime
            )));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: self.doctor_id(),
            patient_id: request.patient_id,
            start_datetime: request.start_datetime,
            end_datetime: request.end_datetime,
            status: request.initial_status,
            notes: request.notes,
            cancellation_reason: None,
            created_by_id: request.created_by_id,
            cancelled_by_id: None,
            created_at: now,
            updated_at: now,
        };

        info!(
            "Appointment {} booked for doctor {} from {} to {} ({})",
            appointment.id,
            appointment.doctor_id,
            appointment.start_datetime,
            appointment.end_datetime,
            appointment.status
        );
        self.appointments.push(appointment.clone());
        Ok(appointment)
    }

    pub fn change_status(
        &mut self,
        appointment_id: Uuid,
        action: StatusAction,
        reason: Option<&str>,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let lifecycle = self.lifecycle;
        let appointment = self
            .appointments
            .iter_mut()
            .find(|appointment| appointment.id == appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))?;

        lifecycle.apply(appointment, action, reason, actor_id, now)?;
        Ok(appointment.clone())
    }

    pub fn valid_actions(&self, appointment: &Appointment) -> Vec<StatusAction> {
        self.lifecycle.get_valid_actions(appointment.status)
    }
}
