// libs/appointment-cell/src/services/registry.rs
//
// Per-doctor single-writer boundary. Each doctor's schedule sits behind its
// own RwLock: writers (configuration changes, bookings, status changes) are
// serialized per doctor, readers see either the state before or after a
// write, never a half-applied one.
//
// Lock order is always registry map -> doctor schedule -> appointment index.
//

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use doctor_cell::models::{
    BlockReason, BlockedInterval, DayAvailability, DoctorCalendar, DoctorError,
    EmergencySlotPolicy, ExceptionCalendar, OffDay, PublicationState,
};
use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookableSlots, ConflictCheckResponse,
    CreateAppointmentRequest, Slot, StatusAction,
};
use crate::services::schedule::Schedule;

type SharedSchedule = Arc<RwLock<Schedule>>;

pub struct ScheduleRegistry {
    config: AppConfig,
    schedules: RwLock<HashMap<Uuid, SharedSchedule>>,
    appointment_index: RwLock<HashMap<Uuid, Uuid>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, AppointmentError> {
    lock.read()
        .map_err(|_| AppointmentError::Internal("Schedule lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, AppointmentError> {
    lock.write()
        .map_err(|_| AppointmentError::Internal("Schedule lock poisoned".to_string()))
}

impl ScheduleRegistry {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            schedules: RwLock::new(HashMap::new()),
            appointment_index: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn schedule(&self, doctor_id: Uuid) -> Result<SharedSchedule, AppointmentError> {
        read(&self.schedules)?
            .get(&doctor_id)
            .cloned()
            .ok_or_else(|| AppointmentError::NotFound(format!("Doctor {} has no schedule", doctor_id)))
    }

    fn schedule_for_appointment(&self, appointment_id: Uuid) -> Result<SharedSchedule, AppointmentError> {
        let doctor_id = read(&self.appointment_index)?
            .get(&appointment_id)
            .copied()
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))?;
        self.schedule(doctor_id)
    }

    /// Runs a calendar mutation under the doctor's write lock. A doctor seen
    /// for the first time is only registered if the mutation succeeds.
    fn mutate_calendar<T>(
        &self,
        doctor_id: Uuid,
        mutation: impl FnOnce(&mut DoctorCalendar) -> Result<T, DoctorError>,
    ) -> Result<T, AppointmentError> {
        let mut schedules = write(&self.schedules)?;

        let existing = schedules.get(&doctor_id).cloned();
        if let Some(existing) = existing {
            drop(schedules);
            let mut schedule = write(&existing)?;
            return Ok(mutation(schedule.calendar_mut())?);
        }

        let mut schedule = Schedule::new(doctor_id);
        let result = mutation(schedule.calendar_mut())?;
        schedules.insert(doctor_id, Arc::new(RwLock::new(schedule)));
        info!("Registered schedule for doctor {}", doctor_id);
        Ok(result)
    }

    // ==========================================================================
    // TEMPLATE & EXCEPTIONS
    // ==========================================================================

    #[instrument(skip(self))]
    pub fn set_weekly_availability(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
        enabled: bool,
        start_time: NaiveTime,
        end_time: NaiveTime,
        slot_minutes: i32,
    ) -> Result<DayAvailability, AppointmentError> {
        self.mutate_calendar(doctor_id, |calendar| {
            calendar.set_day(day_of_week, enabled, start_time, end_time, slot_minutes)
        })
    }

    #[instrument(skip(self))]
    pub fn copy_availability_to_all_days(
        &self,
        doctor_id: Uuid,
        source_day: i32,
    ) -> Result<Vec<DayAvailability>, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let mut schedule = write(&schedule)?;
        schedule.calendar_mut().copy_to_all_days(source_day)?;
        Ok(schedule.calendar().template().days().cloned().collect())
    }

    pub fn get_weekly_availability(&self, doctor_id: Uuid) -> Result<Vec<DayAvailability>, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let schedule = read(&schedule)?;
        Ok(schedule.calendar().template().days().cloned().collect())
    }

    #[instrument(skip(self))]
    pub fn add_off_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        reason: String,
    ) -> Result<OffDay, AppointmentError> {
        self.mutate_calendar(doctor_id, |calendar| calendar.add_off_day(date, reason))
    }

    #[instrument(skip(self))]
    pub fn remove_off_day(&self, doctor_id: Uuid, date: NaiveDate) -> Result<OffDay, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let mut schedule = write(&schedule)?;
        Ok(schedule.calendar_mut().remove_off_day(date)?)
    }

    #[instrument(skip(self))]
    pub fn add_blocked_interval(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        reason: BlockReason,
    ) -> Result<BlockedInterval, AppointmentError> {
        self.mutate_calendar(doctor_id, |calendar| {
            calendar.add_blocked_interval(date, start_time, end_time, reason)
        })
    }

    #[instrument(skip(self))]
    pub fn remove_blocked_interval(
        &self,
        doctor_id: Uuid,
        interval_id: Uuid,
    ) -> Result<BlockedInterval, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let mut schedule = write(&schedule)?;
        Ok(schedule.calendar_mut().remove_blocked_interval(interval_id)?)
    }

    #[instrument(skip(self))]
    pub fn set_emergency_policy(
        &self,
        doctor_id: Uuid,
        slots_per_day: i32,
        release_threshold_hours: i32,
    ) -> Result<EmergencySlotPolicy, AppointmentError> {
        self.mutate_calendar(doctor_id, |calendar| {
            calendar.set_emergency_policy(slots_per_day, release_threshold_hours)
        })
    }

    pub fn get_exceptions(&self, doctor_id: Uuid) -> Result<ExceptionCalendar, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let schedule = read(&schedule)?;
        Ok(schedule.calendar().exceptions().clone())
    }

    // ==========================================================================
    // PUBLICATION
    // ==========================================================================

    #[instrument(skip(self))]
    pub fn publish_schedule(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PublicationState, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let mut schedule = write(&schedule)?;
        Ok(schedule.calendar_mut().publish(now))
    }

    pub fn get_publication_state(&self, doctor_id: Uuid) -> Result<PublicationState, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let schedule = read(&schedule)?;
        Ok(schedule.calendar().publication().clone())
    }

    // ==========================================================================
    // SLOTS
    // ==========================================================================

    /// Internal view, independent of publication status.
    #[instrument(skip(self))]
    pub fn get_available_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
        use_default_policy: bool,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let policy = use_default_policy.then(|| self.config.default_policy());

        let schedule = match self.schedule(doctor_id) {
            Ok(schedule) => schedule,
            Err(AppointmentError::NotFound(_)) if policy.is_some() => {
                debug!("Unknown doctor {}, resolving default policy", doctor_id);
                return Schedule::new(doctor_id).resolve_slots(
                    from,
                    to,
                    now,
                    policy.as_ref(),
                    self.config.max_range_days,
                );
            }
            Err(e) => return Err(e),
        };

        let schedule = read(&schedule)?;
        schedule.resolve_slots(from, to, now, policy.as_ref(), self.config.max_range_days)
    }

    /// Patient-facing view: empty unless the schedule is published.
    #[instrument(skip(self))]
    pub fn get_bookable_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<BookableSlots, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let schedule = read(&schedule)?;
        schedule.bookable_slots(from, to, now, self.config.max_range_days)
    }

    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    /// Check-then-insert runs entirely under the doctor's write lock, so two
    /// concurrent requests for overlapping ranges cannot both succeed.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id))]
    pub fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let schedule = self.schedule(request.doctor_id)?;
        let mut schedule = write(&schedule)?;

        let appointment = schedule.create_appointment(request, now)?;
        write(&self.appointment_index)?.insert(appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    #[instrument(skip(self, reason))]
    pub fn change_appointment_status(
        &self,
        appointment_id: Uuid,
        action: StatusAction,
        reason: Option<&str>,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let schedule = self.schedule_for_appointment(appointment_id)?;
        let mut schedule = write(&schedule)?;
        schedule.change_status(appointment_id, action, reason, actor_id, now)
    }

    /// The appointment together with the actions still legal from its status.
    pub fn get_appointment(&self, appointment_id: Uuid) -> Result<(Appointment, Vec<StatusAction>), AppointmentError> {
        let schedule = self.schedule_for_appointment(appointment_id)?;
        let schedule = read(&schedule)?;
        let appointment = schedule
            .appointment(appointment_id)
            .cloned()
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))?;
        let actions = schedule.valid_actions(&appointment);
        Ok((appointment, actions))
    }

    pub fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let schedule = self.schedule(doctor_id)?;
        let schedule = read(&schedule)?;
        Ok(schedule.appointments_with_status(status))
    }

    pub fn check_conflicts(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        if start >= end {
            return Err(AppointmentError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }
        let schedule = self.schedule(doctor_id)?;
        let schedule = read(&schedule)?;
        Ok(schedule.check_conflicts(start, end))
    }
}
